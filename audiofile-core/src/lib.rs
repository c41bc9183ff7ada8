// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all Audiofile crates. Please see the workspace manifest for
// their justification.
#![allow(clippy::comparison_chain)]
#![allow(clippy::manual_range_contains)]

//! Shared structs, traits, and I/O plumbing for project Audiofile.
//!
//! This crate provides the pieces the format crates and the facade are built from: the error
//! type, byte-level I/O over backing stores, the sample format and file description types, the
//! de-interleaved frame buffer, sample transcoding, and the header codec interface with its
//! registry. It is a developer-oriented crate; end users should prefer the `audiofile` crate.

pub mod audio;
pub mod conv;
pub mod errors;
pub mod format;
pub mod handler;
pub mod io;
pub mod sample;
pub mod spec;
