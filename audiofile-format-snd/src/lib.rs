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

//! Fixed-header and headerless container support for project Audiofile: NeXT/Sun AU, IRCAM
//! BICSF, and raw PCM.

pub mod ircam;
pub mod next;
pub mod raw;

pub use ircam::descriptor as ircam_descriptor;
pub use next::descriptor as next_descriptor;
pub use raw::descriptor as raw_descriptor;
