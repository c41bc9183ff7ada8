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

//! Project Audiofile reads and writes uncompressed PCM audio in industry-standard container
//! formats: WAV, Sony Wave64, AIFF/AIFF-C, NeXT/Sun AU, IRCAM BICSF, and headerless raw PCM.
//!
//! [`AudioFile`] is the synchronous facade over a seekable file or one-shot stream;
//! [`AsyncAudioFile`] offers the same contract over a non-blocking byte channel. Applications
//! exchange samples through de-interleaved double-precision [`Frames`] planes regardless of the
//! on-disk encoding.
//!
//! ```no_run
//! use audiofile::AudioFile;
//!
//! fn main() -> audiofile::core::errors::Result<()> {
//!     let mut file = AudioFile::open_read_path("tone.wav")?;
//!
//!     let mut frames = AudioFile::buffer(file.spec().num_channels as usize);
//!     file.read(&mut frames, 0, 1024)?;
//!     Ok(())
//! }
//! ```

mod async_file;
mod file;

use once_cell::sync::Lazy;

pub use audiofile_core as core;

pub use audiofile_core::audio::Frames;
pub use audiofile_core::errors::{Error, Result};
pub use audiofile_core::sample::SampleFormat;
pub use audiofile_core::spec::{AudioSpec, ByteOrder, FileType};

pub use async_file::{AsyncAudioFile, AsyncChannel};
pub use file::AudioFile;

use audiofile_core::format::FormatRegistry;

/// Gets the registry of all enabled container formats, in probe order.
pub fn default_registry() -> &'static FormatRegistry {
    static REGISTRY: Lazy<FormatRegistry> = Lazy::new(|| {
        let mut registry = FormatRegistry::new();

        registry.register(audiofile_format_riff::wave_descriptor());
        registry.register(audiofile_format_riff::wave64_descriptor());
        registry.register(audiofile_format_riff::aiff_descriptor());
        registry.register(audiofile_format_snd::next_descriptor());
        registry.register(audiofile_format_snd::ircam_descriptor());
        registry.register(audiofile_format_snd::raw_descriptor());

        registry
    });

    &REGISTRY
}
