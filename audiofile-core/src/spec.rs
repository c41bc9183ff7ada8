// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `spec` module defines the file type set and the audio file description value type.

use std::fmt;

use crate::errors::{invalid_argument_error, Result};
use crate::sample::SampleFormat;

/// The byte order of multi-byte fields and samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// `FileType` enumerates the audio file containers known to Audiofile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Audio Interchange File Format (AIFF / AIFF-C).
    Aiff,
    /// Waveform Audio File Format (RIFF/WAVE).
    Wave,
    /// Sony Wave64, the 64-bit GUID-tagged RIFF variant.
    Wave64,
    /// NeXT/Sun audio (.au / .snd).
    Next,
    /// IRCAM BICSF sound files.
    Ircam,
    /// Headerless PCM with a caller-supplied description.
    Raw,
}

impl FileType {
    /// Returns true if the file type can be recognized from its leading bytes.
    pub fn can_identify(&self) -> bool {
        !matches!(*self, FileType::Raw)
    }

    /// Returns true if files of this type can be read.
    pub fn can_read(&self) -> bool {
        true
    }

    /// Returns true if files of this type can be written.
    pub fn can_write(&self) -> bool {
        true
    }

    /// The byte order samples take when the caller does not request one.
    pub fn default_byte_order(&self) -> ByteOrder {
        match *self {
            FileType::Aiff | FileType::Next => ByteOrder::BigEndian,
            FileType::Wave | FileType::Wave64 => ByteOrder::LittleEndian,
            // Raw and IRCAM files are native-endian in the wild; default to little-endian.
            FileType::Ircam | FileType::Raw => ByteOrder::LittleEndian,
        }
    }

    /// The file extensions generally used by the format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match *self {
            FileType::Aiff => &["aif", "aiff", "aifc"],
            FileType::Wave => &["wav", "wave"],
            FileType::Wave64 => &["w64"],
            FileType::Next => &["au", "snd"],
            FileType::Ircam => &["sf", "ircam"],
            FileType::Raw => &["raw", "pcm"],
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FileType::Aiff => write!(f, "Audio Interchange File Format"),
            FileType::Wave => write!(f, "Waveform Audio File Format"),
            FileType::Wave64 => write!(f, "Sony Wave64"),
            FileType::Next => write!(f, "NeXT/Sun Audio"),
            FileType::Ircam => write!(f, "IRCAM BICSF"),
            FileType::Raw => write!(f, "Raw PCM"),
        }
    }
}

/// `AudioSpec` describes an audio file: its container, sample encoding, channel count, sample
/// rate, byte order, and frame count.
///
/// For readers the frame count is authoritative. For writers it is the current count and grows as
/// frames are written.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AudioSpec {
    /// The container format.
    pub file_type: FileType,
    /// The on-disk sample encoding.
    pub sample_format: SampleFormat,
    /// The number of interleaved channels. Must be at least 1.
    pub num_channels: u32,
    /// The sample rate in Hz. Typically integral, but stored at full precision.
    pub sample_rate: f64,
    /// The byte order of samples on disk. `None` selects the format default.
    pub byte_order: Option<ByteOrder>,
    /// The number of sample frames.
    pub num_frames: u64,
    /// Channel placement mask for formats that persist one (WAVE_FORMAT_EXTENSIBLE). Zero means
    /// unspecified.
    pub channel_mask: u32,
}

impl AudioSpec {
    pub fn new(file_type: FileType, sample_format: SampleFormat, num_channels: u32, sample_rate: f64) -> Self {
        AudioSpec {
            file_type,
            sample_format,
            num_channels,
            sample_rate,
            byte_order: None,
            num_frames: 0,
            channel_mask: 0,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = Some(byte_order);
        self
    }

    pub fn with_num_frames(mut self, num_frames: u64) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn with_channel_mask(mut self, channel_mask: u32) -> Self {
        self.channel_mask = channel_mask;
        self
    }

    /// The byte order samples will actually take on disk.
    pub fn effective_byte_order(&self) -> ByteOrder {
        self.byte_order.unwrap_or_else(|| self.file_type.default_byte_order())
    }

    /// The number of bytes one frame (one sample per channel) occupies on disk.
    pub fn frame_size(&self) -> usize {
        self.sample_format.bytes_per_sample() * self.num_channels as usize
    }

    /// Checks the description is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.num_channels < 1 {
            return invalid_argument_error("spec: channel count must be at least 1");
        }
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return invalid_argument_error("spec: sample rate must be positive and finite");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_is_bytes_times_channels() {
        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S24, 2, 48_000.0);
        assert_eq!(spec.frame_size(), 6);

        let spec = AudioSpec::new(FileType::Next, SampleFormat::F64, 6, 96_000.0);
        assert_eq!(spec.frame_size(), 48);
    }

    #[test]
    fn default_byte_orders() {
        assert_eq!(
            AudioSpec::new(FileType::Aiff, SampleFormat::S16, 1, 44_100.0).effective_byte_order(),
            ByteOrder::BigEndian
        );
        assert_eq!(
            AudioSpec::new(FileType::Wave, SampleFormat::S16, 1, 44_100.0).effective_byte_order(),
            ByteOrder::LittleEndian
        );
        let le = AudioSpec::new(FileType::Aiff, SampleFormat::S16, 1, 44_100.0)
            .with_byte_order(ByteOrder::LittleEndian);
        assert_eq!(le.effective_byte_order(), ByteOrder::LittleEndian);
    }

    #[test]
    fn validation_rejects_degenerate_specs() {
        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 0, 44_100.0);
        assert!(spec.validate().is_err());

        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 1, 0.0);
        assert!(spec.validate().is_err());
    }
}
