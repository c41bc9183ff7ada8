// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `format` module defines the header codec interface: identification, header parsing,
//! header emission with back-patchable length fields, and the ordered format registry.

use std::io::{Seek, SeekFrom};

use log::debug;

use crate::errors::{Error, Result};
use crate::io::{ReadBytes, SinkStream, SourceStream, WriteBytes};
use crate::spec::{AudioSpec, ByteOrder, FileType};

/// `FormatInfo` is a basic description of a container format.
#[derive(Copy, Clone, Debug)]
pub struct FormatInfo {
    /// The file type this format reads and writes.
    pub file_type: FileType,
    /// A short ASCII-only string identifying the format.
    pub short_name: &'static str,
    /// A longer, more descriptive, string identifying the format.
    pub long_name: &'static str,
}

/// The result of an identification attempt.
pub enum Score {
    /// The stream is not this format.
    Unsupported,
    /// The stream is this format, with a confidence between 0 (not confident) and 255 (very
    /// confident).
    Supported(u8),
}

/// The width of a back-patchable length field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldWidth {
    U32,
    U64,
}

/// One length field of a written header, patchable in place once the final frame count is known.
pub struct LengthField {
    /// The absolute byte offset of the field.
    pub offset: u64,
    /// The width of the field.
    pub width: FieldWidth,
    /// The byte order of the field.
    pub byte_order: ByteOrder,
    /// Computes the field value from a frame count.
    pub value: Box<dyn Fn(u64) -> u64 + Send + Sync>,
}

/// `ReadHeader` is the immutable result of parsing a header.
pub struct ReadHeader {
    /// The file description. `num_frames` is authoritative and already reconciled against the
    /// physical stream length; `byte_order` holds the order actually used on disk.
    pub spec: AudioSpec,
    /// The absolute byte offset at which interleaved sample data begins.
    pub sample_data_offset: u64,
}

/// `WriteHeader` describes an emitted header: the written description, where sample data begins,
/// and the length fields to patch once the payload size is final.
pub struct WriteHeader {
    /// The file description as written.
    pub spec: AudioSpec,
    /// The absolute byte offset at which interleaved sample data begins.
    pub sample_data_offset: u64,
    /// The byte alignment the payload must be padded to on close: 2 for RIFF/IFF containers,
    /// 8 for Wave64, 1 when no padding is required.
    pub alignment: u64,
    fields: Vec<LengthField>,
}

impl WriteHeader {
    pub fn new(spec: AudioSpec, sample_data_offset: u64, fields: Vec<LengthField>) -> Self {
        WriteHeader { spec, sample_data_offset, alignment: 1, fields }
    }

    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// The number of zero bytes that must follow a payload to reach the container's chunk
    /// alignment.
    pub fn padding(&self, payload_len: u64) -> u64 {
        match payload_len % self.alignment {
            0 => 0,
            rem => self.alignment - rem,
        }
    }

    /// Returns true if the header carries length fields requiring a patch. Formats without any
    /// in-header size (IRCAM, raw) return false and need no update.
    pub fn is_patchable(&self) -> bool {
        !self.fields.is_empty()
    }

    /// The length fields of the header.
    pub fn fields(&self) -> &[LengthField] {
        &self.fields
    }

    /// Rewrites every length field in place for the given frame count, then restores the sink
    /// position.
    pub fn update(&self, sink: &mut SinkStream, num_frames: u64) -> Result<()> {
        let saved = sink.pos();

        for field in &self.fields {
            let value = (field.value)(num_frames);

            debug!("patching length field at offset {} to {}", field.offset, value);

            sink.seek(SeekFrom::Start(field.offset)).map_err(Error::from)?;

            match (field.width, field.byte_order) {
                (FieldWidth::U32, ByteOrder::LittleEndian) => sink.write_u32(value as u32)?,
                (FieldWidth::U32, ByteOrder::BigEndian) => sink.write_be_u32(value as u32)?,
                (FieldWidth::U64, ByteOrder::LittleEndian) => sink.write_u64(value)?,
                (FieldWidth::U64, ByteOrder::BigEndian) => sink.write_be_u64(value)?,
            }
        }

        sink.seek(SeekFrom::Start(saved)).map_err(Error::from)?;

        Ok(())
    }
}

/// Identification function: decide from the leading bytes whether the stream is this format.
pub type IdentifyFn = fn(&mut SourceStream) -> Result<Score>;
/// Header parse function.
pub type ReadFn = fn(&mut SourceStream) -> Result<ReadHeader>;
/// Header emit function.
pub type WriteFn = fn(&mut SinkStream, &AudioSpec) -> Result<WriteHeader>;

/// `FormatDescriptor` provides declarative information about a container format and the
/// capability functions to identify, parse, and emit it. Absent functions mean the capability is
/// not supported (e.g. raw files cannot be identified).
pub struct FormatDescriptor {
    /// A basic description of the format.
    pub info: FormatInfo,
    /// A byte-string start-of-stream marker for each variant of the format.
    pub markers: &'static [&'static [u8]],
    pub identify: Option<IdentifyFn>,
    pub read: Option<ReadFn>,
    pub write: Option<WriteFn>,
}

/// `FormatRegistry` holds format descriptors in registration order and identifies streams
/// against them.
#[derive(Default)]
pub struct FormatRegistry {
    descriptors: Vec<FormatDescriptor>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry { descriptors: Vec::new() }
    }

    /// Registers a descriptor. Registration order is probe order.
    pub fn register(&mut self, descriptor: FormatDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Gets the descriptor for a file type, if registered.
    pub fn descriptor(&self, file_type: FileType) -> Option<&FormatDescriptor> {
        self.descriptors.iter().find(|d| d.info.file_type == file_type)
    }

    /// Probes the stream against each registered identifier in order, rewinding the stream
    /// between attempts, and returns the first match.
    ///
    /// An identifier failing with an I/O error (including a premature end of stream) is treated
    /// as a non-match, not propagated.
    pub fn identify(&self, stream: &mut SourceStream) -> Result<Option<FileType>> {
        let start = stream.pos();

        for descriptor in &self.descriptors {
            let Some(identify) = descriptor.identify else { continue };

            let score = identify(stream);

            stream.seek(start)?;

            match score {
                Ok(Score::Supported(confidence)) => {
                    debug!(
                        "identified {} with confidence {}",
                        descriptor.info.short_name, confidence
                    );
                    return Ok(Some(descriptor.info.file_type));
                }
                Ok(Score::Unsupported) => (),
                Err(Error::IoError(_)) | Err(Error::EndOfFile) => (),
                Err(err) => return Err(err),
            }
        }

        Ok(None)
    }
}

/// Convenience macro for building a [`FormatDescriptor`].
#[macro_export]
macro_rules! support_format {
    ($info:expr, $markers:expr, $identify:expr, $read:expr, $write:expr) => {
        $crate::format::FormatDescriptor {
            info: $info,
            markers: $markers,
            identify: $identify,
            read: $read,
            write: $write,
        }
    };
}
