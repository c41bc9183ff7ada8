// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use audiofile_core::errors::{malformed_error, unsupported_error, Result};
use audiofile_core::format::{FormatDescriptor, FormatInfo, ReadHeader, Score, WriteHeader};
use audiofile_core::io::{ReadBytes, SinkStream, SourceStream, WriteBytes};
use audiofile_core::sample::SampleFormat;
use audiofile_core::spec::{AudioSpec, ByteOrder, FileType};
use audiofile_core::support_format;

// BICSF magic markers. Each machine variant wrote the magic in its native byte order, so two
// markers imply little-endian data (VAX, MIPS) and two imply big-endian data (Sun, NeXT). The
// marker's byte order is authoritative for the sample data.
const MARKER_VAX_LE: [u8; 4] = [0x64, 0xa3, 0x01, 0x00];
const MARKER_MIPS_LE: [u8; 4] = [0x64, 0xa3, 0x03, 0x00];
const MARKER_SUN_BE: [u8; 4] = [0x00, 0x02, 0xa3, 0x64];
const MARKER_NEXT_BE: [u8; 4] = [0x00, 0x04, 0xa3, 0x64];

/// Sample data begins at a fixed offset; the gap after the fixed fields is zero-filled.
const DATA_OFFSET: u64 = 1024;

// Encoding codes, per the BICSF header definition.
const FORMAT_LINEAR_16: u32 = 0x0001;
const FORMAT_FLOAT: u32 = 0x0002;
const FORMAT_LINEAR_32: u32 = 0x4_0003;
const FORMAT_LINEAR_8: u32 = 0x4_0004;
const FORMAT_LINEAR_24: u32 = 0x4_0006;

const IRCAM_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Ircam, short_name: "ircam", long_name: "IRCAM BICSF" };

fn byte_order_for(marker: [u8; 4]) -> Option<ByteOrder> {
    match marker {
        MARKER_VAX_LE | MARKER_MIPS_LE => Some(ByteOrder::LittleEndian),
        MARKER_SUN_BE | MARKER_NEXT_BE => Some(ByteOrder::BigEndian),
        _ => None,
    }
}

fn sample_format_for(encoding: u32) -> Result<SampleFormat> {
    match encoding {
        FORMAT_LINEAR_16 => Ok(SampleFormat::S16),
        FORMAT_FLOAT => Ok(SampleFormat::F32),
        FORMAT_LINEAR_8 => Ok(SampleFormat::S8),
        FORMAT_LINEAR_24 => Ok(SampleFormat::S24),
        FORMAT_LINEAR_32 => Ok(SampleFormat::S32),
        _ => unsupported_error("ircam: sample encoding"),
    }
}

fn encoding_for(sample_format: SampleFormat) -> Result<u32> {
    match sample_format {
        SampleFormat::S16 => Ok(FORMAT_LINEAR_16),
        SampleFormat::F32 => Ok(FORMAT_FLOAT),
        SampleFormat::S8 => Ok(FORMAT_LINEAR_8),
        SampleFormat::S24 => Ok(FORMAT_LINEAR_24),
        SampleFormat::S32 => Ok(FORMAT_LINEAR_32),
        SampleFormat::U8 => unsupported_error("ircam: 8-bit samples are signed"),
        SampleFormat::F64 => unsupported_error("ircam: 64-bit floats are not defined"),
    }
}

pub fn score(stream: &mut SourceStream) -> Result<Score> {
    if byte_order_for(stream.read_quad_bytes()?).is_none() {
        return Ok(Score::Unsupported);
    }

    Ok(Score::Supported(255))
}

pub fn read_header(stream: &mut SourceStream) -> Result<ReadHeader> {
    let marker = stream.read_quad_bytes()?;

    let Some(byte_order) = byte_order_for(marker) else {
        return malformed_error("ircam: missing bicsf stream marker");
    };

    let (sample_rate, n_channels, encoding) = match byte_order {
        ByteOrder::LittleEndian => {
            (stream.read_f32()?, stream.read_u32()?, stream.read_u32()?)
        }
        ByteOrder::BigEndian => {
            (stream.read_be_f32()?, stream.read_be_u32()?, stream.read_be_u32()?)
        }
    };

    if n_channels < 1 {
        return malformed_error("ircam: channel count must be at least 1");
    }

    if !(sample_rate > 0.0) || !sample_rate.is_finite() {
        return malformed_error("ircam: sample rate must be positive");
    }

    let sample_format = sample_format_for(encoding)?;

    // The remainder of the 1024-byte header holds extension blocks; none are recognized.
    stream.ignore_bytes(DATA_OFFSET - 16)?;

    let mut spec =
        AudioSpec::new(FileType::Ircam, sample_format, n_channels, f64::from(sample_rate))
            .with_byte_order(byte_order);

    // There is no in-header payload size; the frame count is derived from the file length.
    let frame_size = spec.frame_size() as u64;
    spec.num_frames = match stream.byte_len() {
        Some(len) => len.saturating_sub(DATA_OFFSET) / frame_size,
        None => 0,
    };

    Ok(ReadHeader { spec, sample_data_offset: DATA_OFFSET })
}

pub fn write_header(sink: &mut SinkStream, spec: &AudioSpec) -> Result<WriteHeader> {
    let mut spec = *spec;
    spec.file_type = FileType::Ircam;

    let byte_order = spec.effective_byte_order();
    spec.byte_order = Some(byte_order);

    spec.validate()?;

    let encoding = encoding_for(spec.sample_format)?;

    match byte_order {
        ByteOrder::LittleEndian => {
            sink.write_buf(&MARKER_VAX_LE)?;
            sink.write_f32(spec.sample_rate as f32)?;
            sink.write_u32(spec.num_channels)?;
            sink.write_u32(encoding)?;
        }
        ByteOrder::BigEndian => {
            sink.write_buf(&MARKER_SUN_BE)?;
            sink.write_be_f32(spec.sample_rate as f32)?;
            sink.write_be_u32(spec.num_channels)?;
            sink.write_be_u32(encoding)?;
        }
    }

    // Zero-fill up to the fixed data offset.
    sink.write_buf(&[0u8; (DATA_OFFSET - 16) as usize])?;

    // No length field exists, so nothing requires patching on update.
    Ok(WriteHeader::new(spec, DATA_OFFSET, Vec::new()))
}

pub fn descriptor() -> FormatDescriptor {
    support_format!(
        IRCAM_FORMAT_INFO,
        &[&MARKER_VAX_LE, &MARKER_MIPS_LE, &MARKER_SUN_BE, &MARKER_NEXT_BE],
        Some(score as _),
        Some(read_header as _),
        Some(write_header as _)
    )
}
