// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use audiofile_core::errors::{malformed_error, unsupported_error, Result};
use audiofile_core::format::{
    FieldWidth, FormatDescriptor, FormatInfo, LengthField, ReadHeader, Score, WriteHeader,
};
use audiofile_core::io::{ReadBytes, SinkStream, SourceStream, WriteBytes};
use audiofile_core::sample::SampleFormat;
use audiofile_core::spec::{AudioSpec, ByteOrder, FileType};
use audiofile_core::support_format;

use log::info;

use crate::chunks::{ParseChunk, WaveFormatChunk};
use crate::wave::derive_num_frames;

// Wave64 replaces the 4-byte RIFF tags with 16-byte GUIDs: the ASCII tag followed by a fixed
// suffix. Chunk sizes are 64-bit and include the 24-byte chunk header itself; chunk bodies are
// aligned to 8-byte boundaries.
#[rustfmt::skip]
const WAVE64_GUID_RIFF: [u8; 16] = [
    b'r', b'i', b'f', b'f', 0x2e, 0x91, 0xcf, 0x11,
    0xa5, 0xd6, 0x28, 0xdb, 0x04, 0xc1, 0x00, 0x00,
];
#[rustfmt::skip]
const WAVE64_GUID_WAVE: [u8; 16] = [
    b'w', b'a', b'v', b'e', 0xf3, 0xac, 0xd3, 0x11,
    0x8c, 0xd1, 0x00, 0xc0, 0x4f, 0x8e, 0xdb, 0x8a,
];
#[rustfmt::skip]
const WAVE64_GUID_FMT: [u8; 16] = [
    b'f', b'm', b't', b' ', 0xf3, 0xac, 0xd3, 0x11,
    0x8c, 0xd1, 0x00, 0xc0, 0x4f, 0x8e, 0xdb, 0x8a,
];
#[rustfmt::skip]
const WAVE64_GUID_DATA: [u8; 16] = [
    b'd', b'a', b't', b'a', 0xf3, 0xac, 0xd3, 0x11,
    0x8c, 0xd1, 0x00, 0xc0, 0x4f, 0x8e, 0xdb, 0x8a,
];

/// The length of a Wave64 chunk header: a 16-byte GUID plus a 64-bit size.
const CHUNK_HEADER_LEN: u64 = 24;

const WAVE64_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Wave64, short_name: "wave64", long_name: "Sony Wave64" };

pub fn score(stream: &mut SourceStream) -> Result<Score> {
    let mut guid = [0u8; 16];
    stream.read_buf_exact(&mut guid)?;

    if guid != WAVE64_GUID_RIFF {
        return Ok(Score::Unsupported);
    }

    Ok(Score::Supported(255))
}

pub fn read_header(stream: &mut SourceStream) -> Result<ReadHeader> {
    let mut guid = [0u8; 16];
    stream.read_buf_exact(&mut guid)?;

    if guid != WAVE64_GUID_RIFF {
        return malformed_error("wave64: missing riff stream marker");
    }

    // The riff chunk size covers the entire file, header included.
    let riff_len = stream.read_u64()?;

    if riff_len < 2 * CHUNK_HEADER_LEN + 16 && riff_len != u64::MAX {
        return malformed_error("wave64: invalid riff length");
    }

    stream.read_buf_exact(&mut guid)?;

    if guid != WAVE64_GUID_WAVE {
        return malformed_error("wave64: riff form is not wave");
    }

    let mut format: Option<WaveFormatChunk> = None;

    loop {
        stream.read_buf_exact(&mut guid)?;
        let chunk_len = stream.read_u64()?;

        // Sizes include the chunk header; anything shorter is malformed.
        if chunk_len < CHUNK_HEADER_LEN && chunk_len != u64::MAX {
            return malformed_error("wave64: chunk length smaller than chunk header");
        }

        if guid == WAVE64_GUID_FMT {
            let body_len = (chunk_len - CHUNK_HEADER_LEN) as u32;
            format = Some(WaveFormatChunk::parse(stream, [b'f', b'm', b't', b' '], body_len)?);

            // Chunk bodies are padded to the next 8-byte boundary.
            stream.ignore_bytes(padding(u64::from(body_len)))?;
        }
        else if guid == WAVE64_GUID_DATA {
            let Some(format) = format else {
                return malformed_error("wave64: missing fmt chunk");
            };

            let sample_data_offset = stream.pos();

            let declared =
                if chunk_len == u64::MAX { None } else { Some(chunk_len - CHUNK_HEADER_LEN) };

            let mut spec = AudioSpec::new(
                FileType::Wave64,
                format.sample_format,
                u32::from(format.n_channels),
                f64::from(format.sample_rate),
            )
            .with_byte_order(ByteOrder::LittleEndian)
            .with_channel_mask(format.channel_mask);

            spec.num_frames = derive_num_frames(
                declared,
                stream.byte_len(),
                sample_data_offset,
                spec.frame_size() as u64,
            );

            return Ok(ReadHeader { spec, sample_data_offset });
        }
        else {
            // Unknown chunks are skipped, along with their alignment padding.
            info!(
                "ignoring unknown chunk: guid starts {}, len={}.",
                String::from_utf8_lossy(&guid[0..4]),
                chunk_len
            );

            let body_len = chunk_len - CHUNK_HEADER_LEN;
            stream.ignore_bytes(body_len + padding(body_len))?;
        }
    }
}

fn padding(body_len: u64) -> u64 {
    match body_len % 8 {
        0 => 0,
        rem => 8 - rem,
    }
}

pub fn write_header(sink: &mut SinkStream, spec: &AudioSpec) -> Result<WriteHeader> {
    if spec.effective_byte_order() != ByteOrder::LittleEndian {
        return unsupported_error("wave64: samples are little-endian");
    }

    let mut spec = *spec;
    spec.file_type = FileType::Wave64;
    spec.byte_order = Some(ByteOrder::LittleEndian);

    if spec.sample_format == SampleFormat::S8 {
        spec.sample_format = SampleFormat::U8;
    }

    spec.validate()?;

    let base = sink.pos();
    let frame_size = spec.frame_size() as u64;
    let payload = spec.num_frames * frame_size;

    let fmt_len = u64::from(WaveFormatChunk::emit_len(&spec));
    let fmt_pad = padding(fmt_len);

    // Everything before the sample data: riff header + wave form GUID + fmt chunk (padded) +
    // data chunk header.
    let head_len = CHUNK_HEADER_LEN + 16 + CHUNK_HEADER_LEN + fmt_len + fmt_pad + CHUNK_HEADER_LEN;

    sink.write_buf(&WAVE64_GUID_RIFF)?;
    sink.write_u64(head_len + payload + padding(payload))?;
    sink.write_buf(&WAVE64_GUID_WAVE)?;

    sink.write_buf(&WAVE64_GUID_FMT)?;
    sink.write_u64(CHUNK_HEADER_LEN + fmt_len)?;
    WaveFormatChunk::emit(sink, &spec)?;
    sink.write_buf(&vec![0u8; fmt_pad as usize])?;

    sink.write_buf(&WAVE64_GUID_DATA)?;
    let data_len_offset = sink.pos();
    sink.write_u64(CHUNK_HEADER_LEN + payload)?;

    let sample_data_offset = sink.pos();

    let fields = vec![
        LengthField {
            offset: base + 16,
            width: FieldWidth::U64,
            byte_order: ByteOrder::LittleEndian,
            value: Box::new(move |frames| {
                let payload = frames * frame_size;
                head_len + payload + padding(payload)
            }),
        },
        LengthField {
            offset: data_len_offset,
            width: FieldWidth::U64,
            byte_order: ByteOrder::LittleEndian,
            value: Box::new(move |frames| CHUNK_HEADER_LEN + frames * frame_size),
        },
    ];

    Ok(WriteHeader::new(spec, sample_data_offset, fields).with_alignment(8))
}

pub fn descriptor() -> FormatDescriptor {
    support_format!(
        WAVE64_FORMAT_INFO,
        &[&WAVE64_GUID_RIFF],
        Some(score as _),
        Some(read_header as _),
        Some(write_header as _)
    )
}
