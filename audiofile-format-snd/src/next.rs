// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

use audiofile_core::errors::{malformed_error, unsupported_error, Result};
use audiofile_core::format::{
    FieldWidth, FormatDescriptor, FormatInfo, LengthField, ReadHeader, Score, WriteHeader,
};
use audiofile_core::io::{ReadBytes, SinkStream, SourceStream, WriteBytes};
use audiofile_core::sample::SampleFormat;
use audiofile_core::spec::{AudioSpec, ByteOrder, FileType};
use audiofile_core::support_format;

/// The ".snd" stream marker.
const SND_STREAM_MARKER: [u8; 4] = *b".snd";

/// A data size of all ones means the payload length must be derived from the physical file
/// length. It is the value writers emit when the final frame count is unknown up front.
const DATA_SIZE_UNKNOWN: u32 = 0xffff_ffff;

/// The fixed header is 24 bytes; writers follow it with one zero pad word.
const HEADER_LEN: u64 = 24;
const WRITE_DATA_OFFSET: u32 = 28;

// Sample encodings, per the NeXT sound file specification. Only linear PCM and IEEE float
// encodings are supported; the various telephony encodings are not.
const ENCODING_LINEAR_8: u32 = 2;
const ENCODING_LINEAR_16: u32 = 3;
const ENCODING_LINEAR_24: u32 = 4;
const ENCODING_LINEAR_32: u32 = 5;
const ENCODING_FLOAT: u32 = 6;
const ENCODING_DOUBLE: u32 = 7;

const NEXT_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Next, short_name: "next", long_name: "NeXT/Sun Audio" };

fn sample_format_for(encoding: u32) -> Result<SampleFormat> {
    match encoding {
        ENCODING_LINEAR_8 => Ok(SampleFormat::S8),
        ENCODING_LINEAR_16 => Ok(SampleFormat::S16),
        ENCODING_LINEAR_24 => Ok(SampleFormat::S24),
        ENCODING_LINEAR_32 => Ok(SampleFormat::S32),
        ENCODING_FLOAT => Ok(SampleFormat::F32),
        ENCODING_DOUBLE => Ok(SampleFormat::F64),
        _ => unsupported_error("next: sample encoding"),
    }
}

fn encoding_for(sample_format: SampleFormat) -> Result<u32> {
    match sample_format {
        SampleFormat::S8 => Ok(ENCODING_LINEAR_8),
        SampleFormat::S16 => Ok(ENCODING_LINEAR_16),
        SampleFormat::S24 => Ok(ENCODING_LINEAR_24),
        SampleFormat::S32 => Ok(ENCODING_LINEAR_32),
        SampleFormat::F32 => Ok(ENCODING_FLOAT),
        SampleFormat::F64 => Ok(ENCODING_DOUBLE),
        SampleFormat::U8 => unsupported_error("next: 8-bit samples are signed"),
    }
}

pub fn score(stream: &mut SourceStream) -> Result<Score> {
    if stream.read_quad_bytes()? != SND_STREAM_MARKER {
        return Ok(Score::Unsupported);
    }

    Ok(Score::Supported(255))
}

pub fn read_header(stream: &mut SourceStream) -> Result<ReadHeader> {
    if stream.read_quad_bytes()? != SND_STREAM_MARKER {
        return malformed_error("next: missing .snd stream marker");
    }

    let data_offset = stream.read_be_u32()?;
    let data_size = stream.read_be_u32()?;
    let encoding = stream.read_be_u32()?;
    let sample_rate = stream.read_be_u32()?;
    let n_channels = stream.read_be_u32()?;

    if u64::from(data_offset) < HEADER_LEN {
        return malformed_error("next: data offset inside header");
    }

    if n_channels < 1 {
        return malformed_error("next: channel count must be at least 1");
    }

    let sample_format = sample_format_for(encoding)?;

    // Any bytes between the fixed header and the data offset are an info string; skip them.
    stream.ignore_bytes(u64::from(data_offset) - HEADER_LEN)?;

    let sample_data_offset = u64::from(data_offset);

    let mut spec = AudioSpec::new(FileType::Next, sample_format, n_channels, f64::from(sample_rate))
        .with_byte_order(ByteOrder::BigEndian);

    let frame_size = spec.frame_size() as u64;

    let declared = if data_size == DATA_SIZE_UNKNOWN { None } else { Some(u64::from(data_size)) };
    let physical = stream.byte_len().map(|len| len.saturating_sub(sample_data_offset));

    let payload = match (declared, physical) {
        (Some(declared), Some(physical)) => cmp::min(declared, physical),
        (Some(declared), None) => declared,
        (None, Some(physical)) => physical,
        (None, None) => 0,
    };

    spec.num_frames = payload / frame_size;

    Ok(ReadHeader { spec, sample_data_offset })
}

pub fn write_header(sink: &mut SinkStream, spec: &AudioSpec) -> Result<WriteHeader> {
    if spec.effective_byte_order() != ByteOrder::BigEndian {
        return unsupported_error("next: samples are big-endian");
    }

    let mut spec = *spec;
    spec.file_type = FileType::Next;
    spec.byte_order = Some(ByteOrder::BigEndian);

    spec.validate()?;

    let encoding = encoding_for(spec.sample_format)?;

    let base = sink.pos();
    let frame_size = spec.frame_size() as u64;

    // When the final frame count is unknown the data size is emitted as the derive-from-length
    // sentinel, keeping the file readable even if the header is never patched.
    let data_size =
        if spec.num_frames > 0 { (spec.num_frames * frame_size) as u32 } else { DATA_SIZE_UNKNOWN };

    sink.write_buf(&SND_STREAM_MARKER)?;
    sink.write_be_u32(WRITE_DATA_OFFSET)?;
    let data_size_offset = sink.pos();
    sink.write_be_u32(data_size)?;
    sink.write_be_u32(encoding)?;
    sink.write_be_u32((spec.sample_rate + 0.5).floor() as u32)?;
    sink.write_be_u32(spec.num_channels)?;

    // The info string: a minimum of four zero bytes.
    sink.write_be_u32(0)?;

    let sample_data_offset = sink.pos();
    debug_assert_eq!(sample_data_offset - base, u64::from(WRITE_DATA_OFFSET));

    let fields = vec![LengthField {
        offset: data_size_offset,
        width: FieldWidth::U32,
        byte_order: ByteOrder::BigEndian,
        value: Box::new(move |frames| frames * frame_size),
    }];

    Ok(WriteHeader::new(spec, sample_data_offset, fields))
}

pub fn descriptor() -> FormatDescriptor {
    support_format!(
        NEXT_FORMAT_INFO,
        &[b".snd"],
        Some(score as _),
        Some(read_header as _),
        Some(write_header as _)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiofile_core::io::SharedSink;
    use std::io::Cursor;

    fn create_snd_test_file(data_size: u32, payload: &[u8]) -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(b".snd");
        file.extend_from_slice(&28u32.to_be_bytes());
        file.extend_from_slice(&data_size.to_be_bytes());
        file.extend_from_slice(&3u32.to_be_bytes()); // 16-bit linear
        file.extend_from_slice(&44100u32.to_be_bytes());
        file.extend_from_slice(&2u32.to_be_bytes());
        file.extend_from_slice(&0u32.to_be_bytes()); // info
        file.extend_from_slice(payload);
        file
    }

    #[test]
    fn writer_emits_fixed_header() {
        let spec = AudioSpec::new(FileType::Next, SampleFormat::S16, 2, 44_100.0)
            .with_num_frames(10_000);

        let shared = SharedSink::new();
        let mut sink = SinkStream::new(Box::new(shared.clone()));
        let header = write_header(&mut sink, &spec).unwrap();

        let bytes = shared.to_vec();

        assert_eq!(&bytes[0..4], &[0x2e, 0x73, 0x6e, 0x64]);
        assert_eq!(&bytes[4..8], &28u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &40_000u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &44_100u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &2u32.to_be_bytes());
        assert_eq!(header.sample_data_offset, 28);
    }

    #[test]
    fn unknown_length_writes_sentinel() {
        let spec = AudioSpec::new(FileType::Next, SampleFormat::S16, 1, 8_000.0);

        let shared = SharedSink::new();
        let mut sink = SinkStream::new(Box::new(shared.clone()));
        let header = write_header(&mut sink, &spec).unwrap();

        assert_eq!(&shared.to_vec()[8..12], &[0xff; 4]);

        // A patch resolves the sentinel.
        header.update(&mut sink, 123).unwrap();
        assert_eq!(&shared.to_vec()[8..12], &246u32.to_be_bytes());
    }

    #[test]
    fn sentinel_data_size_derives_from_file_length() {
        // Physical payload of 7 frames with the all-ones data size.
        let payload = vec![0u8; 7 * 4];
        let file = create_snd_test_file(DATA_SIZE_UNKNOWN, &payload);

        let mut stream = SourceStream::new(Box::new(Cursor::new(file)));
        let header = read_header(&mut stream).unwrap();

        assert_eq!(header.spec.num_frames, 7);
    }

    #[test]
    fn declared_size_is_clipped_to_physical() {
        let payload = vec![0u8; 16];
        let file = create_snd_test_file(400, &payload);

        let mut stream = SourceStream::new(Box::new(Cursor::new(file)));
        let header = read_header(&mut stream).unwrap();

        assert_eq!(header.spec.num_frames, 4);
    }

    #[test]
    fn rejects_unknown_encoding() {
        let mut file = create_snd_test_file(0, &[]);
        file[12..16].copy_from_slice(&1u32.to_be_bytes()); // 8-bit mu-law

        let mut stream = SourceStream::new(Box::new(Cursor::new(file)));
        assert!(matches!(
            read_header(&mut stream),
            Err(audiofile_core::errors::Error::Unsupported(_))
        ));
    }
}
