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

use extended::Extended;

use crate::chunks::{parser, ChunkParser, ChunksReader, ParseChunk, ParseChunkTag};

/// AIFF is an IFF stream with a "FORM" ASCII stream marker.
const AIFF_STREAM_MARKER: [u8; 4] = *b"FORM";
/// The uncompressed AIFF form.
const AIFF_FORM: [u8; 4] = *b"AIFF";
/// The AIFF-C form, whose COMM chunk carries a compression type.
const AIFC_FORM: [u8; 4] = *b"AIFC";

/// The AIFF-C version timestamp, a constant defined by the AIFF-C specification.
const AIFC_VERSION_1: u32 = 0xa280_5140;

const AIFF_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Aiff, short_name: "aiff", long_name: "Audio Interchange File Format" };

/// `CommonChunk` is a required AIFF chunk, containing the stream description.
pub struct CommonChunk {
    /// The number of channels.
    pub n_channels: i16,
    /// The number of audio frames.
    pub n_sample_frames: u32,
    /// The sample rate in Hz, decoded from the 80-bit extended field.
    pub sample_rate: f64,
    /// The sample encoding.
    pub sample_format: SampleFormat,
    /// The byte order the compression type selects for sample data.
    pub byte_order: ByteOrder,
}

impl CommonChunk {
    fn pcm_format(sample_size: i16) -> Result<SampleFormat> {
        // AIFF stores 8-bit samples as signed two's complement, unlike WAVE.
        match sample_size {
            8 => Ok(SampleFormat::S8),
            16 => Ok(SampleFormat::S16),
            24 => Ok(SampleFormat::S24),
            32 => Ok(SampleFormat::S32),
            _ => unsupported_error("aiff: bits per sample must be 8, 16, 24 or 32 bits"),
        }
    }
}

impl ParseChunk for CommonChunk {
    fn parse<B: ReadBytes>(reader: &mut B, _tag: [u8; 4], len: u32) -> Result<CommonChunk> {
        if len < 18 {
            return malformed_error("aiff: malformed COMM chunk");
        }

        let n_channels = reader.read_be_i16()?;

        if n_channels < 1 {
            return malformed_error("aiff: channel count must be at least 1");
        }

        let n_sample_frames = reader.read_be_u32()?;
        let sample_size = reader.read_be_i16()?;

        let mut rate_bytes = [0u8; 10];
        reader.read_buf_exact(&mut rate_bytes)?;
        let sample_rate = Extended::from_be_bytes(rate_bytes).to_f64();

        // An AIFF-C COMM chunk extends the AIFF layout with a compression type and a
        // Pascal-string compression name. The chunk length tells the two apart.
        let compression_type = if len > 18 {
            if len < 22 {
                return malformed_error("aiff: malformed AIFC COMM chunk");
            }

            let fourcc = reader.read_quad_bytes()?;

            // Skip the compression name and any trailing bytes.
            reader.ignore_bytes(u64::from(len) - 22)?;

            fourcc
        }
        else {
            *b"NONE"
        };

        let (sample_format, byte_order) = match &compression_type {
            b"NONE" | b"twos" => (Self::pcm_format(sample_size)?, ByteOrder::BigEndian),
            b"sowt" => (Self::pcm_format(sample_size)?, ByteOrder::LittleEndian),
            b"fl32" | b"FL32" => (SampleFormat::F32, ByteOrder::BigEndian),
            b"fl64" | b"FL64" => (SampleFormat::F64, ByteOrder::BigEndian),
            _ => return unsupported_error("aiff: compression type"),
        };

        Ok(CommonChunk { n_channels, n_sample_frames, sample_rate, sample_format, byte_order })
    }
}

/// `SoundChunk` is a required AIFF chunk, containing the audio data.
pub struct SoundChunk {
    pub len: u32,
}

impl ParseChunk for SoundChunk {
    fn parse<B: ReadBytes>(reader: &mut B, _: [u8; 4], len: u32) -> Result<SoundChunk> {
        if len < 8 {
            return malformed_error("aiff: malformed SSND chunk");
        }

        let offset = reader.read_be_u32()?;
        let block_size = reader.read_be_u32()?;

        if offset != 0 || block_size != 0 {
            return unsupported_error("aiff: block-aligned sound data");
        }

        Ok(SoundChunk { len })
    }
}

pub enum AiffChunks {
    Common(ChunkParser<CommonChunk>),
    Sound(ChunkParser<SoundChunk>),
}

impl ParseChunkTag for AiffChunks {
    fn parse_tag(tag: [u8; 4], len: u32) -> Option<Self> {
        match &tag {
            b"COMM" => parser!(AiffChunks::Common, CommonChunk, tag, len),
            b"SSND" => parser!(AiffChunks::Sound, SoundChunk, tag, len),
            _ => None,
        }
    }
}

pub fn score(stream: &mut SourceStream) -> Result<Score> {
    let marker = stream.read_quad_bytes()?;
    stream.ignore_bytes(4)?;
    let form = stream.read_quad_bytes()?;

    if marker != AIFF_STREAM_MARKER || (form != AIFF_FORM && form != AIFC_FORM) {
        return Ok(Score::Unsupported);
    }

    Ok(Score::Supported(255))
}

pub fn read_header(stream: &mut SourceStream) -> Result<ReadHeader> {
    let marker = stream.read_quad_bytes()?;

    if marker != AIFF_STREAM_MARKER {
        return malformed_error("aiff: missing form stream marker");
    }

    let form_len = stream.read_be_u32()?;

    if form_len < 4 && form_len != u32::MAX {
        return malformed_error("aiff: invalid form length");
    }

    let form = stream.read_quad_bytes()?;

    if form != AIFF_FORM && form != AIFC_FORM {
        return malformed_error("aiff: form is not aiff or aifc");
    }

    let form_data_len = if form_len < u32::MAX { Some(form_len - 4) } else { None };

    let mut chunks = ChunksReader::<AiffChunks>::new(form_data_len, ByteOrder::BigEndian);

    let mut common: Option<CommonChunk> = None;

    loop {
        let chunk = chunks.next(stream)?;

        let Some(chunk) = chunk else {
            return malformed_error("aiff: missing SSND chunk");
        };

        match chunk {
            AiffChunks::Common(comm) => {
                common = Some(comm.parse(stream)?);
            }
            AiffChunks::Sound(snd) => {
                let sound = snd.parse(stream)?;

                let Some(common) = common else {
                    return malformed_error("aiff: missing COMM chunk before SSND");
                };

                let sample_data_offset = stream.pos();

                let mut spec = AudioSpec::new(
                    FileType::Aiff,
                    common.sample_format,
                    common.n_channels as u32,
                    common.sample_rate,
                )
                .with_byte_order(common.byte_order);

                let frame_size = spec.frame_size() as u64;

                // The COMM frame count is authoritative, bounded by the physical payload.
                let declared = u64::from(sound.len) - 8;
                let physical = stream
                    .byte_len()
                    .map(|len| len.saturating_sub(sample_data_offset))
                    .unwrap_or(declared);

                spec.num_frames = cmp::min(
                    u64::from(common.n_sample_frames),
                    cmp::min(declared, physical) / frame_size,
                );

                return Ok(ReadHeader { spec, sample_data_offset });
            }
        }
    }
}

/// The compression type and Pascal-string compression name emitted for a spec.
fn compression(spec: &AudioSpec) -> ([u8; 4], &'static str) {
    match (spec.sample_format, spec.effective_byte_order()) {
        (SampleFormat::F32, _) => (*b"fl32", "32-bit float"),
        (SampleFormat::F64, _) => (*b"fl64", "64-bit float"),
        (_, ByteOrder::LittleEndian) => (*b"sowt", ""),
        (_, ByteOrder::BigEndian) => (*b"NONE", "not compressed"),
    }
}

pub fn write_header(sink: &mut SinkStream, spec: &AudioSpec) -> Result<WriteHeader> {
    let mut spec = *spec;
    spec.file_type = FileType::Aiff;
    spec.byte_order = Some(spec.effective_byte_order());

    if spec.sample_format == SampleFormat::U8 {
        return unsupported_error("aiff: 8-bit samples are signed");
    }

    if spec.sample_format.is_float() && spec.byte_order == Some(ByteOrder::LittleEndian) {
        return unsupported_error("aiff: floating-point samples are big-endian");
    }

    spec.validate()?;

    // Little-endian samples and floating-point encodings require the AIFF-C form.
    let is_aifc = spec.byte_order == Some(ByteOrder::LittleEndian) || spec.sample_format.is_float();

    let base = sink.pos();
    let frame_size = spec.frame_size() as u64;
    let payload = spec.num_frames * frame_size;

    let (compression_type, compression_name) = compression(&spec);

    // A Pascal string is a length byte plus the characters, padded to an even total.
    let pascal_len = 1 + compression_name.len();
    let pascal_len = pascal_len + (pascal_len & 1);

    let comm_len: u32 = if is_aifc { 18 + 4 + pascal_len as u32 } else { 18 };

    // FORM length: the form type plus every chunk, patched once the frame count is final.
    let head_len = 4
        + if is_aifc { 8 + 4 } else { 0 }
        + (8 + u64::from(comm_len))
        + (8 + 8);

    sink.write_buf(&AIFF_STREAM_MARKER)?;
    sink.write_be_u32((head_len + payload + (payload & 1)) as u32)?;
    sink.write_buf(if is_aifc { &AIFC_FORM } else { &AIFF_FORM })?;

    if is_aifc {
        sink.write_buf(b"FVER")?;
        sink.write_be_u32(4)?;
        sink.write_be_u32(AIFC_VERSION_1)?;
    }

    sink.write_buf(b"COMM")?;
    sink.write_be_u32(comm_len)?;
    sink.write_be_i16(spec.num_channels as i16)?;
    let comm_frames_offset = sink.pos();
    sink.write_be_u32(spec.num_frames as u32)?;
    sink.write_be_i16(spec.sample_format.bits_per_sample() as i16)?;
    sink.write_buf(&Extended::from(spec.sample_rate).to_be_bytes())?;

    if is_aifc {
        sink.write_buf(&compression_type)?;
        sink.write_byte(compression_name.len() as u8)?;
        sink.write_buf(compression_name.as_bytes())?;
        if (1 + compression_name.len()) & 1 == 1 {
            sink.write_byte(0)?;
        }
    }

    sink.write_buf(b"SSND")?;
    let ssnd_len_offset = sink.pos();
    sink.write_be_u32((payload + 8) as u32)?;
    sink.write_be_u32(0)?;
    sink.write_be_u32(0)?;

    let sample_data_offset = sink.pos();

    let fields = vec![
        LengthField {
            offset: base + 4,
            width: FieldWidth::U32,
            byte_order: ByteOrder::BigEndian,
            value: Box::new(move |frames| {
                let payload = frames * frame_size;
                head_len + payload + (payload & 1)
            }),
        },
        LengthField {
            offset: comm_frames_offset,
            width: FieldWidth::U32,
            byte_order: ByteOrder::BigEndian,
            value: Box::new(|frames| frames),
        },
        LengthField {
            offset: ssnd_len_offset,
            width: FieldWidth::U32,
            byte_order: ByteOrder::BigEndian,
            value: Box::new(move |frames| frames * frame_size + 8),
        },
    ];

    Ok(WriteHeader::new(spec, sample_data_offset, fields).with_alignment(2))
}

pub fn descriptor() -> FormatDescriptor {
    support_format!(
        AIFF_FORMAT_INFO,
        &[b"FORM"],
        Some(score as _),
        Some(read_header as _),
        Some(write_header as _)
    )
}
