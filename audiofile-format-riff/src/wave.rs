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

use log::debug;

use crate::chunks::{parser, ChunkParser, ChunksReader, ParseChunk, ParseChunkTag, WaveFormatChunk};

/// WAVE is actually a RIFF stream, with a "RIFF" ASCII stream marker.
const WAVE_STREAM_MARKER: [u8; 4] = *b"RIFF";
/// A RIFF form of "WAVE" identifies a WAVE stream.
const WAVE_RIFF_FORM: [u8; 4] = *b"WAVE";

const WAVE_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Wave, short_name: "wave", long_name: "Waveform Audio File Format" };

pub struct FactChunk {
    pub n_frames: u32,
}

impl ParseChunk for FactChunk {
    fn parse<B: ReadBytes>(reader: &mut B, _tag: [u8; 4], len: u32) -> Result<Self> {
        // A Fact chunk is exactly 4 bytes long, though there is some mystery as to whether there
        // can be more fields in the chunk.
        if len < 4 {
            return malformed_error("wav: malformed fact chunk");
        }

        let n_frames = reader.read_u32()?;
        reader.ignore_bytes(u64::from(len) - 4)?;

        Ok(FactChunk { n_frames })
    }
}

pub struct DataChunk {
    /// The declared payload length, or `None` when the length was the streaming sentinel.
    pub len: Option<u32>,
}

impl ParseChunk for DataChunk {
    fn parse<B: ReadBytes>(_: &mut B, _: [u8; 4], len: u32) -> Result<DataChunk> {
        let len = if len == u32::MAX { None } else { Some(len) };
        Ok(DataChunk { len })
    }
}

pub enum RiffWaveChunks {
    Format(ChunkParser<WaveFormatChunk>),
    Fact(ChunkParser<FactChunk>),
    Data(ChunkParser<DataChunk>),
}

impl ParseChunkTag for RiffWaveChunks {
    fn parse_tag(tag: [u8; 4], len: u32) -> Option<Self> {
        match &tag {
            b"fmt " => parser!(RiffWaveChunks::Format, WaveFormatChunk, tag, len),
            b"fact" => parser!(RiffWaveChunks::Fact, FactChunk, tag, len),
            b"data" => parser!(RiffWaveChunks::Data, DataChunk, tag, len),
            _ => None,
        }
    }
}

pub fn score(stream: &mut SourceStream) -> Result<Score> {
    // Perform simple scoring by testing that the RIFF stream marker and RIFF form are both valid
    // for WAVE.
    let marker = stream.read_quad_bytes()?;
    stream.ignore_bytes(4)?;
    let riff_form = stream.read_quad_bytes()?;

    if marker != WAVE_STREAM_MARKER || riff_form != WAVE_RIFF_FORM {
        return Ok(Score::Unsupported);
    }

    Ok(Score::Supported(255))
}

pub fn read_header(stream: &mut SourceStream) -> Result<ReadHeader> {
    // A Wave file is one large RIFF chunk, with the actual meta and audio data contained in
    // nested chunks. Therefore, the file starts with a RIFF chunk header (chunk ID & size).
    let marker = stream.read_quad_bytes()?;

    if marker != WAVE_STREAM_MARKER {
        return malformed_error("wav: missing riff stream marker");
    }

    // The length of the top-level RIFF chunk. When a file is piped to a non-seekable sink the
    // length cannot be known ahead of time and is written as the all-ones sentinel.
    let riff_len = stream.read_u32()?;

    if riff_len < 4 && riff_len != u32::MAX {
        return malformed_error("wav: invalid riff length");
    }

    let riff_form = stream.read_quad_bytes()?;

    if riff_form != WAVE_RIFF_FORM {
        return malformed_error("wav: riff form is not wave");
    }

    let riff_data_len = if riff_len < u32::MAX { Some(riff_len - 4) } else { None };

    let mut riff_chunks = ChunksReader::<RiffWaveChunks>::new(riff_data_len, ByteOrder::LittleEndian);

    let mut format: Option<WaveFormatChunk> = None;
    let mut fact: Option<FactChunk> = None;

    loop {
        let chunk = riff_chunks.next(stream)?;

        // The last chunk should always be a data chunk, if it is not, then the stream is
        // malformed.
        let Some(chunk) = chunk else {
            return malformed_error("wav: missing data chunk");
        };

        match chunk {
            RiffWaveChunks::Format(fmt) => {
                format = Some(fmt.parse(stream)?);
            }
            RiffWaveChunks::Fact(fct) => {
                fact = Some(fct.parse(stream)?);
            }
            RiffWaveChunks::Data(dat) => {
                let data = dat.parse(stream)?;

                let Some(format) = format else {
                    return malformed_error("wav: missing fmt chunk");
                };

                let sample_data_offset = stream.pos();

                let mut spec = AudioSpec::new(
                    FileType::Wave,
                    format.sample_format,
                    u32::from(format.n_channels),
                    f64::from(format.sample_rate),
                )
                .with_byte_order(ByteOrder::LittleEndian)
                .with_channel_mask(format.channel_mask);

                spec.num_frames = derive_num_frames(
                    data.len.map(u64::from),
                    stream.byte_len(),
                    sample_data_offset,
                    spec.frame_size() as u64,
                );

                // A fact chunk carries the authoritative frame count when present.
                if let Some(fact) = fact {
                    spec.num_frames = u64::from(fact.n_frames);
                }

                return Ok(ReadHeader { spec, sample_data_offset });
            }
        }
    }
}

/// Reconciles a declared payload length with the physical stream length: the payload is the
/// smaller of the two, and a missing declaration (sentinel) falls back to the physical length.
pub(crate) fn derive_num_frames(
    declared: Option<u64>,
    byte_len: Option<u64>,
    sample_data_offset: u64,
    frame_size: u64,
) -> u64 {
    let physical = byte_len.map(|len| len.saturating_sub(sample_data_offset));

    let payload = match (declared, physical) {
        (Some(declared), Some(physical)) => cmp::min(declared, physical),
        (Some(declared), None) => declared,
        (None, Some(physical)) => physical,
        (None, None) => 0,
    };

    payload / frame_size
}

pub fn write_header(sink: &mut SinkStream, spec: &AudioSpec) -> Result<WriteHeader> {
    if spec.effective_byte_order() != ByteOrder::LittleEndian {
        return unsupported_error("wav: samples are little-endian");
    }

    let mut spec = *spec;
    spec.file_type = FileType::Wave;
    spec.byte_order = Some(ByteOrder::LittleEndian);

    // WAVE stores 8-bit samples in offset binary.
    if spec.sample_format == SampleFormat::S8 {
        debug!("storing 8-bit samples as offset binary");
        spec.sample_format = SampleFormat::U8;
    }

    spec.validate()?;

    let base = sink.pos();
    let frame_size = spec.frame_size() as u64;
    let payload = spec.num_frames * frame_size;

    let fmt_len = WaveFormatChunk::emit_len(&spec);

    // Lengths after the 8-byte RIFF chunk header: the WAVE form, the fmt chunk, and the data
    // chunk header.
    let head_len = 4 + 8 + u64::from(fmt_len) + 8;

    sink.write_buf(&WAVE_STREAM_MARKER)?;
    sink.write_u32((head_len + payload + (payload & 1)) as u32)?;
    sink.write_buf(&WAVE_RIFF_FORM)?;

    sink.write_buf(b"fmt ")?;
    sink.write_u32(fmt_len)?;
    WaveFormatChunk::emit(sink, &spec)?;

    sink.write_buf(b"data")?;
    let data_len_offset = sink.pos();
    sink.write_u32(payload as u32)?;

    let sample_data_offset = sink.pos();

    let fields = vec![
        LengthField {
            offset: base + 4,
            width: FieldWidth::U32,
            byte_order: ByteOrder::LittleEndian,
            value: Box::new(move |frames| {
                let payload = frames * frame_size;
                head_len + payload + (payload & 1)
            }),
        },
        LengthField {
            offset: data_len_offset,
            width: FieldWidth::U32,
            byte_order: ByteOrder::LittleEndian,
            value: Box::new(move |frames| frames * frame_size),
        },
    ];

    Ok(WriteHeader::new(spec, sample_data_offset, fields).with_alignment(2))
}

pub fn descriptor() -> FormatDescriptor {
    support_format!(
        WAVE_FORMAT_INFO,
        &[b"RIFF"],
        Some(score as _),
        Some(read_header as _),
        Some(write_header as _)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::KSDATAFORMAT_SUBTYPE_IEEE_FLOAT;
    use std::io::Cursor;

    /// Creates a minimal valid WAV file in memory.
    fn create_wav_test_file(pcm_data: &[u8]) -> Vec<u8> {
        let mut file = Vec::new();
        let data_len = pcm_data.len() as u32;

        // RIFF header
        file.extend_from_slice(b"RIFF");
        let total_size = 4 + 8 + 16 + 8 + data_len; // WAVE + fmt chunk + data chunk
        file.extend_from_slice(&total_size.to_le_bytes());
        file.extend_from_slice(b"WAVE");

        // fmt chunk
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes()); // PCM
        file.extend_from_slice(&1u16.to_le_bytes()); // mono
        file.extend_from_slice(&44100u32.to_le_bytes()); // sample rate
        file.extend_from_slice(&88200u32.to_le_bytes()); // byte rate
        file.extend_from_slice(&2u16.to_le_bytes()); // block align
        file.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

        // data chunk
        file.extend_from_slice(b"data");
        file.extend_from_slice(&data_len.to_le_bytes());
        file.extend_from_slice(pcm_data);

        file
    }

    fn stream(data: Vec<u8>) -> SourceStream {
        SourceStream::new(Box::new(Cursor::new(data)))
    }

    #[test]
    fn reads_basic_pcm_header() {
        let pcm_data = vec![0u8; 1000]; // 500 frames at 16-bit mono
        let mut ss = stream(create_wav_test_file(&pcm_data));

        let header = read_header(&mut ss).unwrap();

        assert_eq!(header.spec.sample_format, SampleFormat::S16);
        assert_eq!(header.spec.num_channels, 1);
        assert_eq!(header.spec.sample_rate, 44_100.0);
        assert_eq!(header.spec.num_frames, 500);
        assert_eq!(header.sample_data_offset, 44);
    }

    #[test]
    fn declared_length_is_clipped_to_physical_length() {
        let pcm_data = vec![0u8; 100];
        let mut file = create_wav_test_file(&pcm_data);
        // Lie about the data length: claim 1000 bytes while only 100 are present.
        file[40..44].copy_from_slice(&1000u32.to_le_bytes());

        let header = read_header(&mut stream(file)).unwrap();
        assert_eq!(header.spec.num_frames, 50);
    }

    #[test]
    fn unknown_chunks_are_skipped_with_padding() {
        let mut file = Vec::new();
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&(4 + 8 + 7 + 1 + 8 + 16 + 8u32).to_le_bytes());
        file.extend_from_slice(b"WAVE");

        // An odd-length junk chunk; the skip must cover the pad byte.
        file.extend_from_slice(b"JUNK");
        file.extend_from_slice(&7u32.to_le_bytes());
        file.extend_from_slice(&[0xee; 7]);
        file.push(0);

        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&1u16.to_le_bytes());
        file.extend_from_slice(&2u16.to_le_bytes());
        file.extend_from_slice(&48000u32.to_le_bytes());
        file.extend_from_slice(&192000u32.to_le_bytes());
        file.extend_from_slice(&4u16.to_le_bytes());
        file.extend_from_slice(&16u16.to_le_bytes());

        file.extend_from_slice(b"data");
        file.extend_from_slice(&0u32.to_le_bytes());

        let header = read_header(&mut stream(file)).unwrap();
        assert_eq!(header.spec.num_channels, 2);
        assert_eq!(header.spec.num_frames, 0);
    }

    #[test]
    fn writer_emits_basic_fmt_for_16_bit_stereo() {
        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 2, 44_100.0);

        let mut sink = SinkStream::new(Box::new(Cursor::new(Vec::new())));
        let header = write_header(&mut sink, &spec).unwrap();

        assert_eq!(header.sample_data_offset, 44);
        assert!(header.is_patchable());
        assert!(!WaveFormatChunk::is_extensible(&spec));
    }

    #[test]
    fn writer_promotes_to_extensible() {
        use audiofile_core::io::SharedSink;

        // Float32, 6 channels: both the width and channel count force the extensible form.
        let spec = AudioSpec::new(FileType::Wave, SampleFormat::F32, 6, 48_000.0).with_num_frames(1000);

        let shared = SharedSink::new();
        let mut sink = SinkStream::new(Box::new(shared.clone()));
        let header = write_header(&mut sink, &spec).unwrap();

        // 12-byte RIFF/WAVE preamble, 8 + 40 byte fmt chunk, 8 byte data header.
        assert_eq!(header.sample_data_offset, 68);

        let bytes = shared.to_vec();

        // formatTag must be WAVE_FORMAT_EXTENSIBLE.
        assert_eq!(&bytes[20..22], &0xfffeu16.to_le_bytes());
        // Valid bits and channel mask (unset by default).
        assert_eq!(&bytes[38..40], &32u16.to_le_bytes());
        assert_eq!(&bytes[40..44], &0u32.to_le_bytes());
        // The sub-format GUID must be the IEEE float subtype, 00000003-0000-0010-8000-00AA00389B71.
        assert_eq!(&bytes[44..60], &KSDATAFORMAT_SUBTYPE_IEEE_FLOAT);
        // The data chunk length reflects the declared 1000 frames.
        assert_eq!(&bytes[60..64], b"data");
        assert_eq!(&bytes[64..68], &24_000u32.to_le_bytes());
    }

    #[test]
    fn writer_patches_length_fields() {
        use audiofile_core::io::SharedSink;

        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 2, 44_100.0);

        let shared = SharedSink::new();
        let mut sink = SinkStream::new(Box::new(shared.clone()));
        let header = write_header(&mut sink, &spec).unwrap();

        header.update(&mut sink, 100).unwrap();

        let bytes = shared.to_vec();
        // RIFF length: everything after the 8-byte header plus 400 payload bytes.
        assert_eq!(&bytes[4..8], &(36u32 + 400).to_le_bytes());
        assert_eq!(&bytes[40..44], &400u32.to_le_bytes());
    }

    #[test]
    fn rejects_big_endian_requests() {
        let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 2, 44_100.0)
            .with_byte_order(ByteOrder::BigEndian);

        let mut sink = SinkStream::new(Box::new(Cursor::new(Vec::new())));
        assert!(write_header(&mut sink, &spec).is_err());
    }
}
