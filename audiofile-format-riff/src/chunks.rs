// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::marker::PhantomData;

use audiofile_core::errors::{malformed_error, unsupported_error, Result};
use audiofile_core::io::{ReadBytes, SinkStream, WriteBytes};
use audiofile_core::sample::SampleFormat;
use audiofile_core::spec::{AudioSpec, ByteOrder};

use log::info;

/// `ParseChunkTag` implements `parse_tag` to map between the 4-byte chunk identifier and the
/// enumeration of recognized chunks.
pub trait ParseChunkTag: Sized {
    fn parse_tag(tag: [u8; 4], len: u32) -> Option<Self>;
}

/// `ChunksReader` reads chunks from a byte stream. It is generic across a type, usually an enum,
/// implementing the `ParseChunkTag` trait. When a new chunk is encountered in the stream,
/// `parse_tag` on T is called to return an object capable of parsing/reading that chunk or
/// `None`. This makes reading the actual chunk data lazy in that the chunk is not read until the
/// object is consumed.
pub struct ChunksReader<T: ParseChunkTag> {
    len: Option<u64>,
    byte_order: ByteOrder,
    consumed: u64,
    phantom: PhantomData<T>,
}

impl<T: ParseChunkTag> ChunksReader<T> {
    /// `len` is the byte length of the parent chunk body, or `None` when the parent length was a
    /// streaming sentinel. `byte_order` selects the encoding of chunk length fields: little for
    /// RIFF containers, big for IFF.
    pub fn new(len: Option<u32>, byte_order: ByteOrder) -> Self {
        ChunksReader { len: len.map(u64::from), byte_order, consumed: 0, phantom: PhantomData }
    }

    pub fn next<B: ReadBytes>(&mut self, reader: &mut B) -> Result<Option<T>> {
        // Loop until a chunk is recognized and returned, or the end of stream is reached.
        loop {
            // Check if at the end of the parent chunk.
            if let Some(len) = self.len {
                if self.consumed >= len {
                    return Ok(None);
                }
            }

            // Align to the next 2-byte boundary if not currently aligned.
            if self.consumed & 0x1 == 1 {
                reader.read_u8()?;
                self.consumed += 1;
            }

            // Check if there are enough bytes (8) to read a chunk header. If not, there are no
            // more chunks to be read.
            if let Some(len) = self.len {
                if self.consumed + 8 > len {
                    return Ok(None);
                }
            }

            // Read chunk tag and length (the chunk header).
            let tag = reader.read_quad_bytes()?;

            let chunk_len = match self.byte_order {
                ByteOrder::LittleEndian => reader.read_u32()?,
                ByteOrder::BigEndian => reader.read_be_u32()?,
            };

            self.consumed += 8;

            // Check if the reader has enough unread bytes to fully read the chunk body.
            //
            // Warning: The formulation of this conditional is critical because chunk_len is an
            // untrusted input, it may overflow if added to anything.
            if let Some(len) = self.len {
                if len - self.consumed < u64::from(chunk_len) {
                    return malformed_error("riff: chunk length exceeds parent chunk length");
                }
            }

            // The length of the chunk has been validated, so "consume" the chunk.
            self.consumed = self.consumed.saturating_add(u64::from(chunk_len));

            match T::parse_tag(tag, chunk_len) {
                Some(chunk) => return Ok(Some(chunk)),
                None => {
                    // Unknown chunks are to be ignored, along with their pad byte.
                    info!(
                        "ignoring unknown chunk: tag={}, len={}.",
                        String::from_utf8_lossy(&tag),
                        chunk_len
                    );

                    reader.ignore_bytes(u64::from(chunk_len))?
                }
            }
        }
    }
}

/// Common trait implemented for all chunks that are parsed by a `ChunkParser`.
pub trait ParseChunk: Sized {
    fn parse<B: ReadBytes>(reader: &mut B, tag: [u8; 4], len: u32) -> Result<Self>;
}

/// `ChunkParser` is a utility struct for unifying the parsing of chunks.
pub struct ChunkParser<P: ParseChunk> {
    tag: [u8; 4],
    len: u32,
    phantom: PhantomData<P>,
}

impl<P: ParseChunk> ChunkParser<P> {
    pub fn new(tag: [u8; 4], len: u32) -> Self {
        ChunkParser { tag, len, phantom: PhantomData }
    }

    pub fn parse<B: ReadBytes>(&self, reader: &mut B) -> Result<P> {
        P::parse(reader, self.tag, self.len)
    }
}

macro_rules! parser {
    ($class:expr, $result:ty, $tag:expr, $len:expr) => {
        Some($class(ChunkParser::<$result>::new($tag, $len)))
    };
}

pub(crate) use parser;

// The definition of these format identifiers can be found in mmreg.h of the Microsoft Windows
// Platform SDK.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

// These GUIDs identify the format of the data chunks. These definitions can be found in
// ksmedia.h of the Microsoft Windows Platform SDK.
#[rustfmt::skip]
pub const KSDATAFORMAT_SUBTYPE_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00,
    0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];
#[rustfmt::skip]
pub const KSDATAFORMAT_SUBTYPE_IEEE_FLOAT: [u8; 16] = [
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00,
    0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// `WaveFormatChunk` is the parsed `fmt ` chunk, shared by the WAV and Wave64 containers.
pub struct WaveFormatChunk {
    /// The number of channels.
    pub n_channels: u16,
    /// The sample rate in Hz.
    pub sample_rate: u32,
    /// The sample encoding.
    pub sample_format: SampleFormat,
    /// Channel placement mask, if the format was extensible.
    pub channel_mask: u32,
}

impl WaveFormatChunk {
    fn read_pcm_fmt<B: ReadBytes>(reader: &mut B, bits_per_sample: u16, len: u32) -> Result<SampleFormat> {
        // WaveFormat for a PCM format may be extended with an extra data length field followed by
        // the extension data itself. Use the chunk length to determine if the format chunk is
        // extended.
        match len {
            // Basic WaveFormat struct, no extension.
            16 => (),
            // WaveFormatEx with extension data length field present, but no extension data.
            18 => {
                let _extension_len = reader.read_u16()?;
            }
            _ => return malformed_error("wav: malformed fmt_pcm chunk"),
        }

        // Select the appropriate encoding using bits per sample. Samples are always interleaved
        // and little-endian encoded for the PCM format. 8-bit samples are unsigned.
        match bits_per_sample {
            8 => Ok(SampleFormat::U8),
            16 => Ok(SampleFormat::S16),
            24 => Ok(SampleFormat::S24),
            32 => Ok(SampleFormat::S32),
            _ => unsupported_error("wav: bits per sample for fmt_pcm must be 8, 16, 24 or 32 bits"),
        }
    }

    fn read_ieee_fmt<B: ReadBytes>(reader: &mut B, bits_per_sample: u16, len: u32) -> Result<SampleFormat> {
        // WaveFormat for an IEEE format should not be extended, but it may still have an extra
        // data length parameter.
        match len {
            16 => (),
            18 => {
                let extra_size = reader.read_u16()?;
                if extra_size != 0 {
                    return malformed_error("wav: extra data not expected for fmt_ieee chunk");
                }
            }
            _ => return malformed_error("wav: malformed fmt_ieee chunk"),
        }

        // Officially, only 32-bit floats are supported, but 64-bit floats do occur in the wild.
        match bits_per_sample {
            32 => Ok(SampleFormat::F32),
            64 => Ok(SampleFormat::F64),
            _ => unsupported_error("wav: bits per sample for fmt_ieee must be 32 or 64 bits"),
        }
    }

    fn read_ext_fmt<B: ReadBytes>(
        reader: &mut B,
        bits_per_coded_sample: u16,
        len: u32,
    ) -> Result<(SampleFormat, u32)> {
        // WaveFormat for the extensible format must be extended to 40 bytes in length.
        if len < 40 {
            return malformed_error("wav: malformed fmt_ext chunk");
        }

        let extra_size = reader.read_u16()?;

        // The size of the extra data for the Extensible format is exactly 22 bytes.
        if extra_size != 22 {
            return malformed_error("wav: extra data size not 22 bytes for fmt_ext chunk");
        }

        let bits_per_sample = reader.read_u16()?;

        // Bits per coded sample for extensible formats is the width per sample as stored in the
        // stream. This must be a multiple of 8.
        if (bits_per_coded_sample & 0x7) != 0 {
            return malformed_error("wav: bits per coded sample for fmt_ext must be a multiple of 8");
        }

        // Bits per sample indicates the number of valid bits in the encoded sample. The sample
        // is encoded in a bits per coded sample width value, therefore the valid number of bits
        // must be at most bits per coded sample long.
        if bits_per_sample > bits_per_coded_sample {
            return malformed_error("wav: bits per sample must be <= bits per coded sample for fmt_ext");
        }

        let channel_mask = reader.read_u32()?;

        let mut sub_format_guid = [0u8; 16];
        reader.read_buf_exact(&mut sub_format_guid)?;

        // Verify support based on the format GUID. Only the leading four bytes distinguish the
        // subtypes; the remainder must match the KS media GUID tail.
        if sub_format_guid[4..] != KSDATAFORMAT_SUBTYPE_PCM[4..] {
            return unsupported_error("wav: unsupported fmt_ext sub-type");
        }

        let sample_format = if sub_format_guid[0..4] == KSDATAFORMAT_SUBTYPE_PCM[0..4] {
            match bits_per_coded_sample {
                8 => SampleFormat::U8,
                16 => SampleFormat::S16,
                24 => SampleFormat::S24,
                32 => SampleFormat::S32,
                _ => {
                    return unsupported_error(
                        "wav: bits per sample for fmt_ext PCM sub-type must be 8, 16, 24 or 32 bits",
                    )
                }
            }
        }
        else if sub_format_guid[0..4] == KSDATAFORMAT_SUBTYPE_IEEE_FLOAT[0..4] {
            // IEEE floating formats do not support truncated sample widths.
            if bits_per_sample != bits_per_coded_sample {
                return malformed_error(
                    "wav: bits per sample for fmt_ext IEEE sub-type must equal bits per coded sample",
                );
            }

            match bits_per_coded_sample {
                32 => SampleFormat::F32,
                64 => SampleFormat::F64,
                _ => {
                    return unsupported_error(
                        "wav: bits per sample for fmt_ext IEEE sub-type must be 32 or 64 bits",
                    )
                }
            }
        }
        else {
            return unsupported_error("wav: unsupported fmt_ext sub-type");
        };

        Ok((sample_format, channel_mask))
    }
}

impl ParseChunk for WaveFormatChunk {
    fn parse<B: ReadBytes>(reader: &mut B, _tag: [u8; 4], len: u32) -> Result<WaveFormatChunk> {
        // WaveFormat has a minimal length of 16 bytes.
        if len < 16 {
            return malformed_error("wav: malformed fmt chunk");
        }

        let format = reader.read_u16()?;
        let n_channels = reader.read_u16()?;
        let sample_rate = reader.read_u32()?;
        let _avg_bytes_per_sec = reader.read_u32()?;
        let _block_align = reader.read_u16()?;
        let bits_per_sample = reader.read_u16()?;

        if n_channels < 1 {
            return malformed_error("wav: channel count must be at least 1");
        }

        let (sample_format, channel_mask) = match format {
            WAVE_FORMAT_PCM => (Self::read_pcm_fmt(reader, bits_per_sample, len)?, 0),
            WAVE_FORMAT_IEEE_FLOAT => (Self::read_ieee_fmt(reader, bits_per_sample, len)?, 0),
            WAVE_FORMAT_EXTENSIBLE => Self::read_ext_fmt(reader, bits_per_sample, len)?,
            _ => return unsupported_error("wav: unsupported wave format"),
        };

        Ok(WaveFormatChunk { n_channels, sample_rate, sample_format, channel_mask })
    }
}

impl WaveFormatChunk {
    /// The byte length of the `fmt ` chunk body a spec will be emitted with.
    pub fn emit_len(spec: &AudioSpec) -> u32 {
        if Self::is_extensible(spec) {
            40
        }
        else {
            16
        }
    }

    /// Whether a spec must be emitted as WAVE_FORMAT_EXTENSIBLE. Sample widths over 16 bits and
    /// channel counts over 2 follow the widely deployed convention of using the extensible form.
    pub fn is_extensible(spec: &AudioSpec) -> bool {
        spec.sample_format.bits_per_sample() > 16 || spec.num_channels > 2
    }

    /// Emits the `fmt ` chunk body (without the chunk header) for a spec.
    pub fn emit(sink: &mut SinkStream, spec: &AudioSpec) -> Result<()> {
        let bits = spec.sample_format.bits_per_sample() as u16;
        let frame_size = spec.frame_size() as u32;
        let avg_bytes_per_sec = (spec.sample_rate * f64::from(frame_size) + 0.5) as u32;

        let extensible = Self::is_extensible(spec);

        let format_tag = if extensible {
            WAVE_FORMAT_EXTENSIBLE
        }
        else if spec.sample_format.is_float() {
            WAVE_FORMAT_IEEE_FLOAT
        }
        else {
            WAVE_FORMAT_PCM
        };

        sink.write_u16(format_tag)?;
        sink.write_u16(spec.num_channels as u16)?;
        sink.write_u32((spec.sample_rate + 0.5) as u32)?;
        sink.write_u32(avg_bytes_per_sec)?;
        sink.write_u16(frame_size as u16)?;
        sink.write_u16(bits)?;

        if extensible {
            // cbSize, valid bits, channel mask, and the sub-format GUID.
            sink.write_u16(22)?;
            sink.write_u16(bits)?;
            sink.write_u32(spec.channel_mask)?;

            let guid = if spec.sample_format.is_float() {
                KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
            }
            else {
                KSDATAFORMAT_SUBTYPE_PCM
            };

            sink.write_buf(&guid)?;
        }

        Ok(())
    }
}
