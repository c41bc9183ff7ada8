// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The asynchronous facade. Every operation of [`AudioFile`](crate::AudioFile) is mirrored with
//! a suspension point at each channel access. Exclusive receivers serialize operations per
//! facade; the length watermark of a writer is guarded separately so a header update detects a
//! frame count racing underneath it.

use std::cmp;
use std::io;
use std::mem;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use audiofile_core::audio::Frames;
use audiofile_core::errors::{
    end_of_file_error, invalid_argument_error, unsupported_op_error, Error, Result,
};
use audiofile_core::format::{FieldWidth, WriteHeader};
use audiofile_core::handler::{self, BufferHandler, HandlerOptions};
use audiofile_core::io::{MediaSource, SharedSink, SinkStream, SourceStream};
use audiofile_core::spec::{AudioSpec, ByteOrder, FileType};
use audiofile_format_snd::raw;

use log::debug;

use crate::default_registry;

/// `AsyncChannel` is the byte channel abstraction the asynchronous facade runs on: positioned,
/// non-blocking reads and writes. `tokio::fs::File` and in-memory cursors satisfy it.
pub trait AsyncChannel: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send> AsyncChannel for T {}

/// The initial header prefix fetched before parsing; doubled until the header fits.
const INITIAL_PREFIX_LEN: u64 = 1024;

/// The frame-count watermark of an asynchronous writer. Writes advance the count and bump the
/// generation; a header update snapshots both and fails when the generation moved underneath
/// the in-flight patch.
struct Watermark {
    num_frames: u64,
    generation: u64,
}

struct AsyncReader {
    channel: Box<dyn AsyncChannel>,
    spec: AudioSpec,
    sample_data_offset: u64,
    handler: Box<dyn BufferHandler>,
    position: u64,
    seekable: bool,
}

struct AsyncWriter {
    channel: Box<dyn AsyncChannel>,
    header: WriteHeader,
    handler: Box<dyn BufferHandler>,
    position: u64,
    watermark: Arc<Mutex<Watermark>>,
    /// The frame count most recently patched into the header.
    patched: u64,
    seekable: bool,
}

enum State {
    Reading(AsyncReader),
    Writing(AsyncWriter),
    Closed,
}

/// `AsyncAudioFile` is the asynchronous counterpart of [`AudioFile`](crate::AudioFile), with the
/// same contract over a non-blocking byte channel.
pub struct AsyncAudioFile {
    state: State,
    spec: AudioSpec,
}

/// `PrefixSource` serves the buffered header prefix of a channel as a [`MediaSource`], while
/// reporting the channel's full byte length so frame counts derive correctly.
struct PrefixSource {
    cursor: io::Cursor<Vec<u8>>,
    byte_len: Option<u64>,
}

impl io::Read for PrefixSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.cursor, buf)
    }
}

impl io::Seek for PrefixSource {
    fn seek(&mut self, from: io::SeekFrom) -> io::Result<u64> {
        io::Seek::seek(&mut self.cursor, from)
    }
}

impl MediaSource for PrefixSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }
}

impl AsyncAudioFile {
    /// Probes the channel for a registered format, parses its header, and opens the file for
    /// reading at frame position 0.
    pub async fn open_read(mut channel: Box<dyn AsyncChannel>) -> Result<AsyncAudioFile> {
        // Determine the channel length up front; it bounds the header prefix and supplies the
        // physical payload length to the header codecs.
        let byte_len = channel.seek(io::SeekFrom::End(0)).await.ok();
        channel.seek(io::SeekFrom::Start(0)).await?;

        let seekable = byte_len.is_some();

        // Fetch a growing prefix of the channel until the whole header parses. Each pass
        // re-parses from the start; headers are small, so the loop converges in one or two
        // fetches.
        let mut prefix: Vec<u8> = Vec::new();
        let mut target = cmp::min(INITIAL_PREFIX_LEN, byte_len.unwrap_or(INITIAL_PREFIX_LEN));

        let header = loop {
            let more = (target as usize).saturating_sub(prefix.len());
            if more > 0 {
                let start = prefix.len();
                prefix.resize(target as usize, 0);
                let n = read_fully(&mut channel, &mut prefix[start..]).await?;
                prefix.truncate(start + n);
            }

            let exhausted = byte_len.map(|len| prefix.len() as u64 >= len).unwrap_or(false)
                || (prefix.len() as u64) < target;

            let source = PrefixSource { cursor: io::Cursor::new(prefix.clone()), byte_len };
            let mut stream = SourceStream::new(Box::new(source));

            let registry = default_registry();

            let parsed = match registry.identify(&mut stream)? {
                Some(file_type) => {
                    let read = registry
                        .descriptor(file_type)
                        .and_then(|d| d.read)
                        .ok_or(Error::Unsupported("file: format cannot be read"))?;
                    read(&mut stream)
                }
                None if exhausted => return Err(Error::Unrecognized),
                None => Err(Error::EndOfFile),
            };

            match parsed {
                Ok(header) => break header,
                Err(Error::EndOfFile) if !exhausted => {
                    target = target.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        };

        // Position the channel at the first sample.
        channel.seek(io::SeekFrom::Start(header.sample_data_offset)).await?;

        debug!("opened async reader: {} frames", header.spec.num_frames);

        Self::make_reader(channel, header.spec, header.sample_data_offset, seekable)
    }

    /// Opens the file at the given path for asynchronous reading.
    pub async fn open_read_path(path: impl AsRef<Path>) -> Result<AsyncAudioFile> {
        let file = tokio::fs::File::open(path).await?;
        Self::open_read(Box::new(file)).await
    }

    /// Opens a headerless channel for reading with a caller-supplied description.
    pub async fn open_read_raw(
        mut channel: Box<dyn AsyncChannel>,
        spec: &AudioSpec,
    ) -> Result<AsyncAudioFile> {
        let byte_len = channel.seek(io::SeekFrom::End(0)).await.ok();
        channel.seek(io::SeekFrom::Start(0)).await?;

        let header = raw::read_header(spec, byte_len)?;

        Self::make_reader(channel, header.spec, 0, byte_len.is_some())
    }

    fn make_reader(
        channel: Box<dyn AsyncChannel>,
        spec: AudioSpec,
        sample_data_offset: u64,
        seekable: bool,
    ) -> Result<AsyncAudioFile> {
        let handler = handler::handler_for(
            spec.sample_format,
            spec.effective_byte_order(),
            spec.num_channels as usize,
            &HandlerOptions::default(),
        );

        Ok(AsyncAudioFile {
            state: State::Reading(AsyncReader {
                channel,
                spec,
                sample_data_offset,
                handler,
                position: 0,
                seekable,
            }),
            spec,
        })
    }

    /// Emits an initial header for the spec and opens the channel for writing at frame
    /// position 0.
    pub async fn open_write(
        mut channel: Box<dyn AsyncChannel>,
        spec: &AudioSpec,
    ) -> Result<AsyncAudioFile> {
        spec.validate()?;

        let mut spec = *spec;

        if spec.file_type == FileType::Wave
            && spec.num_frames * spec.frame_size() as u64 > u32::MAX as u64 - 256
        {
            spec.file_type = FileType::Wave64;
        }

        // Stage the header in memory with the synchronous codec, then flush it down the channel
        // in one write.
        let staged = SharedSink::new();
        let mut sink = SinkStream::new(Box::new(staged.clone()));

        let header = if spec.file_type == FileType::Raw {
            raw::write_header(&spec)?
        }
        else {
            let descriptor = default_registry()
                .descriptor(spec.file_type)
                .ok_or(Error::Unsupported("file: format is not registered"))?;

            let write = descriptor
                .write
                .ok_or(Error::Unsupported("file: format cannot be written"))?;

            write(&mut sink, &spec)?
        };

        channel.write_all(&staged.to_vec()).await?;

        let handler = handler::handler_for(
            header.spec.sample_format,
            header.spec.effective_byte_order(),
            header.spec.num_channels as usize,
            &HandlerOptions::default(),
        );

        let num_frames = header.spec.num_frames;
        let spec = header.spec;

        Ok(AsyncAudioFile {
            state: State::Writing(AsyncWriter {
                channel,
                header,
                handler,
                position: 0,
                watermark: Arc::new(Mutex::new(Watermark { num_frames, generation: 0 })),
                patched: num_frames,
                seekable: true,
            }),
            spec,
        })
    }

    /// Creates the file at the given path and opens it for asynchronous writing.
    pub async fn open_write_path(path: impl AsRef<Path>, spec: &AudioSpec) -> Result<AsyncAudioFile> {
        let file = tokio::fs::File::create(path).await?;
        Self::open_write(Box::new(file), spec).await
    }

    /// The file description. The frame count of a writer's spec grows as frames are written.
    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// The total number of sample frames.
    pub fn num_frames(&self) -> u64 {
        self.spec.num_frames
    }

    /// The current frame position.
    pub fn position(&self) -> u64 {
        match &self.state {
            State::Reading(reader) => reader.position,
            State::Writing(writer) => writer.position,
            State::Closed => 0,
        }
    }

    /// The byte offset at which interleaved sample data begins.
    pub fn sample_data_offset(&self) -> u64 {
        match &self.state {
            State::Reading(reader) => reader.sample_data_offset,
            State::Writing(writer) => writer.header.sample_data_offset,
            State::Closed => 0,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    pub fn is_readable(&self) -> bool {
        matches!(self.state, State::Reading(_))
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.state, State::Writing(_))
    }

    /// Reads `len` frames into `frames[ch][off .. off + len]` for every present channel plane.
    pub async fn read(&mut self, frames: &mut Frames, off: usize, len: usize) -> Result<()> {
        let State::Reading(reader) = &mut self.state else {
            return unsupported_op_error("file: not open for reading");
        };

        if reader.spec.num_frames > 0 && reader.position + len as u64 > reader.spec.num_frames {
            return end_of_file_error();
        }

        let mut done = 0;

        while done < len {
            let n = cmp::min(len - done, reader.handler.buf_frames());

            let buf = reader.handler.byte_buf(n);
            reader.channel.read_exact(buf).await.map_err(Error::from)?;
            reader.handler.decode(frames, off + done, n)?;

            done += n;
        }

        reader.position += len as u64;

        Ok(())
    }

    /// Writes `len` frames from `frames[ch][off .. off + len]`, advancing the frame-count
    /// watermark.
    pub async fn write(&mut self, frames: &Frames, off: usize, len: usize) -> Result<()> {
        let State::Writing(writer) = &mut self.state else {
            return unsupported_op_error("file: not open for writing");
        };

        let mut done = 0;

        while done < len {
            let n = cmp::min(len - done, writer.handler.buf_frames());

            let bytes = writer.handler.encode(frames, off + done, n)?;
            writer.channel.write_all(bytes).await.map_err(Error::from)?;

            done += n;
        }

        writer.position += len as u64;

        let num_frames = {
            let mut watermark = writer.watermark.lock().unwrap();
            watermark.num_frames = cmp::max(watermark.num_frames, writer.position);
            watermark.generation += 1;
            watermark.num_frames
        };

        self.spec.num_frames = num_frames;

        Ok(())
    }

    /// Seeks to an absolute frame position.
    pub async fn seek(&mut self, frame: u64) -> Result<()> {
        match &mut self.state {
            State::Reading(reader) => {
                if !reader.seekable {
                    return unsupported_op_error("file: channel does not support seeking");
                }

                if reader.spec.num_frames > 0 && frame > reader.spec.num_frames {
                    return invalid_argument_error("file: seek beyond end of file");
                }

                let offset = reader.sample_data_offset + frame * reader.spec.frame_size() as u64;
                reader.channel.seek(io::SeekFrom::Start(offset)).await?;
                reader.position = frame;

                Ok(())
            }
            State::Writing(writer) => {
                if !writer.seekable {
                    return unsupported_op_error("file: channel does not support seeking");
                }

                if frame > writer.watermark.lock().unwrap().num_frames {
                    return invalid_argument_error("file: seek beyond end of file");
                }

                let offset = writer.header.sample_data_offset
                    + frame * writer.header.spec.frame_size() as u64;
                writer.channel.seek(io::SeekFrom::Start(offset)).await?;
                writer.position = frame;

                Ok(())
            }
            State::Closed => unsupported_op_error("file: closed"),
        }
    }

    /// Patches the header's length fields with the current frame-count watermark.
    ///
    /// The update snapshots the watermark, patches each field at its absolute offset, restores
    /// the channel position, and then verifies the watermark did not move while the patch was
    /// in flight, failing with `ConcurrentModification` if it did.
    pub async fn flush(&mut self) -> Result<()> {
        let State::Writing(writer) = &mut self.state else {
            return unsupported_op_error("file: not open for writing");
        };

        let (num_frames, generation) = snapshot(writer);

        // Nothing changed since the last patch.
        if num_frames == writer.patched || !writer.header.is_patchable() {
            return Ok(());
        }

        patch_and_commit(writer, num_frames, generation).await
    }

    /// Closes the file. Writers complete the update chain first.
    pub async fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Reading(_) => Ok(()),
            State::Writing(mut writer) => {
                let result = finalize(&mut writer).await;
                let shutdown = writer.channel.shutdown().await.map_err(Error::from);
                result.and(shutdown)
            }
            State::Closed => Ok(()),
        }
    }

    /// Closes the file, swallowing any error.
    pub async fn clean_up(&mut self) {
        let _ = self.close().await;
    }
}

async fn read_fully(channel: &mut Box<dyn AsyncChannel>, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        let n = channel.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    Ok(filled)
}

fn snapshot(writer: &AsyncWriter) -> (u64, u64) {
    let watermark = writer.watermark.lock().unwrap();
    (watermark.num_frames, watermark.generation)
}

/// Patches every length field for the snapshotted frame count, then re-checks the watermark
/// generation; a mismatch means a write advanced the count while the patch was in flight.
async fn patch_and_commit(writer: &mut AsyncWriter, num_frames: u64, generation: u64) -> Result<()> {
    let saved = writer.channel.stream_position().await?;

    for field in writer.header.fields() {
        let value = (field.value)(num_frames);

        debug!("patching length field at offset {} to {}", field.offset, value);

        writer.channel.seek(io::SeekFrom::Start(field.offset)).await?;

        let bytes = match (field.width, field.byte_order) {
            (FieldWidth::U32, ByteOrder::LittleEndian) => (value as u32).to_le_bytes().to_vec(),
            (FieldWidth::U32, ByteOrder::BigEndian) => (value as u32).to_be_bytes().to_vec(),
            (FieldWidth::U64, ByteOrder::LittleEndian) => value.to_le_bytes().to_vec(),
            (FieldWidth::U64, ByteOrder::BigEndian) => value.to_be_bytes().to_vec(),
        };

        writer.channel.write_all(&bytes).await?;
    }

    writer.channel.seek(io::SeekFrom::Start(saved)).await?;

    {
        let watermark = writer.watermark.lock().unwrap();
        if watermark.generation != generation {
            return Err(Error::ConcurrentModification);
        }
    }

    writer.patched = num_frames;

    Ok(())
}

async fn finalize(writer: &mut AsyncWriter) -> Result<()> {
    let (num_frames, generation) = snapshot(writer);

    let frame_size = writer.header.spec.frame_size() as u64;
    let payload = num_frames * frame_size;

    let pad = writer.header.padding(payload);

    if pad > 0 {
        let end = writer.header.sample_data_offset + payload;
        writer.channel.seek(io::SeekFrom::Start(end)).await?;
        writer.channel.write_all(&[0u8; 8][..pad as usize]).await?;
    }

    if writer.header.is_patchable() && num_frames != writer.patched {
        patch_and_commit(writer, num_frames, generation).await?;
    }

    writer.channel.flush().await?;

    Ok(())
}
