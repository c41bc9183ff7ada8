// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;
use std::io::{Seek, SeekFrom, Write};
use std::mem;
use std::path::Path;

use audiofile_core::audio::Frames;
use audiofile_core::errors::{
    end_of_file_error, invalid_argument_error, unsupported_error, unsupported_op_error, Error,
    Result,
};
use audiofile_core::format::WriteHeader;
use audiofile_core::handler::{self, BufferHandler, HandlerOptions};
use audiofile_core::io::{MediaSink, MediaSource, SinkStream, SourceStream};
use audiofile_core::spec::{AudioSpec, FileType};
use audiofile_format_snd::raw;

use log::debug;

use crate::default_registry;

/// The default frame capacity of an application buffer.
const DEFAULT_BUF_FRAMES: usize = 8192;

/// The scratch size used by [`AudioFile::copy_to`].
const COPY_BUF_FRAMES: u64 = 8192;

/// A Wave payload too long for a 32-bit RIFF length field must be written as Wave64. Leave
/// headroom for the header itself.
const WAVE64_PROMOTION_LIMIT: u64 = u32::MAX as u64 - 256;

struct Reader {
    stream: SourceStream,
    spec: AudioSpec,
    sample_data_offset: u64,
    handler: Box<dyn BufferHandler>,
    position: u64,
}

struct Writer {
    sink: SinkStream,
    header: WriteHeader,
    handler: Box<dyn BufferHandler>,
    position: u64,
    num_frames: u64,
}

enum State {
    Reading(Reader),
    Writing(Writer),
    Closed,
}

/// `AudioFile` is the synchronous facade over one audio file: it owns the backing store, the
/// parsed or emitted header, and a sample transcoding buffer, and exposes frame-granular
/// `read`/`write`/`seek` with header back-patching on `flush`/`close`.
///
/// An `AudioFile` is not safe for concurrent use; distinct files may be driven from distinct
/// threads in parallel.
pub struct AudioFile {
    state: State,
    spec: AudioSpec,
}

impl AudioFile {
    /// Probes the source for a registered format, parses its header, and opens the file for
    /// reading at frame position 0.
    pub fn open_read(source: impl MediaSource + 'static) -> Result<AudioFile> {
        let mut stream = SourceStream::new(Box::new(source));

        let registry = default_registry();

        let Some(file_type) = registry.identify(&mut stream)? else {
            return Err(Error::Unrecognized);
        };

        let descriptor = registry.descriptor(file_type).ok_or(Error::Unrecognized)?;
        let Some(read) = descriptor.read else {
            return unsupported_error("file: format cannot be read");
        };

        let header = read(&mut stream)?;

        debug!("opened {} for reading: {} frames", descriptor.info.short_name, header.spec.num_frames);

        Self::make_reader(stream, header.spec, header.sample_data_offset)
    }

    /// Opens a headerless source for reading with a caller-supplied description.
    pub fn open_read_raw(source: impl MediaSource + 'static, spec: &AudioSpec) -> Result<AudioFile> {
        let stream = SourceStream::new(Box::new(source));
        let header = raw::read_header(spec, stream.byte_len())?;

        Self::make_reader(stream, header.spec, header.sample_data_offset)
    }

    /// Opens the file at the given path for reading.
    pub fn open_read_path(path: impl AsRef<Path>) -> Result<AudioFile> {
        Self::open_read(std::fs::File::open(path)?)
    }

    fn make_reader(stream: SourceStream, spec: AudioSpec, sample_data_offset: u64) -> Result<AudioFile> {
        let handler = handler::handler_for(
            spec.sample_format,
            spec.effective_byte_order(),
            spec.num_channels as usize,
            &HandlerOptions::default(),
        );

        Ok(AudioFile {
            state: State::Reading(Reader { stream, spec, sample_data_offset, handler, position: 0 }),
            spec,
        })
    }

    /// Emits an initial header for the spec and opens the sink for writing at frame position 0.
    ///
    /// The spec's frame count seeds the header's length fields: pass the final count when it is
    /// known up front (mandatory for unseekable sinks, whose headers can never be patched), or
    /// leave it 0 and let `flush`/`close` patch the header.
    pub fn open_write(sink: impl MediaSink + 'static, spec: &AudioSpec) -> Result<AudioFile> {
        spec.validate()?;

        let mut spec = *spec;

        // A payload beyond the reach of 32-bit RIFF length fields promotes Wave to Wave64.
        if spec.file_type == FileType::Wave
            && spec.num_frames * spec.frame_size() as u64 > WAVE64_PROMOTION_LIMIT
        {
            debug!("payload exceeds the riff length field, promoting to wave64");
            spec.file_type = FileType::Wave64;
        }

        let mut sink = SinkStream::new(Box::new(sink));

        let header = if spec.file_type == FileType::Raw {
            raw::write_header(&spec)?
        }
        else {
            let descriptor = default_registry()
                .descriptor(spec.file_type)
                .ok_or(Error::Unsupported("file: format is not registered"))?;

            let Some(write) = descriptor.write else {
                return unsupported_error("file: format cannot be written");
            };

            write(&mut sink, &spec)?
        };

        let handler = handler::handler_for(
            header.spec.sample_format,
            header.spec.effective_byte_order(),
            header.spec.num_channels as usize,
            &HandlerOptions::default(),
        );

        let num_frames = header.spec.num_frames;
        let spec = header.spec;

        Ok(AudioFile {
            state: State::Writing(Writer { sink, header, handler, position: 0, num_frames }),
            spec,
        })
    }

    /// Creates the file at the given path and opens it for writing.
    pub fn open_write_path(path: impl AsRef<Path>, spec: &AudioSpec) -> Result<AudioFile> {
        Self::open_write(std::fs::File::create(path)?, spec)
    }

    /// Probes a source against the registered formats without consuming it, returning the
    /// identified file type or `None`.
    pub fn identify(source: impl MediaSource + 'static) -> Result<Option<FileType>> {
        let mut stream = SourceStream::new(Box::new(source));
        default_registry().identify(&mut stream)
    }

    /// Parses a source's header and returns its description without opening a file.
    pub fn read_spec(source: impl MediaSource + 'static) -> Result<AudioSpec> {
        let mut stream = SourceStream::new(Box::new(source));

        let registry = default_registry();

        let Some(file_type) = registry.identify(&mut stream)? else {
            return Err(Error::Unrecognized);
        };

        let read = registry
            .descriptor(file_type)
            .and_then(|d| d.read)
            .ok_or(Error::Unsupported("file: format cannot be read"))?;

        Ok(read(&mut stream)?.spec)
    }

    /// Allocates a de-interleaved frame buffer with the default per-channel capacity.
    pub fn buffer(num_channels: usize) -> Frames {
        Frames::new(num_channels, DEFAULT_BUF_FRAMES)
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

    /// Reads `len` frames into `frames[ch][off .. off + len]` for every present channel plane
    /// and advances the position. Fails with `EndOfFile` when fewer frames remain.
    pub fn read(&mut self, frames: &mut Frames, off: usize, len: usize) -> Result<()> {
        let State::Reading(reader) = &mut self.state else {
            return unsupported_op_error("file: not open for reading");
        };

        // A known frame count bounds every read. An unknown count (0 on an unbounded stream)
        // leaves truncation to the backing store.
        if reader.spec.num_frames > 0
            && reader.position + len as u64 > reader.spec.num_frames
        {
            return end_of_file_error();
        }

        handler::read_frames(reader.handler.as_mut(), &mut reader.stream, frames, off, len)?;
        reader.position += len as u64;

        Ok(())
    }

    /// Writes `len` frames from `frames[ch][off .. off + len]`, advancing the position and
    /// growing the frame count. Every channel plane must be present.
    pub fn write(&mut self, frames: &Frames, off: usize, len: usize) -> Result<()> {
        let State::Writing(writer) = &mut self.state else {
            return unsupported_op_error("file: not open for writing");
        };

        handler::write_frames(writer.handler.as_mut(), &mut writer.sink, frames, off, len)?;

        writer.position += len as u64;
        writer.num_frames = cmp::max(writer.num_frames, writer.position);
        self.spec.num_frames = writer.num_frames;

        Ok(())
    }

    /// Seeks to an absolute frame position. Fails with `UnsupportedOperation` on stream-backed
    /// files.
    pub fn seek(&mut self, frame: u64) -> Result<()> {
        match &mut self.state {
            State::Reading(reader) => {
                if !reader.stream.is_seekable() {
                    return unsupported_op_error("file: source does not support seeking");
                }

                if reader.spec.num_frames > 0 && frame > reader.spec.num_frames {
                    return invalid_argument_error("file: seek beyond end of file");
                }

                let offset =
                    reader.sample_data_offset + frame * reader.spec.frame_size() as u64;
                reader.stream.seek(offset)?;
                reader.position = frame;

                Ok(())
            }
            State::Writing(writer) => {
                if !writer.sink.is_seekable() {
                    return unsupported_op_error("file: sink does not support seeking");
                }

                if frame > writer.num_frames {
                    return invalid_argument_error("file: seek beyond end of file");
                }

                let offset = writer.header.sample_data_offset
                    + frame * writer.header.spec.frame_size() as u64;
                writer.sink.seek(SeekFrom::Start(offset))?;
                writer.position = frame;

                Ok(())
            }
            State::Closed => unsupported_op_error("file: closed"),
        }
    }

    /// Patches the header's length fields with the current frame count.
    ///
    /// Fails with `UnsupportedOperation` on readers and on stream-backed writers, whose headers
    /// were emitted with a pre-known length or a sentinel and can no longer be patched.
    /// Succeeds trivially for formats without length fields.
    pub fn flush(&mut self) -> Result<()> {
        let State::Writing(writer) = &mut self.state else {
            return unsupported_op_error("file: not open for writing");
        };

        if !writer.header.is_patchable() {
            return Ok(());
        }

        if !writer.sink.is_seekable() {
            return unsupported_op_error("file: sink does not support header updates");
        }

        writer.header.update(&mut writer.sink, writer.num_frames)
    }

    /// Closes the file. Writers are flushed and padded to their container alignment first.
    ///
    /// The file transitions to the closed state even when flushing or releasing fails; the
    /// error is still surfaced. A second close is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Reading(_) => Ok(()),
            State::Writing(mut writer) => Self::finalize(&mut writer),
            State::Closed => Ok(()),
        }
    }

    /// Closes the file, swallowing any error. Use when cleaning up after a failed operation.
    pub fn clean_up(&mut self) {
        let _ = self.close();
    }

    fn finalize(writer: &mut Writer) -> Result<()> {
        let frame_size = writer.header.spec.frame_size() as u64;
        let payload = writer.num_frames * frame_size;

        // Pad the payload to the container's chunk alignment.
        let pad = writer.header.padding(payload);

        if pad > 0 {
            if writer.sink.is_seekable() {
                let end = writer.header.sample_data_offset + payload;
                writer.sink.seek(SeekFrom::Start(end))?;
            }
            writer.sink.write_all(&[0u8; 8][..pad as usize])?;
        }

        if writer.header.is_patchable() && writer.sink.is_seekable() {
            writer.header.update(&mut writer.sink, writer.num_frames)?;
        }

        writer.sink.flush()?;

        Ok(())
    }

    /// Copies `n` frames from the current position to the target writer through a bounded
    /// scratch buffer.
    pub fn copy_to(&mut self, target: &mut AudioFile, n: u64) -> Result<()> {
        let num_channels = self.spec().num_channels as usize;

        let buf_frames = cmp::min(n, COPY_BUF_FRAMES);
        let mut scratch = Frames::new(num_channels, buf_frames as usize);

        let mut remaining = n;

        while remaining > 0 {
            let k = cmp::min(remaining, buf_frames) as usize;

            self.read(&mut scratch, 0, k)?;
            target.write(&scratch, 0, k)?;

            remaining -= k as u64;
        }

        Ok(())
    }
}

impl Drop for AudioFile {
    fn drop(&mut self) {
        // Release-on-drop is best effort; close() explicitly to observe errors.
        self.clean_up();
    }
}
