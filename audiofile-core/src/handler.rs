// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `handler` module moves frames between the de-interleaved [`Frames`] planes and the
//! interleaved on-disk representation through a bounded, reusable byte window.
//!
//! One generic frame loop is specialized per sample codec; [`handler_for`] is the dispatch
//! table over the (sample format, byte order) pair.

use std::cmp;
use std::io;
use std::marker::PhantomData;

use crate::audio::Frames;
use crate::conv::{SampleCodec, F32BeCodec, F32LeCodec, F64BeCodec, F64LeCodec, S16BeCodec, S16LeCodec, S24BeCodec, S24LeCodec, S32BeCodec, S32LeCodec, S8Codec, U8Codec};
use crate::errors::{invalid_argument_error, Result};
use crate::sample::SampleFormat;
use crate::spec::ByteOrder;

/// Options controlling transcode buffer allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandlerOptions {
    /// The target length of the byte window in bytes. The window holds
    /// `max(1, buf_len / frame_size)` whole frames.
    pub buf_len: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        HandlerOptions { buf_len: 64 * 1024 }
    }
}

/// `BufferHandler` transcodes between interleaved sample bytes and de-interleaved planes, one
/// bounded chunk at a time. The same window serves the synchronous and asynchronous facades.
pub trait BufferHandler: Send {
    /// The number of bytes one frame occupies on disk.
    fn frame_size(&self) -> usize;

    /// The maximum number of frames the byte window holds.
    fn buf_frames(&self) -> usize;

    /// Borrows the byte window sized for `num_frames` frames, to be filled with interleaved
    /// sample data. `num_frames` must not exceed [`BufferHandler::buf_frames`].
    fn byte_buf(&mut self, num_frames: usize) -> &mut [u8];

    /// Transcodes `len` frames of interleaved bytes in the window into `frames[ch][off..off+len]`
    /// for every present channel plane. Absent planes discard their channel.
    fn decode(&mut self, frames: &mut Frames, off: usize, len: usize) -> Result<()>;

    /// Transcodes `frames[ch][off..off+len]` for every channel into interleaved bytes, returning
    /// the encoded window. All channel planes must be present.
    fn encode(&mut self, frames: &Frames, off: usize, len: usize) -> Result<&[u8]>;
}

/// A [`BufferHandler`] specialized over one sample codec.
pub struct PcmHandler<C: SampleCodec> {
    buf: Vec<u8>,
    buf_frames: usize,
    num_channels: usize,
    codec: PhantomData<C>,
}

impl<C: SampleCodec> PcmHandler<C> {
    pub fn new(num_channels: usize, opts: &HandlerOptions) -> Self {
        let frame_size = C::BYTES * num_channels;
        let buf_frames = cmp::max(1, opts.buf_len / frame_size);

        PcmHandler {
            buf: vec![0u8; buf_frames * frame_size],
            buf_frames,
            num_channels,
            codec: PhantomData,
        }
    }

    fn check_range(&self, frames: &Frames, off: usize, len: usize) -> Result<()> {
        if len > self.buf_frames {
            return invalid_argument_error("handler: chunk exceeds buffer capacity");
        }
        if frames.num_channels() < self.num_channels {
            return invalid_argument_error("handler: frame buffer has too few channels");
        }
        for ch in 0..self.num_channels {
            if let Some(plane) = frames.plane(ch) {
                if off + len > plane.len() {
                    return invalid_argument_error("handler: frame range exceeds plane length");
                }
            }
        }
        Ok(())
    }
}

impl<C: SampleCodec> BufferHandler for PcmHandler<C> {
    fn frame_size(&self) -> usize {
        C::BYTES * self.num_channels
    }

    fn buf_frames(&self) -> usize {
        self.buf_frames
    }

    fn byte_buf(&mut self, num_frames: usize) -> &mut [u8] {
        let n = cmp::min(num_frames, self.buf_frames);
        &mut self.buf[..n * C::BYTES * self.num_channels]
    }

    fn decode(&mut self, frames: &mut Frames, off: usize, len: usize) -> Result<()> {
        self.check_range(frames, off, len)?;

        for ch in 0..self.num_channels {
            let stride = C::BYTES * self.num_channels;
            let base = ch * C::BYTES;

            let Some(plane) = frames.plane_mut(ch) else { continue };

            for (i, s) in plane[off..off + len].iter_mut().enumerate() {
                let at = base + i * stride;
                *s = C::decode(&self.buf[at..at + C::BYTES]);
            }
        }

        Ok(())
    }

    fn encode(&mut self, frames: &Frames, off: usize, len: usize) -> Result<&[u8]> {
        self.check_range(frames, off, len)?;

        let stride = C::BYTES * self.num_channels;

        for ch in 0..self.num_channels {
            let Some(plane) = frames.plane(ch) else {
                return invalid_argument_error("handler: channel plane absent on write");
            };

            let base = ch * C::BYTES;

            for (i, &s) in plane[off..off + len].iter().enumerate() {
                let at = base + i * stride;
                C::encode(s, &mut self.buf[at..at + C::BYTES]);
            }
        }

        Ok(&self.buf[..len * stride])
    }
}

/// Builds the buffer handler for an on-disk sample encoding.
pub fn handler_for(
    format: SampleFormat,
    byte_order: ByteOrder,
    num_channels: usize,
    opts: &HandlerOptions,
) -> Box<dyn BufferHandler> {
    use ByteOrder::{BigEndian, LittleEndian};

    match (format, byte_order) {
        (SampleFormat::U8, _) => Box::new(PcmHandler::<U8Codec>::new(num_channels, opts)),
        (SampleFormat::S8, _) => Box::new(PcmHandler::<S8Codec>::new(num_channels, opts)),
        (SampleFormat::S16, LittleEndian) => Box::new(PcmHandler::<S16LeCodec>::new(num_channels, opts)),
        (SampleFormat::S16, BigEndian) => Box::new(PcmHandler::<S16BeCodec>::new(num_channels, opts)),
        (SampleFormat::S24, LittleEndian) => Box::new(PcmHandler::<S24LeCodec>::new(num_channels, opts)),
        (SampleFormat::S24, BigEndian) => Box::new(PcmHandler::<S24BeCodec>::new(num_channels, opts)),
        (SampleFormat::S32, LittleEndian) => Box::new(PcmHandler::<S32LeCodec>::new(num_channels, opts)),
        (SampleFormat::S32, BigEndian) => Box::new(PcmHandler::<S32BeCodec>::new(num_channels, opts)),
        (SampleFormat::F32, LittleEndian) => Box::new(PcmHandler::<F32LeCodec>::new(num_channels, opts)),
        (SampleFormat::F32, BigEndian) => Box::new(PcmHandler::<F32BeCodec>::new(num_channels, opts)),
        (SampleFormat::F64, LittleEndian) => Box::new(PcmHandler::<F64LeCodec>::new(num_channels, opts)),
        (SampleFormat::F64, BigEndian) => Box::new(PcmHandler::<F64BeCodec>::new(num_channels, opts)),
    }
}

/// Reads `len` frames from `src` into `frames[ch][off..off+len]`, chunking through the
/// handler's byte window. Fails with `EndOfFile` if the source yields fewer bytes.
pub fn read_frames(
    handler: &mut dyn BufferHandler,
    src: &mut dyn io::Read,
    frames: &mut Frames,
    off: usize,
    len: usize,
) -> Result<()> {
    let mut done = 0;

    while done < len {
        let n = cmp::min(len - done, handler.buf_frames());

        src.read_exact(handler.byte_buf(n)).map_err(crate::errors::Error::from)?;
        handler.decode(frames, off + done, n)?;

        done += n;
    }

    Ok(())
}

/// Writes `len` frames from `frames[ch][off..off+len]` to `dst`, chunking through the
/// handler's byte window.
pub fn write_frames(
    handler: &mut dyn BufferHandler,
    dst: &mut dyn io::Write,
    frames: &Frames,
    off: usize,
    len: usize,
) -> Result<()> {
    let mut done = 0;

    while done < len {
        let n = cmp::min(len - done, handler.buf_frames());

        let bytes = handler.encode(frames, off + done, n)?;
        dst.write_all(bytes).map_err(crate::errors::Error::from)?;

        done += n;
    }

    Ok(())
}
