// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements composable byte-level I/O over audio file backing stores.
//!
//! [`MediaSource`] and [`MediaSink`] abstract the backing store for the read and write
//! directions respectively. [`SourceStream`] wraps a source in a buffered reader implementing
//! [`ReadBytes`]; [`SinkStream`] wraps a sink in a position-tracking writer. [`WriteBytes`] is
//! implemented for all `std::io::Write` types.

use std::io;
use std::mem;

use crate::errors::Result;

mod sink_stream;
mod source_stream;

pub use sink_stream::SinkStream;
pub use source_stream::SourceStream;

/// `MediaSource` is a composite trait of [`std::io::Read`] and [`std::io::Seek`]. A source *must*
/// implement this trait to be used by [`SourceStream`].
///
/// Despite requiring the [`std::io::Seek`] trait, seeking is an optional capability that can be
/// queried at runtime.
pub trait MediaSource: io::Read + io::Seek + Send {
    /// Returns if the source is seekable. This may be an expensive operation.
    fn is_seekable(&self) -> bool;

    /// Returns the length in bytes, if available. This may be an expensive operation.
    fn byte_len(&self) -> Option<u64>;
}

impl MediaSource for std::fs::File {
    /// Returns if the `std::fs::File` backing the `MediaSource` is seekable.
    ///
    /// Note: This operation involves querying the underlying file descriptor for information and
    /// may be moderately expensive. Therefore it is recommended to cache this value if used often.
    fn is_seekable(&self) -> bool {
        // If the file's metadata is available, and the file is a regular file (i.e., not a FIFO,
        // etc.), then the MediaSource will be seekable. Otherwise assume it is not. Note that
        // metadata() follows symlinks.
        match self.metadata() {
            Ok(metadata) => metadata.is_file(),
            _ => false,
        }
    }

    /// Returns the length in bytes of the `std::fs::File` backing the `MediaSource`.
    fn byte_len(&self) -> Option<u64> {
        match self.metadata() {
            Ok(metadata) => Some(metadata.len()),
            _ => None,
        }
    }
}

impl<T: AsRef<[u8]> + Send> MediaSource for io::Cursor<T> {
    /// Always returns true since a `io::Cursor<u8>` is always seekable.
    fn is_seekable(&self) -> bool {
        true
    }

    /// Returns the length in bytes of the `io::Cursor<u8>` backing the `MediaSource`.
    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().as_ref().len() as u64)
    }
}

/// `ReadOnlySource` wraps any source implementing [`std::io::Read`] in an unseekable
/// [`MediaSource`].
pub struct ReadOnlySource<R: io::Read> {
    inner: R,
}

impl<R: io::Read + Send> ReadOnlySource<R> {
    /// Instantiates a new `ReadOnlySource<R>` by taking ownership and wrapping the provided
    /// `Read`er.
    pub fn new(inner: R) -> Self {
        ReadOnlySource { inner }
    }

    /// Unwraps this `ReadOnlySource<R>`, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read + Send> MediaSource for ReadOnlySource<R> {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

impl<R: io::Read> io::Read for ReadOnlySource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: io::Read> io::Seek for ReadOnlySource<R> {
    fn seek(&mut self, _: io::SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "source does not support seeking"))
    }
}

/// `MediaSink` is the write-direction mirror of [`MediaSource`]: a composite of
/// [`std::io::Write`] and [`std::io::Seek`] with a runtime-queryable seek capability.
pub trait MediaSink: io::Write + io::Seek + Send {
    /// Returns if the sink is seekable.
    fn is_seekable(&self) -> bool;
}

impl MediaSink for std::fs::File {
    fn is_seekable(&self) -> bool {
        match self.metadata() {
            Ok(metadata) => metadata.is_file(),
            _ => false,
        }
    }
}

impl MediaSink for io::Cursor<Vec<u8>> {
    fn is_seekable(&self) -> bool {
        true
    }
}

/// `WriteOnlySink` wraps any sink implementing [`std::io::Write`] in an unseekable
/// [`MediaSink`], for one-shot streams whose headers can never be patched.
pub struct WriteOnlySink<W: io::Write> {
    inner: W,
}

impl<W: io::Write + Send> WriteOnlySink<W> {
    /// Instantiates a new `WriteOnlySink<W>` by taking ownership and wrapping the provided
    /// `Write`r.
    pub fn new(inner: W) -> Self {
        WriteOnlySink { inner }
    }

    /// Unwraps this `WriteOnlySink<W>`, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write + Send> MediaSink for WriteOnlySink<W> {
    fn is_seekable(&self) -> bool {
        false
    }
}

impl<W: io::Write> io::Write for WriteOnlySink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: io::Write> io::Seek for WriteOnlySink<W> {
    fn seek(&mut self, _: io::SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "sink does not support seeking"))
    }
}

/// `SharedSink` is a cloneable in-memory [`MediaSink`] backed by a shared byte vector.
///
/// Clones write to the same buffer, letting a caller retrieve the bytes written through an
/// owned, boxed sink. The asynchronous facade stages header emission through one; tests use it
/// to inspect writer output.
#[derive(Clone, Default)]
pub struct SharedSink {
    inner: std::sync::Arc<std::sync::Mutex<io::Cursor<Vec<u8>>>>,
}

impl SharedSink {
    pub fn new() -> Self {
        Default::default()
    }

    /// Copies out the bytes written so far.
    pub fn to_vec(&self) -> Vec<u8> {
        self.inner.lock().unwrap().get_ref().clone()
    }
}

impl io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut *self.inner.lock().unwrap(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for SharedSink {
    fn seek(&mut self, from: io::SeekFrom) -> io::Result<u64> {
        io::Seek::seek(&mut *self.inner.lock().unwrap(), from)
    }
}

impl MediaSink for SharedSink {
    fn is_seekable(&self) -> bool {
        true
    }
}

/// `ReadBytes` provides methods to read bytes and interpret them as little- or big-endian
/// unsigned integers, signed integers, or floating-point values of standard widths.
pub trait ReadBytes {
    /// Reads a single byte from the stream and returns it or an error.
    fn read_byte(&mut self) -> Result<u8>;

    /// Reads two bytes from the stream and returns them in read-order or an error.
    fn read_double_bytes(&mut self) -> Result<[u8; 2]>;

    /// Reads three bytes from the stream and returns them in read-order or an error.
    fn read_triple_bytes(&mut self) -> Result<[u8; 3]>;

    /// Reads four bytes from the stream and returns them in read-order or an error.
    fn read_quad_bytes(&mut self) -> Result<[u8; 4]>;

    /// Reads exactly the number of bytes required to fill the provided buffer or returns an
    /// error.
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Ignores the specified number of bytes from the stream or returns an error.
    fn ignore_bytes(&mut self, count: u64) -> Result<()>;

    /// Gets the position of the stream.
    fn pos(&self) -> u64;

    /// Reads a single unsigned byte from the stream and returns it or an error.
    #[inline(always)]
    fn read_u8(&mut self) -> Result<u8> {
        self.read_byte()
    }

    /// Reads a single signed byte from the stream and returns it or an error.
    #[inline(always)]
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_byte()? as i8)
    }

    /// Reads two bytes from the stream and interprets them as an unsigned 16-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads two bytes from the stream and interprets them as a signed 16-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_double_bytes()?))
    }

    /// Reads two bytes from the stream and interprets them as an unsigned 16-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_double_bytes()?))
    }

    /// Reads two bytes from the stream and interprets them as a signed 16-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_double_bytes()?))
    }

    /// Reads three bytes from the stream and interprets them as an unsigned 24-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u24(&mut self) -> Result<u32> {
        let mut buf = [0u8; mem::size_of::<u32>()];
        buf[0..3].clone_from_slice(&self.read_triple_bytes()?);
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads three bytes from the stream and interprets them as a signed 24-bit little-endian
    /// integer, sign-extended, or returns an error.
    #[inline(always)]
    fn read_i24(&mut self) -> Result<i32> {
        Ok(((self.read_u24()? << 8) as i32) >> 8)
    }

    /// Reads three bytes from the stream and interprets them as an unsigned 24-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_u24(&mut self) -> Result<u32> {
        let mut buf = [0u8; mem::size_of::<u32>()];
        buf[0..3].clone_from_slice(&self.read_triple_bytes()?);
        Ok(u32::from_be_bytes(buf) >> 8)
    }

    /// Reads three bytes from the stream and interprets them as a signed 24-bit big-endian
    /// integer, sign-extended, or returns an error.
    #[inline(always)]
    fn read_be_i24(&mut self) -> Result<i32> {
        Ok(((self.read_be_u24()? << 8) as i32) >> 8)
    }

    /// Reads four bytes from the stream and interprets them as an unsigned 32-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as a signed 32-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as an unsigned 32-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as a signed 32-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_quad_bytes()?))
    }

    /// Reads eight bytes from the stream and interprets them as an unsigned 64-bit little-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; mem::size_of::<u64>()];
        self.read_buf_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads eight bytes from the stream and interprets them as an unsigned 64-bit big-endian
    /// integer or returns an error.
    #[inline(always)]
    fn read_be_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; mem::size_of::<u64>()];
        self.read_buf_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads four bytes from the stream and interprets them as a 32-bit little-endian IEEE-754
    /// floating-point value.
    #[inline(always)]
    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_quad_bytes()?))
    }

    /// Reads four bytes from the stream and interprets them as a 32-bit big-endian IEEE-754
    /// floating-point value.
    #[inline(always)]
    fn read_be_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_quad_bytes()?))
    }

    /// Reads eight bytes from the stream and interprets them as a 64-bit little-endian IEEE-754
    /// floating-point value.
    #[inline(always)]
    fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; mem::size_of::<u64>()];
        self.read_buf_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Reads eight bytes from the stream and interprets them as a 64-bit big-endian IEEE-754
    /// floating-point value.
    #[inline(always)]
    fn read_be_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; mem::size_of::<u64>()];
        self.read_buf_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }
}

impl<'b, R: ReadBytes> ReadBytes for &'b mut R {
    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8> {
        (*self).read_byte()
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> Result<[u8; 2]> {
        (*self).read_double_bytes()
    }

    #[inline(always)]
    fn read_triple_bytes(&mut self) -> Result<[u8; 3]> {
        (*self).read_triple_bytes()
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        (*self).read_quad_bytes()
    }

    #[inline(always)]
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (*self).read_buf_exact(buf)
    }

    #[inline(always)]
    fn ignore_bytes(&mut self, count: u64) -> Result<()> {
        (*self).ignore_bytes(count)
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        (**self).pos()
    }
}

/// `WriteBytes` provides methods to encode integers and floating-point values of standard widths
/// in either byte order and write them to a stream. It is implemented for all
/// [`std::io::Write`] types.
pub trait WriteBytes: io::Write {
    /// Writes a single byte to the stream or returns an error.
    #[inline(always)]
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write_all(&[b])?;
        Ok(())
    }

    /// Writes the entire buffer to the stream or returns an error.
    #[inline(always)]
    fn write_buf(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf)?;
        Ok(())
    }

    /// Writes an unsigned 16-bit integer to the stream in little-endian order.
    #[inline(always)]
    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_buf(&v.to_le_bytes())
    }

    /// Writes an unsigned 16-bit integer to the stream in big-endian order.
    #[inline(always)]
    fn write_be_u16(&mut self, v: u16) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }

    /// Writes a signed 16-bit integer to the stream in big-endian order.
    #[inline(always)]
    fn write_be_i16(&mut self, v: i16) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }

    /// Writes the low 24 bits of an unsigned integer to the stream in little-endian order.
    #[inline(always)]
    fn write_u24(&mut self, v: u32) -> Result<()> {
        self.write_buf(&v.to_le_bytes()[0..3])
    }

    /// Writes the low 24 bits of an unsigned integer to the stream in big-endian order.
    #[inline(always)]
    fn write_be_u24(&mut self, v: u32) -> Result<()> {
        self.write_buf(&v.to_be_bytes()[1..4])
    }

    /// Writes an unsigned 32-bit integer to the stream in little-endian order.
    #[inline(always)]
    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_buf(&v.to_le_bytes())
    }

    /// Writes an unsigned 32-bit integer to the stream in big-endian order.
    #[inline(always)]
    fn write_be_u32(&mut self, v: u32) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }

    /// Writes an unsigned 64-bit integer to the stream in little-endian order.
    #[inline(always)]
    fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_buf(&v.to_le_bytes())
    }

    /// Writes an unsigned 64-bit integer to the stream in big-endian order.
    #[inline(always)]
    fn write_be_u64(&mut self, v: u64) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }

    /// Writes a 32-bit IEEE-754 floating-point value to the stream in little-endian order.
    #[inline(always)]
    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_buf(&v.to_le_bytes())
    }

    /// Writes a 32-bit IEEE-754 floating-point value to the stream in big-endian order.
    #[inline(always)]
    fn write_be_f32(&mut self, v: f32) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }

    /// Writes a 64-bit IEEE-754 floating-point value to the stream in little-endian order.
    #[inline(always)]
    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_buf(&v.to_le_bytes())
    }

    /// Writes a 64-bit IEEE-754 floating-point value to the stream in big-endian order.
    #[inline(always)]
    fn write_be_f64(&mut self, v: f64) -> Result<()> {
        self.write_buf(&v.to_be_bytes())
    }
}

impl<W: io::Write> WriteBytes for W {}
