// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;
use std::io;

use crate::errors::{end_of_file_error, unsupported_op_error, Result};
use crate::io::{MediaSource, ReadBytes};

/// The default read-ahead buffer length. At least 1 kB must be buffered so that format
/// identification can rewind an unseekable source after probing its leading bytes.
const DEFAULT_BUF_LEN: usize = 4 * 1024;

/// `SourceStream` is a buffered reader over a [`MediaSource`] that implements [`ReadBytes`] and
/// tracks the absolute stream position.
///
/// The buffer fills in place until it is full, so the entire first window remains rewindable
/// even when the underlying source cannot seek. This is what makes format identification
/// non-destructive on one-shot streams.
pub struct SourceStream {
    /// The underlying media source.
    inner: Box<dyn MediaSource>,
    /// The read-ahead buffer.
    buf: Box<[u8]>,
    /// The absolute position of the first byte in the buffer.
    base: u64,
    /// The position of the next byte to read relative to the start of the buffer.
    read_pos: usize,
    /// The number of valid bytes in the buffer.
    end_pos: usize,
}

impl SourceStream {
    pub fn new(inner: Box<dyn MediaSource>) -> Self {
        SourceStream {
            inner,
            buf: vec![0u8; DEFAULT_BUF_LEN].into_boxed_slice(),
            base: 0,
            read_pos: 0,
            end_pos: 0,
        }
    }

    /// Returns if the underlying source is seekable.
    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    /// Returns the length of the underlying source in bytes, if available.
    pub fn byte_len(&self) -> Option<u64> {
        self.inner.byte_len()
    }

    /// Seeks to the given absolute position.
    ///
    /// Positions within the buffered window are reached without touching the underlying source,
    /// so rewinding over recently probed bytes works even on unseekable sources.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        let buf_end = self.base + self.end_pos as u64;

        if pos >= self.base && pos <= buf_end {
            self.read_pos = (pos - self.base) as usize;
            return Ok(pos);
        }

        if !self.inner.is_seekable() {
            return unsupported_op_error("io: source does not support seeking");
        }

        let new_pos = self.inner.seek(io::SeekFrom::Start(pos)).map_err(crate::errors::Error::from)?;

        self.base = new_pos;
        self.read_pos = 0;
        self.end_pos = 0;

        Ok(new_pos)
    }

    /// Unwraps the stream, returning the underlying media source.
    pub fn into_inner(self) -> Box<dyn MediaSource> {
        self.inner
    }

    /// Ensures at least one unread byte is buffered, fetching from the source if required.
    /// Returns the number of unread bytes, which is 0 at the end of the stream.
    fn fetch(&mut self) -> Result<usize> {
        if self.read_pos < self.end_pos {
            return Ok(self.end_pos - self.read_pos);
        }

        // The buffer fills in place until full. Only once exhausted *and* full does the window
        // advance, discarding the oldest bytes.
        if self.end_pos == self.buf.len() {
            self.base += self.end_pos as u64;
            self.read_pos = 0;
            self.end_pos = 0;
        }

        let len = self.buf.len();
        let n = self.inner.read(&mut self.buf[self.end_pos..len])?;
        self.end_pos += n;

        Ok(self.end_pos - self.read_pos)
    }
}

impl io::Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let avail =
            self.fetch().map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

        if avail == 0 {
            return Ok(0);
        }

        let n = cmp::min(avail, buf.len());
        buf[..n].copy_from_slice(&self.buf[self.read_pos..self.read_pos + n]);
        self.read_pos += n;

        Ok(n)
    }
}

impl ReadBytes for SourceStream {
    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8> {
        if self.fetch()? == 0 {
            return end_of_file_error();
        }

        let b = self.buf[self.read_pos];
        self.read_pos += 1;
        Ok(b)
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> Result<[u8; 2]> {
        let mut bytes = [0u8; 2];
        self.read_buf_exact(&mut bytes)?;
        Ok(bytes)
    }

    #[inline(always)]
    fn read_triple_bytes(&mut self) -> Result<[u8; 3]> {
        let mut bytes = [0u8; 3];
        self.read_buf_exact(&mut bytes)?;
        Ok(bytes)
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut bytes = [0u8; 4];
        self.read_buf_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut written = 0;

        while written < buf.len() {
            let avail = self.fetch()?;

            if avail == 0 {
                return end_of_file_error();
            }

            let n = cmp::min(avail, buf.len() - written);
            buf[written..written + n].copy_from_slice(&self.buf[self.read_pos..self.read_pos + n]);
            self.read_pos += n;
            written += n;
        }

        Ok(())
    }

    fn ignore_bytes(&mut self, count: u64) -> Result<()> {
        let mut remaining = count;

        // Consume buffered bytes first, then seek past the remainder if the source allows it.
        let buffered = (self.end_pos - self.read_pos) as u64;
        let n = cmp::min(buffered, remaining);
        self.read_pos += n as usize;
        remaining -= n;

        if remaining == 0 {
            return Ok(());
        }

        if self.inner.is_seekable() {
            let target = self.pos() + remaining;
            self.seek(target)?;
            return Ok(());
        }

        let mut scratch = [0u8; 1024];

        while remaining > 0 {
            let n = cmp::min(remaining, scratch.len() as u64) as usize;
            self.read_buf_exact(&mut scratch[..n])?;
            remaining -= n as u64;
        }

        Ok(())
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        self.base + self.read_pos as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ReadOnlySource;
    use std::io::Cursor;

    #[test]
    fn rewind_within_buffer_on_unseekable_source() {
        let data: Vec<u8> = (0u8..=255).collect();
        let mut ss = SourceStream::new(Box::new(ReadOnlySource::new(Cursor::new(data))));

        assert_eq!(ss.read_quad_bytes().unwrap(), [0, 1, 2, 3]);
        assert_eq!(ss.pos(), 4);

        // Probed bytes must remain reachable after a buffered rewind.
        ss.seek(0).unwrap();
        assert_eq!(ss.pos(), 0);
        assert_eq!(ss.read_quad_bytes().unwrap(), [0, 1, 2, 3]);
    }

    #[test]
    fn seek_outside_buffer_requires_seekable_source() {
        let data = vec![0u8; 16 * 1024];
        let mut ss = SourceStream::new(Box::new(ReadOnlySource::new(Cursor::new(data))));

        assert!(ss.seek(8 * 1024).is_err());
    }

    #[test]
    fn ignore_bytes_crosses_buffer_boundary() {
        let mut data = vec![0u8; 10_000];
        data[9_999] = 0xab;
        let mut ss = SourceStream::new(Box::new(Cursor::new(data)));

        ss.ignore_bytes(9_999).unwrap();
        assert_eq!(ss.read_byte().unwrap(), 0xab);
        assert_eq!(ss.pos(), 10_000);
    }
}
