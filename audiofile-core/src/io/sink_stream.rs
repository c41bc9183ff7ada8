// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

use crate::io::MediaSink;

/// `SinkStream` wraps a [`MediaSink`] and tracks the absolute write position, so that header
/// emitters can record the offsets of length fields for later back-patching.
pub struct SinkStream {
    /// The underlying media sink.
    inner: Box<dyn MediaSink>,
    /// The absolute position of the next byte to be written.
    pos: u64,
}

impl SinkStream {
    pub fn new(inner: Box<dyn MediaSink>) -> Self {
        SinkStream { inner, pos: 0 }
    }

    /// Returns if the underlying sink is seekable.
    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    /// Gets the absolute position of the stream.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Unwraps the stream, returning the underlying media sink.
    pub fn into_inner(self) -> Box<dyn MediaSink> {
        self.inner
    }
}

impl io::Write for SinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl io::Seek for SinkStream {
    fn seek(&mut self, from: io::SeekFrom) -> io::Result<u64> {
        self.pos = self.inner.seek(from)?;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::WriteBytes;
    use std::io::{Cursor, Seek, SeekFrom};

    #[test]
    fn tracks_position_across_writes_and_seeks() {
        let mut sink = SinkStream::new(Box::new(Cursor::new(Vec::new())));

        sink.write_be_u32(0xdead_beef).unwrap();
        assert_eq!(sink.pos(), 4);

        sink.write_u16(7).unwrap();
        assert_eq!(sink.pos(), 6);

        sink.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(sink.pos(), 2);
    }
}
