// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Audiofile.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading, writing, or seeking the backing store.
    IoError(io::Error),
    /// No registered file type identifier matched the stream.
    Unrecognized,
    /// The header contained malformed data: a magic number mismatched mid-parse, a chunk ran past
    /// its container, a required chunk was absent, or a reserved field held an illegal value.
    MalformedHeader(&'static str),
    /// The header parsed, but requests a sample encoding, byte order, or codec tag that is not
    /// implemented.
    Unsupported(&'static str),
    /// The operation is not valid for the facade's state or backing store, e.g. `write` on a
    /// reader or `seek` on a one-shot stream.
    UnsupportedOperation(&'static str),
    /// The stream ended mid-sample.
    EndOfFile,
    /// A caller-provided offset, length, or frame buffer was invalid.
    InvalidArgument(&'static str),
    /// The frame-count watermark of an asynchronous writer changed while a header update was in
    /// flight.
    ConcurrentModification,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => {
                write!(f, "io error: {}", err)
            }
            Error::Unrecognized => {
                write!(f, "format not recognized")
            }
            Error::MalformedHeader(msg) => {
                write!(f, "malformed header: {}", msg)
            }
            Error::Unsupported(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
            Error::UnsupportedOperation(op) => {
                write!(f, "unsupported operation: {}", op)
            }
            Error::EndOfFile => {
                write!(f, "unexpected end of file")
            }
            Error::InvalidArgument(msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Error::ConcurrentModification => {
                write!(f, "frame count modified during header update")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfFile,
            _ => Error::IoError(err),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a malformed header error.
pub fn malformed_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::MalformedHeader(desc))
}

/// Convenience function to create an unsupported feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create an unsupported operation error.
pub fn unsupported_op_error<T>(op: &'static str) -> Result<T> {
    Err(Error::UnsupportedOperation(op))
}

/// Convenience function to create an invalid argument error.
pub fn invalid_argument_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidArgument(desc))
}

/// Convenience function to create an end-of-file error.
pub fn end_of_file_error<T>() -> Result<T> {
    Err(Error::EndOfFile)
}
