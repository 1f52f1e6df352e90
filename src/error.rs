// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{io, result};

/// The error type for buffer and stream operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A read required more bytes than the stream could provide.
	#[error("premature end of stream")]
	Eof,
	/// An operation was attempted on a closed stream.
	#[error("stream closed")]
	Closed,
	/// An invalid parameter was passed, such as a negative count or an
	/// out-of-range code point.
	#[error("invalid argument: {0}")]
	IllegalArgument(&'static str),
	/// An operation was attempted in a state that doesn't allow it, such as
	/// writing through a read-only cursor.
	#[error("invalid state: {0}")]
	IllegalState(&'static str),
	/// A decimal or hexadecimal parse produced a value outside the 64-bit
	/// range. The offending text is left unconsumed in the source.
	#[error("number too large: {0}")]
	Overflow(String),
	/// A compressor or decompressor reported invalid data.
	#[error("protocol error: {0}")]
	Protocol(&'static str),
	/// A deadline passed while an operation was blocked.
	#[error("timed out")]
	Interrupted,
	/// The underlying stream reported a failure.
	#[error("IO error")]
	Io(#[from] io::Error),
}

pub type Result<T = ()> = result::Result<T, Error>;

impl Error {
	pub(crate) fn into_io(self) -> io::Error {
		match self {
			Self::Eof    => io::Error::new(io::ErrorKind::UnexpectedEof, self),
			Self::Io(io) => io,
			_            => io::Error::new(io::ErrorKind::Other, self),
		}
	}
}
