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

//! `std::io` interop. [`Buffer`] reads and writes as a plain in-memory
//! stream; [`SourceReader`]/[`SinkWriter`] bridge this crate's streams into
//! `std` traits, and [`ReaderSource`]/[`WriterSink`] bridge the other way.

use std::cmp::min;
use std::io::{self, Read, Write};
use crate::{Buffer, Error, Result};
use crate::segment::SIZE;
use crate::streams::{Sink, Source};

impl Read for Buffer {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		Ok(self.read_slice(buf))
	}
}

impl Write for Buffer {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.write_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Adapts any [`io::Read`] into a raw [`Source`].
pub struct ReaderSource<R: Read>(pub R);

impl<R: Read> Source for ReaderSource<R> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if byte_count == 0 {
			return Ok(0);
		}
		let n = {
			let tail = sink.writable_segment(1);
			let space = tail.free_space_mut();
			let cap = min(byte_count, space.len());
			self.0.read(&mut space[..cap])?
		};
		sink.commit_tail(n);
		Ok(n)
	}
}

/// Adapts any [`io::Write`] into a raw [`Sink`].
pub struct WriterSink<W: Write>(pub W);

impl<W: Write> Sink for WriterSink<W> {
	fn write(&mut self, source: &mut Buffer, mut byte_count: usize) -> Result {
		if byte_count > source.len() {
			return Err(Error::Eof);
		}
		while byte_count > 0 {
			let n = {
				let chunk = source.head_data(byte_count);
				self.0.write_all(chunk)?;
				chunk.len()
			};
			source.consume_from_head(n);
			byte_count -= n;
		}
		Ok(())
	}

	fn flush(&mut self) -> Result {
		self.0.flush()?;
		Ok(())
	}
}

/// Adapts any [`Source`] into an [`io::Read`].
pub struct SourceReader<S: Source> {
	source: S,
	buffer: Buffer,
}

impl<S: Source> SourceReader<S> {
	pub fn new(source: S) -> Self {
		Self { source, buffer: Buffer::new() }
	}

	pub fn into_inner(self) -> S { self.source }
}

impl<S: Source> Read for SourceReader<S> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if self.buffer.is_empty() {
			let read = self.source
				.read(&mut self.buffer, SIZE)
				.map_err(Error::into_io)?;
			if read == 0 {
				return Ok(0);
			}
		}
		Ok(self.buffer.read_slice(buf))
	}
}

/// Adapts any [`Sink`] into an [`io::Write`].
pub struct SinkWriter<S: Sink> {
	sink: S,
}

impl<S: Sink> SinkWriter<S> {
	pub fn new(sink: S) -> Self {
		Self { sink }
	}

	pub fn into_inner(self) -> S { self.sink }
}

impl<S: Sink> Write for SinkWriter<S> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		let mut staged = Buffer::from(buf);
		self.sink
			.write(&mut staged, buf.len())
			.map_err(Error::into_io)?;
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		self.sink.flush().map_err(Error::into_io)
	}
}
