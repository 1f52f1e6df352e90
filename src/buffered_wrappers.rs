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

//! The buffering stream wrappers. A [`BufferedSource`] pulls bytes from its
//! raw source a segment at a time and serves the [`BufSource`] operation
//! set from its internal buffer; a [`BufferedSink`] collects appends and
//! pushes complete segments to its raw sink eagerly, holding back at most
//! one partial segment.

use std::cmp::min;
use crate::{Buffer, Error, Result};
use crate::segment::SIZE;
use crate::streams::{BufSink, BufSource, BufStream, Sink, Source, Timeout};

/// A source wrapper that buffers reads from its underlying raw source.
pub struct BufferedSource<S: Source> {
	buffer: Buffer,
	source: S,
	timeout: Timeout,
	closed: bool,
}

impl<S: Source> BufferedSource<S> {
	pub(crate) fn new(source: S) -> Self {
		Self {
			buffer: Buffer::new(),
			source,
			timeout: Timeout::new(),
			closed: false,
		}
	}

	pub fn timeout(&self) -> &Timeout { &self.timeout }
	pub fn timeout_mut(&mut self) -> &mut Timeout { &mut self.timeout }

	/// Returns a forward-only view of the upcoming bytes that does not
	/// consume them. The peek borrows this source, so the source cannot be
	/// advanced past peeked bytes while the view is live.
	pub fn peek(&mut self) -> Peek<'_, S> {
		Peek { source: self, offset: 0 }
	}
}

impl<S: Source> Source for BufferedSource<S> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::Closed);
		}
		if byte_count == 0 {
			return Ok(0);
		}
		if self.buffer.is_empty() {
			self.timeout.check()?;
			if self.source.read(&mut self.buffer, SIZE)? == 0 {
				return Ok(0);
			}
		}
		let n = min(byte_count, self.buffer.len());
		sink.write(&mut self.buffer, n)?;
		Ok(n)
	}

	fn close_source(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		let close = self.source.close_source();
		self.buffer.clear();
		close
	}
}

impl<S: Source> BufStream for BufferedSource<S> {
	fn buf(&self) -> &Buffer { &self.buffer }
	fn buf_mut(&mut self) -> &mut Buffer { &mut self.buffer }
	fn is_open(&self) -> bool { !self.closed }
}

impl<S: Source> BufSource for BufferedSource<S> {
	fn request(&mut self, byte_count: usize) -> Result<bool> {
		if self.closed {
			return Err(Error::Closed);
		}
		while self.buffer.len() < byte_count {
			self.timeout.check()?;
			if self.source.read(&mut self.buffer, SIZE)? == 0 {
				return Ok(false);
			}
		}
		Ok(true)
	}
}

impl<S: Source> Drop for BufferedSource<S> {
	fn drop(&mut self) {
		let _ = self.close_source();
	}
}

/// A forward-only view over a [`BufferedSource`]'s upcoming bytes. Reading
/// from the peek loads bytes into the parent's buffer without consuming
/// them from it.
pub struct Peek<'a, S: Source> {
	source: &'a mut BufferedSource<S>,
	offset: usize,
}

impl<S: Source> Source for Peek<'_, S> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.source.closed {
			return Err(Error::Closed);
		}
		let wanted = self.offset.saturating_add(byte_count);
		self.source.request(wanted)?;

		let available = self.source.buffer.len().saturating_sub(self.offset);
		let n = min(byte_count, available);
		if n == 0 {
			return Ok(0);
		}
		self.source.buffer.copy_to(sink, self.offset, n)?;
		self.offset += n;
		Ok(n)
	}
}

/// A sink wrapper that buffers writes to its underlying raw sink.
pub struct BufferedSink<S: Sink> {
	buffer: Buffer,
	sink: S,
	timeout: Timeout,
	closed: bool,
}

impl<S: Sink> BufferedSink<S> {
	pub(crate) fn new(sink: S) -> Self {
		Self {
			buffer: Buffer::new(),
			sink,
			timeout: Timeout::new(),
			closed: false,
		}
	}

	pub fn timeout(&self) -> &Timeout { &self.timeout }
	pub fn timeout_mut(&mut self) -> &mut Timeout { &mut self.timeout }

	fn emit_bytes(&mut self, byte_count: usize) -> Result {
		if byte_count > 0 {
			self.timeout.check()?;
			self.sink.write(&mut self.buffer, byte_count)?;
		}
		Ok(())
	}
}

impl<S: Sink> Sink for BufferedSink<S> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		self.buffer.write(source, byte_count)?;
		self.emit_complete_segments()
	}

	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		self.emit_bytes(self.buffer.len())?;
		self.timeout.check()?;
		self.sink.flush()
	}

	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		// Push what we can, then close the underlying sink either way and
		// surface the first error.
		let emit = self.emit_bytes(self.buffer.len());
		self.closed = true;
		let close = self.sink.close_sink();
		self.buffer.clear();
		emit.and(close)
	}
}

impl<S: Sink> BufStream for BufferedSink<S> {
	fn buf(&self) -> &Buffer { &self.buffer }
	fn buf_mut(&mut self) -> &mut Buffer { &mut self.buffer }
	fn is_open(&self) -> bool { !self.closed }
}

impl<S: Sink> BufSink for BufferedSink<S> {
	fn emit(&mut self) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		self.emit_bytes(self.buffer.len())
	}

	fn emit_complete_segments(&mut self) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		self.emit_bytes(self.buffer.complete_segment_bytes())
	}
}

impl<S: Sink> Drop for BufferedSink<S> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}
