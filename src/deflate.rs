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

//! The deflate bridges. [`DataProcessor`] is the narrow contract a
//! zlib-style transformer implements: consume a prefix of a source window,
//! produce a prefix of a target window, report whether the stream ended.
//! [`Deflater`] and [`Inflater`] implement it over `flate2` in raw mode (no
//! zlib header or trailer). [`DeflaterSink`] and [`InflaterSource`] pump
//! segment windows through a processor without intermediate copies.

use std::cmp::min;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use crate::{Buffer, Error, Result};
use crate::streams::{BufSink, BufSource, BufStream, Sink, Source, SourceExt, SinkExt, BufferedSink, BufferedSource};

/// How eagerly a processor must produce output for the bytes consumed so
/// far.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flush {
	/// Output may lag input while the processor accumulates state.
	None,
	/// All input consumed so far becomes readable output.
	Sync,
	/// The stream ends; the processor emits its trailer.
	Finish,
}

/// Forward progress reported by one processor call.
#[derive(Copy, Clone, Debug, Default)]
pub struct Progress {
	/// Bytes consumed from the source window.
	pub consumed: usize,
	/// Bytes produced into the target window.
	pub produced: usize,
	/// The stream ended; no further output will come.
	pub done: bool,
}

/// A windowed byte transformer, the seam between the pump loops and an
/// external compression backend.
pub trait DataProcessor {
	/// Consumes a prefix of `source` and produces a prefix of `target`,
	/// reporting the byte counts. Invalid data is a protocol error; any
	/// progress made before the error is already committed by the caller's
	/// windows being advanced only per the returned counts.
	fn process(&mut self, source: &[u8], target: &mut [u8], flush: Flush) -> Result<Progress>;
}

/// A raw-deflate compressor.
pub struct Deflater {
	raw: Compress,
}

impl Deflater {
	/// Creates a compressor at the default level, without zlib framing.
	pub fn new() -> Self {
		Self::with_level(Compression::default())
	}

	pub fn with_level(level: Compression) -> Self {
		Self { raw: Compress::new(level, false) }
	}
}

impl Default for Deflater {
	fn default() -> Self { Self::new() }
}

impl DataProcessor for Deflater {
	fn process(&mut self, source: &[u8], target: &mut [u8], flush: Flush) -> Result<Progress> {
		let flush = match flush {
			Flush::None => FlushCompress::None,
			Flush::Sync => FlushCompress::Sync,
			Flush::Finish => FlushCompress::Finish,
		};
		let before_in = self.raw.total_in();
		let before_out = self.raw.total_out();
		let status = self.raw
			.compress(source, target, flush)
			.map_err(|_| Error::Protocol("deflate failed"))?;
		Ok(Progress {
			consumed: (self.raw.total_in() - before_in) as usize,
			produced: (self.raw.total_out() - before_out) as usize,
			done: status == Status::StreamEnd,
		})
	}
}

/// A raw-deflate decompressor.
pub struct Inflater {
	raw: Decompress,
}

impl Inflater {
	/// Creates a decompressor that expects no zlib framing.
	pub fn new() -> Self {
		Self { raw: Decompress::new(false) }
	}
}

impl Default for Inflater {
	fn default() -> Self { Self::new() }
}

impl DataProcessor for Inflater {
	fn process(&mut self, source: &[u8], target: &mut [u8], flush: Flush) -> Result<Progress> {
		let flush = match flush {
			Flush::Finish => FlushDecompress::Finish,
			_ => FlushDecompress::None,
		};
		let before_in = self.raw.total_in();
		let before_out = self.raw.total_out();
		let status = self.raw
			.decompress(source, target, flush)
			.map_err(|_| Error::Protocol("invalid compressed data"))?;
		Ok(Progress {
			consumed: (self.raw.total_in() - before_in) as usize,
			produced: (self.raw.total_out() - before_out) as usize,
			done: status == Status::StreamEnd,
		})
	}
}

/// A sink that compresses everything written to it and forwards the
/// compressed bytes to an underlying sink.
pub struct DeflaterSink<S: Sink> {
	sink: BufferedSink<S>,
	deflater: Deflater,
	closed: bool,
}

impl<S: Sink> DeflaterSink<S> {
	pub fn new(sink: S) -> Self {
		Self::with_deflater(sink, Deflater::new())
	}

	pub fn with_deflater(sink: S, deflater: Deflater) -> Self {
		Self {
			sink: sink.buffered(),
			deflater,
			closed: false,
		}
	}

	/// Pumps with no new input until the deflater stops producing, or until
	/// it reports the stream finished when `flush` is [`Flush::Finish`].
	fn drain(&mut self, flush: Flush) -> Result {
		loop {
			let progress = {
				let tail = self.sink.buf_mut().writable_segment(1);
				self.deflater.process(&[], tail.free_space_mut(), flush)?
			};
			self.sink.buf_mut().commit_tail(progress.produced);
			self.sink.emit_complete_segments()?;
			let finished = match flush {
				Flush::Finish => progress.done,
				_ => progress.produced == 0,
			};
			if finished {
				return Ok(());
			}
		}
	}
}

impl<S: Sink> Sink for DeflaterSink<S> {
	/// Feeds `byte_count` bytes of `source` through the deflater, one head
	/// window at a time, emitting complete output segments as they fill.
	fn write(&mut self, source: &mut Buffer, mut byte_count: usize) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		if byte_count > source.len() {
			return Err(Error::Eof);
		}

		while byte_count > 0 {
			let progress = {
				let input = source.head_data(byte_count);
				let tail = self.sink.buf_mut().writable_segment(1);
				self.deflater.process(input, tail.free_space_mut(), Flush::None)?
			};
			source.consume_from_head(progress.consumed);
			self.sink.buf_mut().commit_tail(progress.produced);
			byte_count -= progress.consumed;
			self.sink.emit_complete_segments()?;
		}
		Ok(())
	}

	/// Sync-flushes the deflater so every byte written so far becomes
	/// readable downstream, then flushes the underlying sink.
	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::Closed);
		}
		self.drain(Flush::Sync)?;
		self.sink.flush()
	}

	/// Finishes the deflate stream, then closes the underlying sink even if
	/// finishing failed. The first error wins.
	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		let finish = self.drain(Flush::Finish);
		self.closed = true;
		let close = self.sink.close_sink();
		finish.and(close)
	}
}

impl<S: Sink> Drop for DeflaterSink<S> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}

/// A source that reads compressed bytes from an underlying source and
/// serves them decompressed.
pub struct InflaterSource<S: Source> {
	source: BufferedSource<S>,
	inflater: Inflater,
	closed: bool,
	finished: bool,
}

impl<S: Source> InflaterSource<S> {
	pub fn new(source: S) -> Self {
		Self::with_inflater(source, Inflater::new())
	}

	pub fn with_inflater(source: S, inflater: Inflater) -> Self {
		Self {
			source: source.buffered(),
			inflater,
			closed: false,
			finished: false,
		}
	}
}

impl<S: Source> Source for InflaterSource<S> {
	/// Produces up to `byte_count` decompressed bytes into `sink`, at most
	/// one segment per call. Returns `Ok(0)` at the end of the compressed
	/// stream, and an end-of-stream error if the input ends mid-stream.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::Closed);
		}
		if byte_count == 0 || self.finished {
			return Ok(0);
		}

		loop {
			let exhausted = !self.source.request(1)?;
			let progress = {
				let input = self.source.buf().head_data(usize::MAX);
				let tail = sink.writable_segment(1);
				let space = tail.free_space_mut();
				let cap = min(byte_count, space.len());
				self.inflater.process(input, &mut space[..cap], Flush::None)?
			};
			self.source.buf_mut().consume_from_head(progress.consumed);
			sink.commit_tail(progress.produced);

			if progress.done {
				self.finished = true;
			}
			if progress.produced > 0 {
				return Ok(progress.produced);
			}
			if self.finished {
				return Ok(0);
			}
			if exhausted && progress.consumed == 0 {
				// The compressed stream was cut short.
				return Err(Error::Eof);
			}
		}
	}

	fn close_source(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		self.source.close_source()
	}
}

impl<S: Source> Drop for InflaterSource<S> {
	fn drop(&mut self) {
		let _ = self.close_source();
	}
}

#[cfg(test)]
mod test {
	use quickcheck_macros::quickcheck;
	use crate::streams::BufSource;
	use super::*;

	fn deflated(data: &[u8]) -> Vec<u8> {
		let mut compressed = Vec::new();
		{
			let mut sink = DeflaterSink::new(&mut compressed);
			let mut buf = Buffer::new();
			buf.write_slice(data);
			let len = buf.len();
			sink.write(&mut buf, len).unwrap();
			sink.close_sink().unwrap();
		}
		compressed
	}

	#[test]
	fn round_trip() {
		let data = b"God help us, we're in the hands of engineers.";
		let compressed = deflated(data);

		let mut inflated = InflaterSource::new(&compressed[..]).buffered();
		let mut out = Vec::new();
		assert_eq!(inflated.read_all(&mut out).unwrap(), data.len());
		assert_eq!(out, data);
	}

	#[quickcheck]
	fn inflate_inverts_deflate(data: Vec<u8>) {
		let compressed = deflated(&data);
		let mut inflated = InflaterSource::new(&compressed[..]).buffered();
		let mut out = Vec::new();
		inflated.read_all(&mut out).unwrap();
		assert_eq!(out, data);
	}

	#[test]
	fn invalid_data_is_a_protocol_error() {
		let junk = [0xFF_u8; 32];
		let mut inflated = InflaterSource::new(&junk[..]);
		let mut out = Buffer::new();
		let result = loop {
			match inflated.read(&mut out, 64) {
				Ok(0) => break Ok(0),
				Ok(_) => continue,
				Err(e) => break Err(e),
			}
		};
		assert!(matches!(result, Err(Error::Protocol(_))));
	}

	#[test]
	fn truncated_stream_is_eof() {
		let compressed = deflated(b"some reasonably compressible input, repeated, repeated");
		let truncated = &compressed[..compressed.len() - 4];

		let mut inflated = InflaterSource::new(truncated).buffered();
		let mut out = Vec::new();
		assert!(matches!(inflated.read_all(&mut out), Err(Error::Eof)));
	}
}
