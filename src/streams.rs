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

//! Stream traits. [`Source`] and [`Sink`] are the raw contracts an external
//! byte stream implements: move a chunk of bytes into or out of a buffer.
//! [`BufSource`] and [`BufSink`] are the rich operation sets layered over an
//! internal buffer; [`Buffer`] itself and the buffered wrappers implement
//! them.

use std::cmp::min;
use std::mem;
use std::time::Instant;
use crate::{Buffer, ByteString, Error, Options, Result};
use crate::options::PrefixMatch;
use crate::segment::SIZE;

pub use crate::buffered_wrappers::{BufferedSink, BufferedSource, Peek};

/// A raw stream of bytes to read from.
pub trait Source {
	/// Reads up to `byte_count` bytes into `sink`, returning the number of
	/// bytes read. Returns `Ok(0)` only once the source is exhausted; on
	/// exhaustion `sink` is left untouched.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize>;

	/// Closes the source, releasing its resources. Closing is idempotent.
	fn close_source(&mut self) -> Result { Ok(()) }
}

/// A raw stream of bytes to write to.
pub trait Sink {
	/// Removes exactly `byte_count` bytes from `source` and writes them to
	/// this sink.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result;

	/// Pushes all buffered bytes to their final destination.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Flushes and closes the sink. Closing is idempotent.
	fn close_sink(&mut self) -> Result { self.flush() }
}

impl<S: Source + ?Sized> Source for &mut S {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		(**self).read(sink, byte_count)
	}

	fn close_source(&mut self) -> Result { (**self).close_source() }
}

impl<S: Sink + ?Sized> Sink for &mut S {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		(**self).write(source, byte_count)
	}

	fn flush(&mut self) -> Result { (**self).flush() }

	fn close_sink(&mut self) -> Result { (**self).close_sink() }
}

impl Source for &[u8] {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		let n = min(byte_count, self.len());
		sink.write_slice(&self[..n]);
		*self = &self[n..];
		Ok(n)
	}
}

impl Sink for Vec<u8> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if byte_count > source.len() {
			return Err(Error::Eof);
		}
		source.visit_range(0, byte_count, |chunk| self.extend_from_slice(chunk));
		source.skip(byte_count)
	}
}

/// Wraps a source in a [`BufferedSource`].
pub trait SourceExt: Source + Sized {
	fn buffered(self) -> BufferedSource<Self> { BufferedSource::new(self) }
}

impl<S: Source> SourceExt for S {}

/// Wraps a sink in a [`BufferedSink`].
pub trait SinkExt: Sink + Sized {
	fn buffered(self) -> BufferedSink<Self> { BufferedSink::new(self) }
}

impl<S: Sink> SinkExt for S {}

/// Access to the internal buffer of a buffered stream.
pub trait BufStream {
	fn buf(&self) -> &Buffer;
	fn buf_mut(&mut self) -> &mut Buffer;

	/// Returns `false` once the stream is closed.
	fn is_open(&self) -> bool { true }
}

macro_rules! gen_int_reads {
	($($name:ident $le_name:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!("Reads one big-endian [`", stringify!($ty), "`].")]
		fn $name(&mut self) -> Result<$ty> {
			self.require(mem::size_of::<$ty>())?;
			Ok(<$ty>::from_be_bytes(self.buf_mut().read_array()?))
		}

		#[doc = concat!("Reads one little-endian [`", stringify!($ty), "`].")]
		fn $le_name(&mut self) -> Result<$ty> {
			self.require(mem::size_of::<$ty>())?;
			Ok(<$ty>::from_le_bytes(self.buf_mut().read_array()?))
		}
		)+
	};
}

/// The buffered read operation set.
pub trait BufSource: BufStream + Source {
	/// Reads until the buffer holds at least `byte_count` bytes or the
	/// underlying source is exhausted, returning whether the target was
	/// reached.
	fn request(&mut self, byte_count: usize) -> Result<bool>;

	/// Like [`request`][], but returns an end-of-stream error when the
	/// requested count cannot be reached.
	///
	/// [`request`]: Self::request
	fn require(&mut self, byte_count: usize) -> Result {
		if self.request(byte_count)? {
			Ok(())
		} else {
			Err(Error::Eof)
		}
	}

	/// Reads one byte.
	fn read_u8(&mut self) -> Result<u8> {
		self.require(1)?;
		self.buf_mut().read_u8()
	}

	/// Reads one signed byte.
	fn read_i8(&mut self) -> Result<i8> {
		Ok(self.read_u8()? as i8)
	}

	gen_int_reads! {
		read_u16 read_u16_le -> u16,
		read_i16 read_i16_le -> i16,
		read_u32 read_u32_le -> u32,
		read_i32 read_i32_le -> i32,
		read_u64 read_u64_le -> u64,
		read_i64 read_i64_le -> i64,
	}

	/// Reads an ASCII decimal integer: an optional leading `-`, then one or
	/// more digits, stopping at the first non-digit. Overflow of an [`i64`]
	/// is an error that consumes nothing.
	fn read_decimal_i64(&mut self) -> Result<i64> {
		self.require(1)?;
		let mut pos = 0;
		while self.request(pos + 1)? {
			let b = self.buf().get(pos).expect("requested byte is buffered");
			let numeric = b.is_ascii_digit() || (pos == 0 && b == b'-');
			if !numeric { break }
			pos += 1;
		}
		self.buf_mut().read_decimal_i64()
	}

	/// Reads an ASCII hexadecimal unsigned integer, stopping at the first
	/// non-hex character. More than 16 significant digits overflow a
	/// [`u64`]; overflow is an error that consumes nothing.
	fn read_hexadecimal_u64(&mut self) -> Result<u64> {
		self.require(1)?;
		let mut pos = 0;
		while self.request(pos + 1)? {
			let b = self.buf().get(pos).expect("requested byte is buffered");
			if !b.is_ascii_hexdigit() { break }
			pos += 1;
		}
		self.buf_mut().read_hexadecimal_u64()
	}

	/// Reads one UTF-8 code point, decoding malformed sequences to the
	/// replacement character. A well-formed leading byte at the end of the
	/// stream is an end-of-stream error that consumes nothing.
	fn read_utf8_code_point(&mut self) -> Result<char> {
		self.require(1)?;
		let width = match self.buf().get(0).expect("one byte is buffered") {
			0xC0..=0xDF => 2,
			0xE0..=0xEF => 3,
			0xF0..=0xF7 => 4,
			_ => 1,
		};
		self.request(width)?;
		self.buf_mut().read_utf8_code_point()
	}

	/// Reads bytes into `dst`, returning the number read; fewer only when
	/// the stream is exhausted.
	fn read_slice(&mut self, dst: &mut [u8]) -> Result<usize> {
		let mut off = 0;
		while off < dst.len() && self.request(1)? {
			off += self.buf_mut().read_slice(&mut dst[off..]);
		}
		Ok(off)
	}

	/// Fills `dst` exactly, or returns an end-of-stream error.
	fn read_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		self.buf_mut().read_slice_exact(dst)
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		self.require(N)?;
		self.buf_mut().read_array()
	}

	/// Reads exactly `byte_count` bytes into an immutable byte string.
	fn read_byte_string(&mut self, byte_count: usize) -> Result<ByteString> {
		self.require(byte_count)?;
		self.buf_mut().read_byte_string(byte_count)
	}

	/// Reads exactly `byte_count` bytes as UTF-8, substituting the
	/// replacement character for malformed sequences.
	fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		self.buf_mut().read_utf8(byte_count)
	}

	/// Reads the rest of the stream as UTF-8.
	fn read_utf8_to_end(&mut self) -> Result<String> {
		while self.request(self.buf().len() + 1)? { }
		let n = self.buf().len();
		self.buf_mut().read_utf8(n)
	}

	/// Reads UTF-8 text into `dst` up to a line terminator, returning
	/// whether a terminator was found. The terminator (`\n` or `\r\n`) is
	/// consumed but not written to `dst`; with none found, the rest of the
	/// stream is read.
	fn read_utf8_line(&mut self, dst: &mut String) -> Result<bool> {
		let mut from = 0;
		loop {
			if self.buf().index_of(b'\n', from, usize::MAX).is_some() {
				return self.buf_mut().read_utf8_line(dst);
			}
			from = self.buf().len();
			if !self.request(from + 1)? {
				let n = self.buf().len();
				dst.push_str(&self.buf_mut().read_utf8(n)?);
				return Ok(false);
			}
		}
	}

	/// Returns the index of the first `byte` at or past `from`, loading
	/// more data into the buffer as the search advances. `None` once the
	/// stream is exhausted without a match.
	fn index_of(&mut self, byte: u8, from: usize) -> Result<Option<usize>> {
		let mut search_from = from;
		loop {
			if let Some(i) = self.buf().index_of(byte, search_from, usize::MAX) {
				return Ok(Some(i));
			}
			search_from = self.buf().len().max(from);
			if !self.request(search_from + 1)? {
				return Ok(None);
			}
		}
	}

	/// Consumes `byte_count` bytes, or everything and an end-of-stream
	/// error if the stream ends first.
	fn skip(&mut self, mut byte_count: usize) -> Result {
		while byte_count > 0 {
			if !self.request(1)? {
				return Err(Error::Eof);
			}
			let n = min(byte_count, self.buf().len());
			self.buf_mut().skip(n)?;
			byte_count -= n;
		}
		Ok(())
	}

	/// Matches the stream's next bytes against `options`, consuming the
	/// matched alternative and returning its index. With no match, nothing
	/// is consumed and `None` is returned.
	fn select(&mut self, options: &Options) -> Result<Option<usize>> {
		let mut exhausted = false;
		loop {
			match options.match_prefix(self.buf(), exhausted) {
				PrefixMatch::Match { index, len } => {
					self.buf_mut().skip(len)?;
					return Ok(Some(index));
				}
				PrefixMatch::Miss => return Ok(None),
				PrefixMatch::Truncated => {
					if !self.request(self.buf().len() + 1)? {
						exhausted = true;
					}
				}
			}
		}
	}

	/// Moves everything remaining to `sink`, returning the byte count.
	fn read_all(&mut self, sink: &mut impl Sink) -> Result<usize> {
		let mut total = 0;
		while self.request(1)? {
			let n = self.buf().len();
			sink.write(self.buf_mut(), n)?;
			total += n;
		}
		Ok(total)
	}
}

macro_rules! gen_int_writes {
	($($name:ident $le_name:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!("Writes one big-endian [`", stringify!($ty), "`].")]
		fn $name(&mut self, value: $ty) -> Result {
			self.buf_mut().$name(value);
			self.emit_complete_segments()
		}

		#[doc = concat!("Writes one little-endian [`", stringify!($ty), "`].")]
		fn $le_name(&mut self, value: $ty) -> Result {
			self.buf_mut().$le_name(value);
			self.emit_complete_segments()
		}
		)+
	};
}

/// The buffered write operation set. Every append ends by emitting complete
/// segments downstream, keeping at most one partial segment buffered.
pub trait BufSink: BufStream + Sink {
	/// Writes all buffered bytes to the underlying sink.
	fn emit(&mut self) -> Result { Ok(()) }

	/// Writes only full segments to the underlying sink, leaving the
	/// partial tail buffered.
	fn emit_complete_segments(&mut self) -> Result { Ok(()) }

	/// Writes one byte.
	fn write_u8(&mut self, value: u8) -> Result {
		self.buf_mut().write_u8(value);
		self.emit_complete_segments()
	}

	/// Writes one signed byte.
	fn write_i8(&mut self, value: i8) -> Result {
		self.write_u8(value as u8)
	}

	gen_int_writes! {
		write_u16 write_u16_le -> u16,
		write_i16 write_i16_le -> i16,
		write_u32 write_u32_le -> u32,
		write_i32 write_i32_le -> i32,
		write_u64 write_u64_le -> u64,
		write_i64 write_i64_le -> i64,
	}

	fn write_slice(&mut self, value: &[u8]) -> Result {
		self.buf_mut().write_slice(value);
		self.emit_complete_segments()
	}

	fn write_str(&mut self, value: &str) -> Result {
		self.buf_mut().write_str(value);
		self.emit_complete_segments()
	}

	/// Writes one code point as UTF-8. Surrogates and values above
	/// `0x10FFFF` are rejected.
	fn write_utf8_code_point(&mut self, code_point: u32) -> Result {
		self.buf_mut().write_utf8_code_point(code_point)?;
		self.emit_complete_segments()
	}

	/// Writes a UTF-16 code unit sequence as UTF-8, encoding each unpaired
	/// surrogate as `'?'`.
	fn write_utf16(&mut self, units: &[u16]) -> Result {
		self.buf_mut().write_utf16(units);
		self.emit_complete_segments()
	}

	/// Writes an ASCII decimal integer.
	fn write_decimal_i64(&mut self, value: i64) -> Result {
		self.buf_mut().write_decimal_i64(value);
		self.emit_complete_segments()
	}

	/// Writes an ASCII lowercase hexadecimal integer.
	fn write_hexadecimal_u64(&mut self, value: u64) -> Result {
		self.buf_mut().write_hexadecimal_u64(value);
		self.emit_complete_segments()
	}

	fn write_byte_string(&mut self, value: &ByteString) -> Result {
		self.buf_mut().write_byte_string(value);
		self.emit_complete_segments()
	}

	/// Writes everything `source` can produce, returning the byte count.
	fn write_all(&mut self, source: &mut impl Source) -> Result<usize> {
		let mut total = 0;
		loop {
			let n = source.read(self.buf_mut(), SIZE)?;
			if n == 0 { break }
			total += n;
			self.emit_complete_segments()?;
		}
		Ok(total)
	}
}

/// A stack of deadlines for blocking calls into an underlying stream. The
/// buffered wrappers consult their timeout before each such call; a pushed
/// child deadline tightens the parent's, and popping restores it.
#[derive(Clone, Debug, Default)]
pub struct Timeout {
	deadlines: Vec<Instant>,
}

impl Timeout {
	pub fn new() -> Self { Self::default() }

	/// Pushes a deadline onto the stack.
	pub fn push_deadline(&mut self, deadline: Instant) {
		self.deadlines.push(deadline);
	}

	/// Pops the most recent deadline, restoring the parent's.
	pub fn pop_deadline(&mut self) -> Option<Instant> {
		self.deadlines.pop()
	}

	/// Returns the effective deadline, the earliest on the stack.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadlines.iter().min().copied()
	}

	/// Returns an interrupted error if the effective deadline has passed.
	pub fn check(&self) -> Result {
		match self.deadline() {
			Some(deadline) if Instant::now() >= deadline => Err(Error::Interrupted),
			_ => Ok(()),
		}
	}
}
