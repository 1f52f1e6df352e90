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

use std::cmp::min;
use crate::{Buffer, ByteString, Error, Result};
use crate::streams::{BufSource, Source};
use crate::utf8::{self, Decoded, REPLACEMENT_CHARACTER};

macro_rules! gen_int_reads {
	($($name:ident $le_name:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!("Reads one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_be_bytes(self.read_array()?))
		}

		#[doc = concat!("Reads one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_le_bytes(self.read_array()?))
		}
		)+
	};
}

impl Buffer {
	/// Reads one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		let b = self.get(0).ok_or(Error::Eof)?;
		self.consume_from_head(1);
		Ok(b)
	}

	/// Reads one signed byte.
	pub fn read_i8(&mut self) -> Result<i8> {
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

	/// Reads an exact array of bytes, failing with end-of-stream if the
	/// buffer holds fewer.
	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut array = [0; N];
		self.read_slice_exact(&mut array)?;
		Ok(array)
	}

	/// Reads bytes into `dst`, returning the number read.
	pub fn read_slice(&mut self, dst: &mut [u8]) -> usize {
		let n = min(dst.len(), self.size);
		let mut off = 0;
		while off < n {
			let data = self.head_data(n - off);
			let len = data.len();
			dst[off..off + len].copy_from_slice(data);
			self.consume_from_head(len);
			off += len;
		}
		n
	}

	/// Fills `dst` exactly, consuming nothing if the buffer holds fewer
	/// bytes than it needs.
	pub fn read_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		if dst.len() > self.size {
			return Err(Error::Eof);
		}
		self.read_slice(dst);
		Ok(())
	}

	/// Reads exactly `byte_count` bytes into an immutable byte string.
	pub fn read_byte_string(&mut self, byte_count: usize) -> Result<ByteString> {
		if byte_count > self.size {
			return Err(Error::Eof);
		}
		let mut bytes = vec![0; byte_count];
		self.read_slice(&mut bytes);
		Ok(bytes.into())
	}

	/// Reads exactly `byte_count` bytes as UTF-8, substituting the
	/// replacement character for malformed sequences.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		if byte_count > self.size {
			return Err(Error::Eof);
		}
		let mut bytes = vec![0; byte_count];
		self.read_slice(&mut bytes);
		Ok(utf8::decode_lossy(&bytes).into_owned())
	}

	/// Reads all remaining bytes as UTF-8.
	pub fn read_utf8_to_end(&mut self) -> Result<String> {
		self.read_utf8(self.size)
	}

	/// Reads UTF-8 text into `dst` up to a line terminator, returning
	/// whether a terminator was found. The terminator (`\n` or `\r\n`) is
	/// consumed but not written; with none present, the rest of the buffer
	/// is read.
	pub fn read_utf8_line(&mut self, dst: &mut String) -> Result<bool> {
		let Some(newline) = Buffer::index_of(self, b'\n', 0, usize::MAX) else {
			dst.push_str(&self.read_utf8_to_end()?);
			return Ok(false);
		};

		let mut end = newline;
		let mut term = 1;
		if newline > 0 && self.get(newline - 1) == Some(b'\r') {
			end -= 1;
			term = 2;
		}
		dst.push_str(&self.read_utf8(end)?);
		self.skip(term)?;
		Ok(true)
	}

	/// Reads one UTF-8 code point, decoding malformed sequences to the
	/// replacement character with the minimal consumption rules: a
	/// malformed sequence consumes only its well-formed prefix, and a
	/// truncated sequence at the end of the buffer consumes nothing.
	pub fn read_utf8_code_point(&mut self) -> Result<char> {
		if self.is_empty() {
			return Err(Error::Eof);
		}

		let mut window = [0; 4];
		let len = min(4, self.size);
		for (i, slot) in window[..len].iter_mut().enumerate() {
			*slot = self.get(i).expect("index is within the buffer");
		}

		match utf8::decode_code_point(&window[..len]) {
			Decoded::Char(c, n) => {
				self.skip(n)?;
				Ok(c)
			}
			Decoded::Malformed(n) => {
				self.skip(n)?;
				Ok(REPLACEMENT_CHARACTER)
			}
			Decoded::Truncated => Err(Error::Eof),
		}
	}

	/// Reads an ASCII decimal integer: an optional leading `-`, then one or
	/// more digits. The first non-digit terminates the number and stays in
	/// the buffer. A value outside the [`i64`] range is an overflow error
	/// that consumes nothing.
	pub fn read_decimal_i64(&mut self) -> Result<i64> {
		const OVERFLOW_ZONE: i64 = i64::MIN / 10;

		if self.is_empty() {
			return Err(Error::Eof);
		}

		// Accumulate negated so i64::MIN parses without wrapping.
		let mut value = 0i64;
		let mut seen = 0usize;
		let mut negative = false;
		let mut overflow_digit = -7i64;
		let mut terminated = false;

		'scan: for chunk in self.chunks() {
			for &b in chunk {
				match b {
					b'0'..=b'9' => {
						let digit = -((b - b'0') as i64);
						if value < OVERFLOW_ZONE
							|| (value == OVERFLOW_ZONE && digit < overflow_digit)
						{
							let text: String = self.bytes()
								.take(seen + 1)
								.map(char::from)
								.collect();
							return Err(Error::Overflow(text));
						}
						value = value * 10 + digit;
					}
					b'-' if seen == 0 => {
						negative = true;
						overflow_digit -= 1;
					}
					_ => {
						terminated = true;
						break 'scan;
					}
				}
				seen += 1;
			}
		}

		if seen == negative as usize {
			return Err(if terminated {
				Error::IllegalArgument("expected a digit")
			} else {
				Error::Eof
			});
		}

		self.skip(seen)?;
		Ok(if negative { value } else { -value })
	}

	/// Reads an ASCII hexadecimal unsigned integer, accepting both digit
	/// cases. The first non-hex byte terminates the number and stays in the
	/// buffer. A value outside the [`u64`] range is an overflow error that
	/// consumes nothing.
	pub fn read_hexadecimal_u64(&mut self) -> Result<u64> {
		if self.is_empty() {
			return Err(Error::Eof);
		}

		let mut value = 0u64;
		let mut seen = 0usize;
		let mut terminated = false;

		'scan: for chunk in self.chunks() {
			for &b in chunk {
				let digit = match b {
					b'0'..=b'9' => b - b'0',
					b'a'..=b'f' => b - b'a' + 10,
					b'A'..=b'F' => b - b'A' + 10,
					_ => {
						terminated = true;
						break 'scan;
					}
				};
				if value & 0xF000_0000_0000_0000 != 0 {
					let text: String = self.bytes()
						.take(seen + 1)
						.map(char::from)
						.collect();
					return Err(Error::Overflow(text));
				}
				value = value << 4 | digit as u64;
				seen += 1;
			}
		}

		if seen == 0 {
			debug_assert!(terminated);
			return Err(Error::IllegalArgument("expected a hexadecimal digit"));
		}

		self.skip(seen)?;
		Ok(value)
	}

	/// Returns the index of the first `byte` in `[from, to)`, seeking
	/// across segments without consuming. `to` is clamped to the buffer
	/// size.
	pub fn index_of(&self, byte: u8, from: usize, to: usize) -> Option<usize> {
		let to = min(to, self.size);
		if from >= to {
			return None;
		}

		let mut base = 0;
		for seg in &self.segments {
			if base >= to { break }
			let data = seg.data();
			let end = base + data.len();
			if from < end {
				let lo = from.saturating_sub(base);
				let hi = min(data.len(), to - base);
				if let Some(i) = data[lo..hi].iter().position(|&b| b == byte) {
					return Some(base + lo + i);
				}
			}
			base = end;
		}
		None
	}

	/// Returns the index of the first byte in `targets` at or past `from`.
	pub fn index_of_element(&self, targets: &[u8], from: usize) -> Option<usize> {
		let mut base = 0;
		for seg in &self.segments {
			let data = seg.data();
			let end = base + data.len();
			if from < end {
				let lo = from.saturating_sub(base);
				if let Some(i) = data[lo..].iter().position(|b| targets.contains(b)) {
					return Some(base + lo + i);
				}
			}
			base = end;
		}
		None
	}

	/// Returns the index of the first occurrence of `needle` at or past
	/// `from`, matching across segment boundaries.
	///
	/// Panics if `needle` is empty.
	pub fn index_of_bytes(&self, needle: &[u8], from: usize) -> Option<usize> {
		assert!(!needle.is_empty(), "needle must be non-empty");
		let last = self.size.checked_sub(needle.len())?;

		let mut i = from;
		while i <= last {
			let candidate = self.index_of(needle[0], i, last + 1)?;
			if self.range_equals(candidate, needle) {
				return Some(candidate);
			}
			i = candidate + 1;
		}
		None
	}

	/// Returns `true` if the bytes at `offset` equal `bytes`. Out-of-range
	/// comparisons are `false`, never an error.
	pub fn range_equals(&self, offset: usize, bytes: &[u8]) -> bool {
		if offset.checked_add(bytes.len()).map_or(true, |end| end > self.size) {
			return false;
		}
		let mut matches = true;
		let mut i = 0;
		self.visit_range(offset, bytes.len(), |chunk| {
			if chunk != &bytes[i..i + chunk.len()] {
				matches = false;
			}
			i += chunk.len();
		});
		matches
	}
}

impl Source for Buffer {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		let n = min(byte_count, self.size);
		sink.write(self, n)?;
		Ok(n)
	}
}

impl BufSource for Buffer {
	fn request(&mut self, byte_count: usize) -> Result<bool> {
		Ok(self.size >= byte_count)
	}
}
