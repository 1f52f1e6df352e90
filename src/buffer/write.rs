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

use crate::{Buffer, ByteString, Error, Result};
use crate::segment::{SHARE_MINIMUM, SIZE};
use crate::streams::{BufSink, BufStream, Sink};
use crate::utf8;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

macro_rules! gen_int_writes {
	($($name:ident $le_name:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!("Appends one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self, value: $ty) -> &mut Self {
			self.write_slice(&value.to_be_bytes())
		}

		#[doc = concat!("Appends one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self, value: $ty) -> &mut Self {
			self.write_slice(&value.to_le_bytes())
		}
		)+
	};
}

impl Buffer {
	/// Appends one byte.
	pub fn write_u8(&mut self, value: u8) -> &mut Self {
		let tail = self.writable_segment(1);
		tail.free_space_mut()[0] = value;
		tail.add(1);
		self.size += 1;
		self
	}

	/// Appends one signed byte.
	pub fn write_i8(&mut self, value: i8) -> &mut Self {
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

	/// Appends a byte slice, filling the tail segment before claiming a new
	/// one from the pool.
	pub fn write_slice(&mut self, mut bytes: &[u8]) -> &mut Self {
		while !bytes.is_empty() {
			let n = self.writable_segment(1).write_slice(bytes);
			self.size += n;
			bytes = &bytes[n..];
		}
		self
	}

	/// Appends a string as UTF-8.
	pub fn write_str(&mut self, value: &str) -> &mut Self {
		self.write_slice(value.as_bytes())
	}

	/// Appends one code point as UTF-8, from one to four bytes. Surrogate
	/// code points and values above `0x10FFFF` are rejected.
	pub fn write_utf8_code_point(&mut self, code_point: u32) -> Result<&mut Self> {
		let (buf, len) = utf8::encode_code_point(code_point)?;
		Ok(self.write_slice(&buf[..len]))
	}

	/// Appends a UTF-16 code unit sequence as UTF-8. A surrogate pair
	/// encodes as one supplementary code point; an unpaired surrogate
	/// encodes as `'?'`.
	pub fn write_utf16(&mut self, units: &[u16]) -> &mut Self {
		let mut i = 0;
		while i < units.len() {
			let (code_point, advance) = utf8::code_point_at(units, i);
			let (buf, len) = utf8::encode_code_point(code_point)
				.expect("paired code points are in range");
			self.write_slice(&buf[..len]);
			i += advance;
		}
		self
	}

	/// Appends a signed decimal in ASCII: a `-` for negative values, then
	/// the digits with no leading zeros.
	pub fn write_decimal_i64(&mut self, value: i64) -> &mut Self {
		if value == 0 {
			return self.write_u8(b'0');
		}
		if value == i64::MIN {
			// Its magnitude has no i64 counterpart.
			return self.write_str("-9223372036854775808");
		}

		let negative = value < 0;
		let mut v = value.unsigned_abs();
		let width = (v.ilog10() + 1) as usize + negative as usize;

		let tail = self.writable_segment(width);
		let space = tail.free_space_mut();
		let mut pos = width;
		while v > 0 {
			pos -= 1;
			space[pos] = b'0' + (v % 10) as u8;
			v /= 10;
		}
		if negative {
			space[0] = b'-';
		}
		tail.add(width);
		self.size += width;
		self
	}

	/// Appends an unsigned hexadecimal in lowercase ASCII, with no leading
	/// zeros.
	pub fn write_hexadecimal_u64(&mut self, value: u64) -> &mut Self {
		if value == 0 {
			return self.write_u8(b'0');
		}

		let width = (64 - value.leading_zeros() as usize + 3) / 4;

		let tail = self.writable_segment(width);
		let space = tail.free_space_mut();
		for (i, slot) in space[..width].iter_mut().enumerate() {
			let shift = (width - 1 - i) * 4;
			*slot = HEX_DIGITS[(value >> shift) as usize & 0xF];
		}
		tail.add(width);
		self.size += width;
		self
	}

	/// Appends a byte string. A dense byte string copies its payload; a
	/// segment-backed one transfers shared segments without copying.
	pub fn write_byte_string(&mut self, value: &ByteString) -> &mut Self {
		match value.shared_segments() {
			Some(segments) => {
				for seg in segments {
					self.push_segment(seg);
				}
			}
			None => {
				for chunk in value.chunks() {
					self.write_slice(chunk);
				}
			}
		}
		self
	}

	/// Moves `byte_count` bytes from the head of `source` to this buffer's
	/// tail. Whole segments transfer by relinking; a leading range of a
	/// segment transfers by splitting when at least [`SHARE_MINIMUM`] long,
	/// and by copying otherwise.
	pub fn write(&mut self, source: &mut Buffer, mut byte_count: usize) -> Result {
		if byte_count > source.size {
			return Err(Error::Eof);
		}

		while byte_count > 0 {
			if byte_count < source.head_len() {
				let fits_in_tail = self.segments.back().map_or(false, |tail|
					!tail.is_shared() && byte_count <= SIZE - tail.limit()
				);

				if fits_in_tail {
					// The whole range fits after the tail's bytes.
					let head = source.segments.front_mut().expect("source has bytes");
					let tail = self.segments.back_mut().expect("tail exists");
					let n = head.move_into(tail, byte_count);
					debug_assert_eq!(n, byte_count);
					source.size -= n;
					self.size += n;
				} else if byte_count < SHARE_MINIMUM {
					let mut remaining = byte_count;
					while remaining > 0 {
						let n = {
							let data = source.head_data(remaining);
							self.writable_segment(1).write_slice(data)
						};
						self.size += n;
						source.consume_from_head(n);
						remaining -= n;
					}
				} else {
					let head = source.segments.front_mut().expect("source has bytes");
					let prefix = head.split_to(byte_count);
					source.size -= byte_count;
					self.push_segment(prefix);
				}
				return Ok(());
			}

			let seg = source.pop_head().expect("source has bytes");
			byte_count -= seg.len();
			self.push_segment(seg);
		}
		Ok(())
	}
}

impl Sink for Buffer {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		Buffer::write(self, source, byte_count)
	}
}

impl BufSink for Buffer {}

impl BufStream for Buffer {
	fn buf(&self) -> &Buffer { self }
	fn buf_mut(&mut self) -> &mut Buffer { self }
}
