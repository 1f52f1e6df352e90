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

//! Hex and Base64 codecs for [`ByteString`]. Encoding goes through the
//! `base64` and `base16ct` engines. Base64 decoding is deliberately
//! lenient: it accepts both the standard and URL alphabets in one input,
//! skips ASCII whitespace, tolerates excess `=` padding, and answers junk
//! input with `None` rather than an error.

use base64::Engine;
use base64::prelude::{BASE64_STANDARD, BASE64_URL_SAFE};
use crate::{Error, Result};
use super::ByteString;

impl ByteString {
	/// Encodes the content as lowercase hex.
	pub fn hex(&self) -> String {
		base16ct::lower::encode_string(&self.as_contiguous())
	}

	/// Decodes a hex string, accepting both digit cases. Odd-length or
	/// non-hex input is an error.
	pub fn decode_hex(hex: &str) -> Result<ByteString> {
		base16ct::mixed::decode_vec(hex)
			.map(Into::into)
			.map_err(|_| Error::IllegalArgument("invalid hex"))
	}

	/// Encodes the content as Base64 with the standard alphabet.
	pub fn base64(&self) -> String {
		BASE64_STANDARD.encode(self.as_contiguous())
	}

	/// Encodes the content as Base64 with the URL-safe alphabet.
	pub fn base64_url(&self) -> String {
		BASE64_URL_SAFE.encode(self.as_contiguous())
	}

	/// Decodes a Base64 string in either alphabet, skipping ASCII
	/// whitespace and tolerating missing or excess padding. Returns `None`
	/// for any other byte, and for a dangling symbol that encodes fewer
	/// than eight bits.
	pub fn decode_base64(encoded: &str) -> Option<ByteString> {
		let mut out = Vec::with_capacity(encoded.len() / 4 * 3 + 2);
		let mut word = 0u32;
		let mut count = 0u32;

		for &b in encoded.as_bytes() {
			let bits = match b {
				b'A'..=b'Z' => b - b'A',
				b'a'..=b'z' => b - b'a' + 26,
				b'0'..=b'9' => b - b'0' + 52,
				b'+' | b'-' => 62,
				b'/' | b'_' => 63,
				// Padding ends the payload; anything after is ignored.
				b'=' => break,
				b'\n' | b'\r' | b' ' | b'\t' => continue,
				_ => return None,
			};
			word = word << 6 | bits as u32;
			count += 1;
			if count == 4 {
				out.push((word >> 16) as u8);
				out.push((word >> 8) as u8);
				out.push(word as u8);
				word = 0;
				count = 0;
			}
		}

		match count {
			0 => {}
			1 => return None,
			2 => {
				word <<= 12;
				out.push((word >> 16) as u8);
			}
			3 => {
				word <<= 6;
				out.push((word >> 16) as u8);
				out.push((word >> 8) as u8);
			}
			_ => unreachable!("words flush at four symbols"),
		}
		Some(out.into())
	}
}

#[cfg(test)]
mod test {
	use quickcheck_macros::quickcheck;
	use super::*;

	#[quickcheck]
	fn hex_round_trip(data: Vec<u8>) {
		let bs = ByteString::from(data);
		assert_eq!(ByteString::decode_hex(&bs.hex()).unwrap(), bs);
	}

	#[quickcheck]
	fn base64_round_trip(data: Vec<u8>) {
		let bs = ByteString::from(data);
		assert_eq!(ByteString::decode_base64(&bs.base64()).unwrap(), bs);
		assert_eq!(ByteString::decode_base64(&bs.base64_url()).unwrap(), bs);
	}

	#[test]
	fn decode_hex_rejects() {
		assert!(ByteString::decode_hex("abc").is_err(), "odd length");
		assert!(ByteString::decode_hex("zz").is_err(), "non-hex");
	}

	#[test]
	fn decode_base64_is_lenient() {
		// Mixed alphabets in one input.
		let mixed = ByteString::decode_base64("+_-/").unwrap();
		assert_eq!(mixed, *b"\xFB\xFF\xBF");
		// Bytes after the padding are ignored.
		assert_eq!(ByteString::decode_base64("+w==_w==").unwrap(), *b"\xFB");
		// Whitespace is skipped.
		assert_eq!(
			ByteString::decode_base64("aGVs\nbG8g d29y\r\nbGQ=").unwrap(),
			"hello world",
		);
		// Excess padding is tolerated.
		assert_eq!(ByteString::decode_base64("aGk===").unwrap(), "hi");
		// Junk is a None, not an error.
		assert!(ByteString::decode_base64("a*c").is_none());
		assert!(ByteString::decode_base64("a").is_none());
	}
}
