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

//! Immutable byte strings. A byte string is either *dense*, owning one
//! contiguous allocation, or *segment-backed*, sharing the blocks of the
//! buffer it was snapshotted from. Both forms behave identically; the
//! segment-backed form makes [`Buffer::snapshot`][] free of copying.
//!
//! [`Buffer::snapshot`]: crate::Buffer::snapshot

mod encoding;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter;
use std::sync::Arc;
use digest::Digest;
use md5::Md5;
use once_cell::sync::OnceCell;
use simdutf8::compat::from_utf8;
use crate::segment::{Segment, SIZE};
use crate::utf8;

/// An immutable sequence of bytes with cached UTF-8 and hash forms.
#[derive(Clone, Default)]
pub struct ByteString {
	repr: Repr,
	utf8: OnceCell<String>,
	hash: OnceCell<u64>,
}

#[derive(Clone)]
enum Repr {
	Dense(Box<[u8]>),
	Segmented {
		blocks: Box<[Arc<[u8; SIZE]>]>,
		/// Entry `i` holds the cumulative byte count through block `i` and
		/// the block-internal offset where block `i`'s bytes begin. Binary
		/// search over the cumulative counts locates any index's block.
		directory: Box<[(usize, usize)]>,
	},
}

impl Default for Repr {
	fn default() -> Self { Self::Dense(Box::default()) }
}

impl ByteString {
	/// Creates an empty byte string.
	pub fn new() -> Self { Self::default() }

	fn dense(data: Box<[u8]>) -> Self {
		Self { repr: Repr::Dense(data), utf8: OnceCell::new(), hash: OnceCell::new() }
	}

	/// Builds a segment-backed byte string from shared segment handles.
	pub(crate) fn from_shared_segments(
		segments: impl Iterator<Item = Segment>,
		len: usize,
	) -> Self {
		let mut blocks = Vec::new();
		let mut directory = Vec::new();
		let mut total = 0;
		for seg in segments {
			if seg.is_empty() { continue }
			let (block, pos, limit) = seg.share_block();
			total += limit - pos;
			blocks.push(block);
			directory.push((total, pos));
		}
		debug_assert_eq!(total, len);

		if blocks.is_empty() {
			return Self::new();
		}
		Self {
			repr: Repr::Segmented {
				blocks: blocks.into_boxed_slice(),
				directory: directory.into_boxed_slice(),
			},
			utf8: OnceCell::new(),
			hash: OnceCell::new(),
		}
	}

	/// Returns the length in bytes.
	pub fn len(&self) -> usize {
		match &self.repr {
			Repr::Dense(data) => data.len(),
			Repr::Segmented { directory, .. } =>
				directory.last().map_or(0, |&(cum, _)| cum),
		}
	}

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// Returns the byte at `index`, or `None` out of bounds.
	pub fn get(&self, index: usize) -> Option<u8> {
		match &self.repr {
			Repr::Dense(data) => data.get(index).copied(),
			Repr::Segmented { blocks, directory } => {
				if index >= self.len() {
					return None;
				}
				let i = directory.partition_point(|&(cum, _)| cum <= index);
				let block_start = if i == 0 { 0 } else { directory[i - 1].0 };
				let (_, off) = directory[i];
				Some(blocks[i][off + index - block_start])
			}
		}
	}

	/// Returns the contiguous byte chunks, in order.
	pub(crate) fn chunks(&self) -> Chunks<'_> {
		match &self.repr {
			Repr::Dense(data) => Chunks::Dense(iter::once(data.as_ref())),
			Repr::Segmented { blocks, directory } => Chunks::Segmented {
				blocks,
				directory,
				index: 0,
				prev_cum: 0,
			},
		}
	}

	pub(crate) fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
		self.chunks().flatten().copied()
	}

	fn as_contiguous(&self) -> Cow<'_, [u8]> {
		match &self.repr {
			Repr::Dense(data) => Cow::Borrowed(data),
			Repr::Segmented { .. } => Cow::Owned(self.to_vec()),
		}
	}

	/// Copies the content into a vector.
	pub fn to_vec(&self) -> Vec<u8> {
		let mut vec = Vec::with_capacity(self.len());
		for chunk in self.chunks() {
			vec.extend_from_slice(chunk);
		}
		vec
	}

	/// Decodes the content as UTF-8, substituting the replacement character
	/// for malformed sequences. The decoding is computed once and cached.
	pub fn utf8(&self) -> &str {
		self.utf8.get_or_init(||
			utf8::decode_lossy(&self.as_contiguous()).into_owned()
		)
	}

	/// The cached content hash code, stable across representations.
	pub(crate) fn hash_code(&self) -> u64 {
		*self.hash.get_or_init(|| {
			let mut h = 0u64;
			for b in self.bytes() {
				h = h.wrapping_mul(31).wrapping_add(b as u64);
			}
			h
		})
	}

	/// Returns a dense copy of the bytes in `[start, end)`.
	///
	/// Panics when the range is out of bounds.
	pub fn substring(&self, start: usize, end: usize) -> ByteString {
		assert!(start <= end && end <= self.len(), "substring out of bounds");
		match &self.repr {
			Repr::Dense(data) => data[start..end].into(),
			Repr::Segmented { .. } => {
				self.bytes()
					.skip(start)
					.take(end - start)
					.collect::<Vec<u8>>()
					.into()
			}
		}
	}

	pub fn starts_with(&self, prefix: &[u8]) -> bool {
		self.range_equals(0, prefix)
	}

	pub fn ends_with(&self, suffix: &[u8]) -> bool {
		self.len() >= suffix.len()
			&& self.range_equals(self.len() - suffix.len(), suffix)
	}

	/// Returns `true` if the bytes at `offset` equal `bytes`. Out-of-range
	/// comparisons are `false`.
	pub fn range_equals(&self, offset: usize, bytes: &[u8]) -> bool {
		offset.checked_add(bytes.len()).map_or(false, |end| end <= self.len())
			&& self.bytes()
				.skip(offset)
				.take(bytes.len())
				.eq(bytes.iter().copied())
	}

	/// Returns the index of the first occurrence of `needle` at or past
	/// `from`, or `None`. An empty needle matches immediately.
	pub fn index_of(&self, needle: &[u8], from: usize) -> Option<usize> {
		if needle.is_empty() {
			return (from <= self.len()).then_some(from);
		}
		let last = self.len().checked_sub(needle.len())?;
		(from..=last).find(|&i| self.range_equals(i, needle))
	}

	/// Feeds the content to `digest` and returns the resulting hash.
	pub fn digest<D: Digest>(&self, mut digest: D) -> ByteString {
		for chunk in self.chunks() {
			digest.update(chunk);
		}
		digest.finalize().as_slice().into()
	}

	/// Computes an MD5 checksum. Broken for cryptography; checksums only.
	pub fn md5(&self) -> ByteString {
		self.digest(Md5::new())
	}

	/// Returns shared segment handles over this byte string's blocks, or
	/// `None` for a dense byte string.
	pub(crate) fn shared_segments(&self) -> Option<Vec<Segment>> {
		match &self.repr {
			Repr::Dense(_) => None,
			Repr::Segmented { blocks, directory } => {
				let mut prev_cum = 0;
				let segments = blocks.iter()
					.zip(directory.iter())
					.map(|(block, &(cum, off))| {
						let len = cum - prev_cum;
						prev_cum = cum;
						Segment::from_block(Arc::clone(block), off, off + len)
					})
					.collect();
				Some(segments)
			}
		}
	}

	/// Returns the number of shared blocks, zero for a dense byte string.
	#[doc(hidden)]
	pub fn block_count(&self) -> usize {
		match &self.repr {
			Repr::Dense(_) => 0,
			Repr::Segmented { blocks, .. } => blocks.len(),
		}
	}
}

pub(crate) enum Chunks<'a> {
	Dense(iter::Once<&'a [u8]>),
	Segmented {
		blocks: &'a [Arc<[u8; SIZE]>],
		directory: &'a [(usize, usize)],
		index: usize,
		prev_cum: usize,
	},
}

impl<'a> Iterator for Chunks<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<&'a [u8]> {
		match self {
			Chunks::Dense(iter) => iter.next(),
			Chunks::Segmented { blocks, directory, index, prev_cum } => {
				let &(cum, off) = directory.get(*index)?;
				let chunk = &blocks[*index][off..off + cum - *prev_cum];
				*index += 1;
				*prev_cum = cum;
				Some(chunk)
			}
		}
	}
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len() && self.bytes().eq(other.bytes())
	}
}

impl Eq for ByteString {}

impl PartialEq<[u8]> for ByteString {
	fn eq(&self, other: &[u8]) -> bool {
		self.len() == other.len() && self.bytes().eq(other.iter().copied())
	}
}

impl PartialEq<&[u8]> for ByteString {
	fn eq(&self, other: &&[u8]) -> bool { self == *other }
}

impl<const N: usize> PartialEq<[u8; N]> for ByteString {
	fn eq(&self, other: &[u8; N]) -> bool { self == other.as_slice() }
}

impl PartialEq<str> for ByteString {
	fn eq(&self, other: &str) -> bool { self == other.as_bytes() }
}

impl PartialEq<&str> for ByteString {
	fn eq(&self, other: &&str) -> bool { self == other.as_bytes() }
}

/// Unsigned lexicographic order, as the bytes compare.
impl Ord for ByteString {
	fn cmp(&self, other: &Self) -> Ordering {
		self.bytes().cmp(other.bytes())
	}
}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Hash for ByteString {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.hash_code());
	}
}

impl fmt::Display for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			return write!(f, "[size=0]");
		}
		if self.len() <= 64 {
			let bytes = self.as_contiguous();
			return match from_utf8(&bytes) {
				Ok(text) => write!(f, "[text={text}]"),
				Err(_) => write!(f, "[hex={}]", base16ct::lower::encode_string(&bytes)),
			};
		}
		write!(f, "[size={} md5={}]", self.len(), self.md5().hex())
	}
}

impl fmt::Debug for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl From<Vec<u8>> for ByteString {
	fn from(data: Vec<u8>) -> Self {
		Self::dense(data.into_boxed_slice())
	}
}

impl From<Box<[u8]>> for ByteString {
	fn from(data: Box<[u8]>) -> Self {
		Self::dense(data)
	}
}

impl From<&[u8]> for ByteString {
	fn from(data: &[u8]) -> Self {
		Self::dense(data.into())
	}
}

impl<const N: usize> From<[u8; N]> for ByteString {
	fn from(data: [u8; N]) -> Self {
		data.as_slice().into()
	}
}

impl From<&str> for ByteString {
	fn from(data: &str) -> Self {
		data.as_bytes().into()
	}
}

impl From<String> for ByteString {
	fn from(data: String) -> Self {
		data.into_bytes().into()
	}
}

impl FromIterator<u8> for ByteString {
	fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
		iter.into_iter().collect::<Vec<_>>().into()
	}
}

#[cfg(test)]
mod test {
	use quickcheck_macros::quickcheck;
	use super::*;

	#[quickcheck]
	fn dense_round_trip(data: Vec<u8>) {
		let bs = ByteString::from(data.clone());
		assert_eq!(bs.len(), data.len());
		assert_eq!(bs.to_vec(), data);
		assert_eq!(bs, *data);
	}

	#[quickcheck]
	fn hash_is_content_based(data: Vec<u8>) {
		let a = ByteString::from(data.clone());
		let b = ByteString::from(data);
		assert_eq!(a.hash_code(), b.hash_code());
	}

	#[test]
	fn utf8_caches_replacement() {
		let bs = ByteString::from(&b"ab\xFFcd"[..]);
		assert_eq!(bs.utf8(), "ab\u{FFFD}cd");
		assert_eq!(bs.utf8(), "ab\u{FFFD}cd");
	}

	#[test]
	fn ordering_is_unsigned() {
		let lo = ByteString::from(&b"\x01"[..]);
		let hi = ByteString::from(&b"\xFF"[..]);
		assert!(lo < hi);
	}

	#[test]
	fn substring_and_search() {
		let bs = ByteString::from("hello world");
		assert_eq!(bs.substring(6, 11), "world");
		assert_eq!(bs.index_of(b"o w", 0), Some(4));
		assert_eq!(bs.index_of(b"o", 5), Some(7));
		assert!(bs.starts_with(b"hello"));
		assert!(bs.ends_with(b"world"));
	}
}
