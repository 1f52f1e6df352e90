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

//! The segmented buffer: a FIFO of fixed-size byte segments that is both a
//! readable source and a writable sink. Bytes enter at the tail segment and
//! leave from the head. Moves between buffers transfer whole segments where
//! possible, falling back to copy-on-share splits, so plain IO between
//! buffers is almost zero-cost.

mod cursor;
mod read;
mod write;

pub use cursor::*;

use std::cmp::min;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use md5::{Digest, Md5};
use simdutf8::compat::from_utf8;
use crate::{ByteString, Error, Result};
use crate::pool;
use crate::segment::{Segment, SHARE_MINIMUM, SIZE};

/// A queue of byte segments, readable at the head and writable at the tail.
///
/// A buffer is single-owner: it is not synchronized, and two threads must
/// not touch the same buffer at once. Two buffers may share the memory
/// behind their segments; shared blocks are read-only and fork on write.
#[derive(Default)]
pub struct Buffer {
	segments: VecDeque<Segment>,
	size: usize,
}

impl Buffer {
	/// Creates an empty buffer.
	pub fn new() -> Self { Self::default() }

	/// Returns the number of readable bytes.
	pub fn len(&self) -> usize { self.size }

	pub fn is_empty(&self) -> bool { self.size == 0 }

	/// Discards all readable bytes, returning their segments to the pool.
	pub fn clear(&mut self) {
		self.size = 0;
		for seg in self.segments.drain(..) {
			pool::recycle(seg);
		}
	}

	/// Consumes `byte_count` bytes from the head. Consumes everything and
	/// returns an end-of-stream error if fewer are available.
	pub fn skip(&mut self, mut byte_count: usize) -> Result {
		while byte_count > 0 {
			if self.segments.front().is_none() {
				return Err(Error::Eof);
			}
			let n = min(byte_count, self.head_len());
			self.consume_from_head(n);
			byte_count -= n;
		}
		Ok(())
	}

	/// Returns the byte at `index`, or `None` past the end. Does not consume.
	pub fn get(&self, mut index: usize) -> Option<u8> {
		if index >= self.size { return None }
		for seg in &self.segments {
			let data = seg.data();
			if index < data.len() {
				return Some(data[index]);
			}
			index -= data.len();
		}
		None
	}

	/// Copies `byte_count` bytes at `offset` into `out` without consuming
	/// them. Ranges of a segment at least [`SHARE_MINIMUM`] long are shared
	/// with `out` rather than copied.
	pub fn copy_to(&self, out: &mut Buffer, offset: usize, byte_count: usize) -> Result {
		let end = offset.checked_add(byte_count)
			.ok_or(Error::IllegalArgument("range overflow"))?;
		if end > self.size {
			return Err(Error::IllegalArgument("range out of bounds"));
		}

		let mut offset = offset;
		let mut remaining = byte_count;
		for seg in &self.segments {
			if remaining == 0 { break }
			let len = seg.len();
			if offset >= len {
				offset -= len;
				continue;
			}

			let take = min(len - offset, remaining);
			if take >= SHARE_MINIMUM {
				let mut shared = seg.share_all();
				shared.consume(offset);
				shared.set_len(take);
				out.push_segment(shared);
			} else {
				out.write_slice(&seg.data()[offset..offset + take]);
			}
			offset = 0;
			remaining -= take;
		}
		Ok(())
	}

	/// Returns an immutable byte string of all readable bytes. The string
	/// shares this buffer's segments; later reads and writes here do not
	/// change it.
	pub fn snapshot(&self) -> ByteString {
		if self.is_empty() {
			return ByteString::new();
		}
		ByteString::from_shared_segments(
			self.segments.iter().map(Segment::share_all),
			self.size,
		)
	}

	/// Returns an immutable byte string of the first `byte_count` readable
	/// bytes. Small prefixes collapse to a dense byte string.
	pub fn snapshot_prefix(&self, byte_count: usize) -> Result<ByteString> {
		if byte_count > self.size {
			return Err(Error::IllegalArgument("snapshot longer than buffer"));
		}
		if byte_count == 0 {
			return Ok(ByteString::new());
		}
		if byte_count < SHARE_MINIMUM {
			let mut bytes = Vec::with_capacity(byte_count);
			self.visit_range(0, byte_count, |chunk| bytes.extend_from_slice(chunk));
			return Ok(bytes.into());
		}

		let mut remaining = byte_count;
		let mut shared = Vec::new();
		for seg in &self.segments {
			if remaining == 0 { break }
			let mut seg = seg.share_all();
			if seg.len() > remaining {
				seg.set_len(remaining);
			}
			remaining -= seg.len();
			shared.push(seg);
		}
		Ok(ByteString::from_shared_segments(shared.into_iter(), byte_count))
	}

	/// Returns the sizes of this buffer's segments, oldest first.
	#[doc(hidden)]
	pub fn segment_sizes(&self) -> Vec<usize> {
		self.segments.iter().map(Segment::len).collect()
	}

	// Segment plumbing, used by the read/write halves, the cursor, and the
	// stream wrappers.

	pub(crate) fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
		self.segments.iter().map(Segment::data)
	}

	pub(crate) fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
		self.chunks().flatten().copied()
	}

	/// Calls `visit` with each chunk of the byte range `[offset,
	/// offset + byte_count)`, in order. The range must be in bounds.
	pub(crate) fn visit_range(
		&self,
		mut offset: usize,
		mut byte_count: usize,
		mut visit: impl FnMut(&[u8]),
	) {
		debug_assert!(offset + byte_count <= self.size);
		for seg in &self.segments {
			if byte_count == 0 { break }
			let data = seg.data();
			if offset >= data.len() {
				offset -= data.len();
				continue;
			}
			let window = &data[offset..min(data.len(), offset + byte_count)];
			byte_count -= window.len();
			offset = 0;
			visit(window);
		}
	}

	/// Returns a tail segment with at least `min_free` writable bytes,
	/// claiming a new one from the pool if the current tail is full or
	/// shared.
	pub(crate) fn writable_segment(&mut self, min_free: usize) -> &mut Segment {
		debug_assert!(min_free >= 1 && min_free <= SIZE);
		let needs_new = self.segments
			.back()
			.map_or(true, |tail| tail.free_len() < min_free);
		if needs_new {
			self.segments.push_back(pool::take());
		}
		self.segments.back_mut().expect("a tail segment was just ensured")
	}

	/// Records `byte_count` bytes written into the tail's free space. With
	/// nothing written, an empty tail left over from [`writable_segment`][]
	/// goes back to the pool.
	///
	/// [`writable_segment`]: Self::writable_segment
	pub(crate) fn commit_tail(&mut self, byte_count: usize) {
		let Some(tail) = self.segments.back_mut() else { return };
		if byte_count > 0 {
			tail.add(byte_count);
			self.size += byte_count;
		} else if tail.is_empty() {
			let seg = self.segments.pop_back().expect("tail exists");
			pool::recycle(seg);
		}
	}

	/// Returns the byte count of all full segments. A partial, unshared
	/// tail is excluded; it can still grow in place.
	pub(crate) fn complete_segment_bytes(&self) -> usize {
		let mut result = self.size;
		if let Some(tail) = self.segments.back() {
			if tail.limit() < SIZE && !tail.is_shared() {
				result -= tail.len();
			}
		}
		result
	}

	pub(crate) fn head_len(&self) -> usize {
		self.segments.front().map_or(0, Segment::len)
	}

	/// Returns the head segment's readable bytes, capped to `max`.
	pub(crate) fn head_data(&self, max: usize) -> &[u8] {
		match self.segments.front() {
			Some(head) => &head.data()[..min(max, head.len())],
			None => &[],
		}
	}

	/// Consumes bytes from the head segment, recycling it once exhausted.
	pub(crate) fn consume_from_head(&mut self, byte_count: usize) {
		if byte_count == 0 { return }
		let head = self.segments.front_mut().expect("head segment exists");
		head.consume(byte_count);
		self.size -= byte_count;
		if head.is_empty() {
			let seg = self.segments.pop_front().expect("head exists");
			pool::recycle(seg);
		}
	}

	/// Appends a segment taken from another buffer or a shared split,
	/// merging it into the tail when its bytes fit in the tail's spare
	/// capacity.
	pub(crate) fn push_segment(&mut self, mut seg: Segment) {
		debug_assert!(!seg.is_empty());
		self.size += seg.len();
		if let Some(tail) = self.segments.back_mut() {
			if !tail.is_shared() && seg.len() <= SIZE - tail.limit() + tail.pos() {
				if seg.len() > SIZE - tail.limit() {
					tail.shift();
				}
				seg.move_into(tail, seg.len());
				pool::recycle(seg);
				return;
			}
		}
		self.segments.push_back(seg);
	}

	pub(crate) fn pop_head(&mut self) -> Option<Segment> {
		let seg = self.segments.pop_front()?;
		self.size -= seg.len();
		Some(seg)
	}
}

impl Drop for Buffer {
	fn drop(&mut self) {
		self.clear();
	}
}

/// Copies the buffer by sharing every segment. Writes to either buffer
/// afterward fork the touched block and leave the other unchanged.
impl Clone for Buffer {
	fn clone(&self) -> Self {
		let mut out = Self::new();
		out.segments.extend(self.segments.iter().map(Segment::share_all));
		out.size = self.size;
		out
	}
}

/// Content equality, independent of how the bytes split into segments.
impl PartialEq for Buffer {
	fn eq(&self, other: &Self) -> bool {
		self.size == other.size && self.bytes().eq(other.bytes())
	}
}

impl Eq for Buffer {}

/// Content hashing, independent of segment layout.
impl Hash for Buffer {
	fn hash<H: Hasher>(&self, state: &mut H) {
		for b in self.bytes() {
			state.write_u8(b);
		}
	}
}

impl fmt::Display for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			return write!(f, "[size=0]");
		}
		if self.size <= 64 {
			let bytes: Vec<u8> = self.bytes().collect();
			return match from_utf8(&bytes) {
				Ok(text) => write!(f, "[text={text}]"),
				Err(_) => write!(f, "[hex={}]", base16ct::lower::encode_string(&bytes)),
			};
		}

		let mut md5 = Md5::new();
		for chunk in self.chunks() {
			md5.update(chunk);
		}
		write!(
			f,
			"[size={} md5={}]",
			self.size,
			base16ct::lower::encode_string(md5.finalize().as_slice()),
		)
	}
}

impl fmt::Debug for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl From<&[u8]> for Buffer {
	fn from(value: &[u8]) -> Self {
		let mut buf = Self::new();
		buf.write_slice(value);
		buf
	}
}

impl From<&str> for Buffer {
	fn from(value: &str) -> Self {
		value.as_bytes().into()
	}
}
