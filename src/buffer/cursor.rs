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
use crate::{Buffer, Error, Result};
use crate::pool;
use crate::segment::SIZE;

/// A cursor over a buffer's segments, exposing the bytes of one segment at
/// a time. The cursor borrows its buffer mutably for its whole life, so no
/// other path can touch the buffer while the cursor is live.
///
/// A read-write cursor forks a shared segment the first time it seeks into
/// it, so the bytes it exposes are always safe to mutate.
pub struct BufferCursor<'a> {
	buffer: &'a mut Buffer,
	read_write: bool,
	position: Option<Position>,
}

#[derive(Copy, Clone)]
struct Position {
	/// Segment index, `segments.len()` when past the last byte.
	index: usize,
	/// Absolute offset of the segment's first byte.
	seg_start: usize,
	/// Absolute cursor offset.
	offset: usize,
}

impl Buffer {
	/// Returns a read-only cursor positioned before the first segment.
	pub fn cursor(&mut self) -> BufferCursor<'_> {
		BufferCursor { buffer: self, read_write: false, position: None }
	}

	/// Returns a read-write cursor positioned before the first segment.
	pub fn cursor_mut(&mut self) -> BufferCursor<'_> {
		BufferCursor { buffer: self, read_write: true, position: None }
	}
}

impl BufferCursor<'_> {
	/// Returns the cursor's absolute offset, or `None` before the first
	/// seek.
	pub fn offset(&self) -> Option<usize> {
		self.position.map(|p| p.offset)
	}

	/// Repositions the cursor at `offset`, returning the number of bytes
	/// readable there, or `None` when `offset` is the buffer size.
	pub fn seek(&mut self, offset: usize) -> Result<Option<usize>> {
		if offset > self.buffer.len() {
			return Err(Error::IllegalArgument("seek past the end of the buffer"));
		}
		if offset == self.buffer.len() {
			self.position = Some(Position {
				index: self.buffer.segments.len(),
				seg_start: offset,
				offset,
			});
			return Ok(None);
		}

		let mut seg_start = 0;
		let mut found = None;
		for (index, seg) in self.buffer.segments.iter().enumerate() {
			let len = seg.len();
			if offset < seg_start + len {
				found = Some((index, seg_start, len));
				break;
			}
			seg_start += len;
		}
		let (index, seg_start, len) = found.expect("offset is within the buffer");

		if self.read_write {
			self.buffer.segments[index].fork();
		}
		self.position = Some(Position { index, seg_start, offset });
		Ok(Some(seg_start + len - offset))
	}

	/// Advances to the start of the next segment, returning the bytes
	/// readable there, or `None` once past the last segment. Before the
	/// first seek this positions at offset zero.
	pub fn next(&mut self) -> Result<Option<usize>> {
		match self.position {
			None => self.seek(0),
			Some(p) => {
				if p.offset >= self.buffer.len() {
					return Ok(None);
				}
				let seg_len = self.buffer.segments[p.index].len();
				self.seek(p.seg_start + seg_len)
			}
		}
	}

	/// Returns the readable bytes from the cursor to the end of its
	/// segment. Empty before the first seek and past the last segment.
	pub fn data(&self) -> &[u8] {
		match self.position {
			Some(p) if p.index < self.buffer.segments.len() => {
				&self.buffer.segments[p.index].data()[p.offset - p.seg_start..]
			}
			_ => &[],
		}
	}

	/// Like [`data`][], mutable. Fails on a read-only cursor.
	///
	/// [`data`]: Self::data
	pub fn data_mut(&mut self) -> Result<&mut [u8]> {
		if !self.read_write {
			return Err(Error::IllegalState("cursor is read-only"));
		}
		match self.position {
			Some(p) if p.index < self.buffer.segments.len() => {
				Ok(&mut self.buffer.segments[p.index].data_mut()[p.offset - p.seg_start..])
			}
			_ => Ok(&mut []),
		}
	}

	/// Grows the buffer by at least `min_byte_count` bytes of undefined
	/// content at the tail, at most one segment's worth, and seeks to the
	/// start of the added range. Returns the number of bytes added.
	pub fn expand(&mut self, min_byte_count: usize) -> Result<usize> {
		if !self.read_write {
			return Err(Error::IllegalState("cursor is read-only"));
		}
		if min_byte_count == 0 || min_byte_count > SIZE {
			return Err(Error::IllegalArgument("expand count must be within one segment"));
		}

		let old_size = self.buffer.len();
		let added = {
			let tail = self.buffer.writable_segment(min_byte_count);
			let added = tail.free_len();
			tail.add(added);
			added
		};
		self.buffer.size += added;
		self.seek(old_size)?;
		Ok(added)
	}

	/// Resizes the buffer. Shrinking trims tail segments; growing appends
	/// capacity with undefined content. The cursor is repositioned at its
	/// old offset, clamped to the new size.
	pub fn resize(&mut self, new_size: usize) -> Result {
		if !self.read_write {
			return Err(Error::IllegalState("cursor is read-only"));
		}

		let old_size = self.buffer.len();
		if new_size < old_size {
			let mut excess = old_size - new_size;
			while excess > 0 {
				let tail = self.buffer.segments
					.back_mut()
					.expect("segments remain while shrinking");
				let len = tail.len();
				if len <= excess {
					let seg = self.buffer.segments.pop_back().expect("tail exists");
					pool::recycle(seg);
					excess -= len;
				} else {
					tail.set_len(len - excess);
					excess = 0;
				}
			}
			self.buffer.size = new_size;
		} else {
			let mut needed = new_size - old_size;
			while needed > 0 {
				let added = {
					let tail = self.buffer.writable_segment(1);
					let n = min(needed, tail.free_len());
					tail.add(n);
					n
				};
				self.buffer.size += added;
				needed -= added;
			}
		}

		if let Some(p) = self.position {
			self.seek(min(p.offset, new_size))?;
		}
		Ok(())
	}
}
