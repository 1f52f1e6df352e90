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
use std::sync::Arc;

/// The fixed segment capacity, in bytes.
pub const SIZE: usize = 8192;

/// Byte ranges smaller than this are copied between buffers rather than
/// shared. Sharing tiny ranges would pin whole blocks in memory and inhibit
/// segment compaction.
pub(crate) const SHARE_MINIMUM: usize = 1024;

type Block = [u8; SIZE];

/// A fixed-capacity byte block with a live-data window `[pos, limit)`. The
/// backing block may be shared between segments; shared blocks are
/// copy-on-write, forking into owned memory before the first mutation.
pub(crate) struct Segment {
	data: Arc<Block>,
	pos: usize,
	limit: usize,
}

impl Segment {
	/// Returns a new empty segment with freshly allocated memory.
	pub fn new() -> Self {
		Self {
			data: Arc::new([0; SIZE]),
			pos: 0,
			limit: 0,
		}
	}

	/// Returns the number of readable bytes, `limit - pos`.
	pub fn len(&self) -> usize { self.limit - self.pos }

	pub fn is_empty(&self) -> bool { self.pos == self.limit }

	/// Returns the read position within the block.
	pub fn pos(&self) -> usize { self.pos }

	/// Returns the write position within the block.
	pub fn limit(&self) -> usize { self.limit }

	/// Returns `true` if the backing block is referenced by another segment
	/// or byte string. Shared blocks must not be written.
	pub fn is_shared(&self) -> bool { Arc::strong_count(&self.data) > 1 }

	/// Returns the number of bytes that can be appended to this segment, or
	/// zero if the block is shared and thus read-only.
	pub fn free_len(&self) -> usize {
		if self.is_shared() { 0 } else { SIZE - self.limit }
	}

	/// Returns a slice of the readable bytes.
	pub fn data(&self) -> &[u8] { &self.data[self.pos..self.limit] }

	/// Returns a mutable slice of the readable bytes, forking the block into
	/// owned memory first if it is shared.
	pub fn data_mut(&mut self) -> &mut [u8] {
		self.fork();
		let Self { data, pos, limit } = self;
		let block = Arc::get_mut(data).expect(
			"block should be unique after fork"
		);
		&mut block[*pos..*limit]
	}

	/// Copies shared data into owned memory, preserving `pos` and `limit`.
	/// Has no effect on an unshared segment.
	pub fn fork(&mut self) {
		if self.is_shared() {
			let mut block = Box::new([0; SIZE]);
			block[self.pos..self.limit].copy_from_slice(self.data());
			self.data = Arc::from(block);
		}
	}

	/// Returns a new segment sharing this block, containing the first
	/// `byte_count` readable bytes. Those bytes are consumed from this
	/// segment. `byte_count` must be in `(0, len]`.
	pub fn split_to(&mut self, byte_count: usize) -> Self {
		debug_assert!(
			byte_count > 0 && byte_count <= self.len(),
			"split length should be within the live range"
		);
		let prefix = Self {
			data: Arc::clone(&self.data),
			pos: self.pos,
			limit: self.pos + byte_count,
		};
		self.pos += byte_count;
		prefix
	}

	/// Returns a new segment sharing this block with the same live range.
	pub fn share_all(&self) -> Self {
		Self {
			data: Arc::clone(&self.data),
			pos: self.pos,
			limit: self.limit,
		}
	}

	/// Returns the shared block handle and the live range, for byte strings
	/// that hold block references directly.
	pub fn share_block(&self) -> (Arc<[u8; SIZE]>, usize, usize) {
		(Arc::clone(&self.data), self.pos, self.limit)
	}

	/// Wraps an existing block handle in a segment over `[pos, limit)`.
	pub fn from_block(data: Arc<[u8; SIZE]>, pos: usize, limit: usize) -> Self {
		debug_assert!(pos <= limit && limit <= SIZE);
		Self { data, pos, limit }
	}

	/// Truncates the live range to `n` bytes. Only this handle's view
	/// changes; the block is untouched.
	pub fn set_len(&mut self, n: usize) {
		debug_assert!(n <= self.len());
		self.limit = self.pos + n;
	}

	/// Consumes `n` bytes after reading.
	pub fn consume(&mut self, n: usize) {
		debug_assert!(n <= self.len());
		self.pos += n;
	}

	/// Adds `n` bytes after writing into the free range.
	pub fn add(&mut self, n: usize) {
		debug_assert!(self.limit + n <= SIZE);
		self.limit += n;
	}

	/// Returns a mutable slice of the free range `[limit, capacity)`. The
	/// segment must be unshared; append through [`add`][] once written.
	///
	/// [`add`]: Self::add
	pub fn free_space_mut(&mut self) -> &mut [u8] {
		debug_assert!(!self.is_shared(), "shared segments are read-only");
		let Self { data, limit, .. } = self;
		let block = Arc::get_mut(data).expect(
			"unshared block should have a unique handle"
		);
		&mut block[*limit..]
	}

	/// Appends bytes from a slice, returning the number of bytes written.
	pub fn write_slice(&mut self, bytes: &[u8]) -> usize {
		let n = min(self.free_len(), bytes.len());
		if n > 0 {
			self.free_space_mut()[..n].copy_from_slice(&bytes[..n]);
			self.add(n);
		}
		n
	}

	/// Moves up to `byte_count` bytes from this segment into `other`,
	/// returning the number of bytes moved. `other` must be unshared.
	pub fn move_into(&mut self, other: &mut Self, byte_count: usize) -> usize {
		let n = min(byte_count, self.len());
		let n = other.write_slice(&self.data()[..n]);
		self.consume(n);
		n
	}

	/// Shifts the live range to the start of the block, making the full
	/// trailing capacity available for writes. The segment must be unshared.
	pub fn shift(&mut self) {
		if self.pos == 0 { return }
		let Self { data, pos, limit } = self;
		let block = Arc::get_mut(data).expect(
			"unshared block should have a unique handle"
		);
		block.copy_within(*pos..*limit, 0);
		*limit -= *pos;
		*pos = 0;
	}

	/// Clears the live range. Data is not zeroed; writers overwrite it.
	pub fn reset(&mut self) {
		self.pos = 0;
		self.limit = 0;
	}
}

impl Default for Segment {
	fn default() -> Self { Self::new() }
}
