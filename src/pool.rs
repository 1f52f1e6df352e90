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

//! The process-wide segment pool. Buffers claim segments here as they write
//! and return them as they drain, amortizing allocation across the process.
//! The pool retains at most [`MAX_BYTES`] of segments; segments recycled
//! beyond the cap, and segments whose block is still shared, are dropped
//! instead. Recycled memory is never zeroed; writers write before readers
//! read.

use std::sync::{Mutex, MutexGuard, PoisonError};
use once_cell::sync::Lazy;
use crate::segment::{Segment, SIZE};

/// The most bytes the pool will hold, 64 segments' worth.
pub const MAX_BYTES: usize = 64 * SIZE;

static POOL: Lazy<Mutex<Shelf>> = Lazy::new(Mutex::default);

#[derive(Default)]
struct Shelf {
	segments: Vec<Segment>,
	bytes: usize,
}

impl Shelf {
	fn take(&mut self) -> Segment {
		match self.segments.pop() {
			Some(seg) => {
				self.bytes -= SIZE;
				seg
			}
			None => Segment::new(),
		}
	}

	fn recycle(&mut self, mut segment: Segment) {
		if segment.is_shared() { return }
		if self.bytes + SIZE > MAX_BYTES { return }

		segment.reset();
		self.bytes += SIZE;
		self.segments.push(segment);
	}
}

fn shelf() -> MutexGuard<'static, Shelf> {
	POOL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claims one segment, allocating if the pool is empty.
pub(crate) fn take() -> Segment {
	shelf().take()
}

/// Returns a segment to the pool. Segments whose block is still referenced
/// elsewhere are dropped, as are segments that would put the pool over its
/// byte cap.
pub(crate) fn recycle(segment: Segment) {
	shelf().recycle(segment);
}

/// Returns the number of bytes currently cached by the pool.
pub fn bytes_cached() -> usize { shelf().bytes }

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn recycle_then_take() {
		let mut shelf = Shelf::default();
		let mut seg = Segment::new();
		seg.write_slice(b"junk");
		shelf.recycle(seg);
		assert_eq!(shelf.bytes, SIZE);

		let seg = shelf.take();
		assert_eq!(shelf.bytes, 0);
		assert!(seg.is_empty(), "recycled segments are reset");
	}

	#[test]
	fn shared_segments_are_not_pooled() {
		let mut shelf = Shelf::default();
		let mut seg = Segment::new();
		seg.write_slice(b"shared");
		let _other = seg.share_all();
		shelf.recycle(seg);
		assert_eq!(shelf.bytes, 0);
	}

	#[test]
	fn cap_is_respected() {
		let mut shelf = Shelf::default();
		for _ in 0..MAX_BYTES / SIZE + 16 {
			shelf.recycle(Segment::new());
		}
		assert_eq!(shelf.bytes, MAX_BYTES);
	}
}
