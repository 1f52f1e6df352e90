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

//! ## How it works
//!
//! Data is written to and read from reusable chunks of memory called
//! *segments*. When a segment is consumed, it's returned to a process-wide
//! *pool*; to write data, segments are claimed back from it. The pool holds
//! a bounded number of segments and never zeroes recycled memory.
//!
//! ### Segments
//!
//! A [`Buffer`] keeps its segments in a queue: bytes are read from the
//! front and written to the back, claiming segments from the pool as it
//! fills. The memory behind a segment can be shared between buffers and
//! byte strings. Shared memory is copy-on-write; it can be read by many
//! holders and only copies when one of them writes. Moving data between
//! buffers relinks whole segments instead of copying, and splits off a
//! shared prefix for partial moves. Ranges under a set threshold (1024
//! bytes) are copied rather than shared, as a trade between allocation
//! churn and copy cost.
//!
//! ### Streams
//!
//! A raw [`Source`][streams::Source] or [`Sink`][streams::Sink] moves
//! chunks of bytes into or out of a buffer. The buffered wrappers layer the
//! full typed operation set on top: integers in both byte orders, decimal
//! and hexadecimal ASCII, UTF-8 with well-defined malformed-input behavior,
//! byte strings, prefix selection over an [`Options`] trie, and deflate
//! compression via the segment-aware pumps in [`deflate`].

mod buffer;
mod buffered_wrappers;
mod byte_str;
pub mod deflate;
mod error;
pub mod hashing;
mod options;
pub mod pool;
mod segment;
mod std_io;
pub mod streams;
mod utf8;

pub use buffer::*;
pub use byte_str::ByteString;
pub use error::*;
pub use options::Options;
pub use segment::SIZE as SEGMENT_SIZE;
pub use std_io::{ReaderSource, SinkWriter, SourceReader, WriterSink};
