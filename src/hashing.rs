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

//! Hashing pass-through streams. The library never implements a digest
//! itself; these wrappers feed every byte that crosses them to an external
//! hasher implementing the `digest` traits.

use digest::{Digest, FixedOutputReset};
use crate::{Buffer, ByteString, Result};
use crate::streams::{Sink, Source};

/// A source that hashes data read through it.
pub struct HashSource<S: Source, H: Digest> {
	source: S,
	hasher: H,
}

impl<S: Source, H: Digest> HashSource<S, H> {
	pub fn new(source: S, hasher: H) -> Self {
		Self { source, hasher }
	}

	pub fn hasher(&self) -> &H { &self.hasher }
	pub fn hasher_mut(&mut self) -> &mut H { &mut self.hasher }

	/// Returns the hash of the bytes read so far.
	pub fn hash(&self) -> ByteString
	where H: Clone {
		self.hasher.clone().finalize().as_slice().into()
	}

	/// Takes the hash of the bytes read so far, resetting the hasher.
	pub fn take_hash(&mut self) -> ByteString
	where H: FixedOutputReset {
		Digest::finalize_reset(&mut self.hasher).as_slice().into()
	}

	pub fn into_inner(self) -> S { self.source }
}

impl<S: Source, H: Digest> Source for HashSource<S, H> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		let start = sink.len();
		let count = self.source.read(sink, byte_count)?;
		sink.visit_range(start, count, |chunk| Digest::update(&mut self.hasher, chunk));
		Ok(count)
	}

	fn close_source(&mut self) -> Result {
		self.source.close_source()
	}
}

/// A sink that hashes data written through it.
pub struct HashSink<S: Sink, H: Digest> {
	sink: S,
	hasher: H,
}

impl<S: Sink, H: Digest> HashSink<S, H> {
	pub fn new(sink: S, hasher: H) -> Self {
		Self { sink, hasher }
	}

	pub fn hasher(&self) -> &H { &self.hasher }
	pub fn hasher_mut(&mut self) -> &mut H { &mut self.hasher }

	/// Returns the hash of the bytes written so far.
	pub fn hash(&self) -> ByteString
	where H: Clone {
		self.hasher.clone().finalize().as_slice().into()
	}

	/// Takes the hash of the bytes written so far, resetting the hasher.
	pub fn take_hash(&mut self) -> ByteString
	where H: FixedOutputReset {
		Digest::finalize_reset(&mut self.hasher).as_slice().into()
	}

	pub fn into_inner(self) -> S { self.sink }
}

impl<S: Sink, H: Digest> Sink for HashSink<S, H> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if byte_count <= source.len() {
			source.visit_range(0, byte_count, |chunk| Digest::update(&mut self.hasher, chunk));
		}
		self.sink.write(source, byte_count)
	}

	fn flush(&mut self) -> Result {
		self.sink.flush()
	}

	fn close_sink(&mut self) -> Result {
		self.sink.close_sink()
	}
}

#[cfg(test)]
mod test {
	use md5::Md5;
	use crate::streams::{BufSink, SinkExt};
	use super::*;

	#[test]
	fn sink_hashes_what_passes_through() {
		let mut inner = Vec::new();
		let mut sink = HashSink::new(&mut inner, Md5::new());

		let mut buf = Buffer::new();
		buf.write_str("abc");
		sink.write(&mut buf, 3).unwrap();

		let hash = sink.hash();
		drop(sink);
		assert_eq!(hash.hex(), "900150983cd24fb0d6963f7d28e17f72");
		assert_eq!(inner, b"abc");
	}

	#[test]
	fn source_hashes_what_passes_through() {
		let mut source = HashSource::new(&b"abc"[..], Md5::new());
		let mut buf = Buffer::new();
		source.read(&mut buf, 16).unwrap();
		assert_eq!(source.hash().hex(), "900150983cd24fb0d6963f7d28e17f72");
	}

	#[test]
	fn buffered_writes_hash_on_emit() {
		let mut inner = Vec::new();
		{
			let mut sink = HashSink::new(&mut inner, Md5::new()).buffered();
			sink.write_str("message digest").unwrap();
			sink.close_sink().unwrap();
		}
		assert_eq!(inner, b"message digest");
	}
}
