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

use std::time::{Duration, Instant};
use pretty_assertions::assert_eq;
use segio::{Buffer, Error, SEGMENT_SIZE};
use segio::streams::{
	BufSink, BufSource, BufStream, Sink, SinkExt, Source, SourceExt,
};

#[test]
fn buffered_source_reads_typed_values() {
	let data = b"\x12\x34\x56\x78hello";
	let mut source = (&data[..]).buffered();

	assert_eq!(source.read_u16().unwrap(), 0x1234);
	assert_eq!(source.read_u16_le().unwrap(), 0x7856);
	assert_eq!(source.read_utf8(5).unwrap(), "hello");
	assert!(matches!(source.read_u8(), Err(Error::Eof)));
}

#[test]
fn request_and_require() {
	let data = vec![7u8; 100];
	let mut source = (&data[..]).buffered();

	assert!(source.request(100).unwrap());
	assert!(!source.request(101).unwrap());
	assert!(source.require(100).is_ok());
	assert!(matches!(source.require(101), Err(Error::Eof)));
	// The failed require consumed nothing.
	assert_eq!(source.buf().len(), 100);
}

#[test]
fn buffered_source_skip_and_read_all() {
	let data: Vec<u8> = (0..3 * SEGMENT_SIZE).map(|i| i as u8).collect();
	let mut source = (&data[..]).buffered();
	source.skip(SEGMENT_SIZE).unwrap();

	let mut out = Vec::new();
	assert_eq!(source.read_all(&mut out).unwrap(), 2 * SEGMENT_SIZE);
	assert_eq!(out, &data[SEGMENT_SIZE..]);
}

#[test]
fn buffered_source_lines() {
	let mut source = (&b"alpha\r\nbeta\ngamma"[..]).buffered();
	let mut line = String::new();
	assert!(source.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "alpha");

	line.clear();
	assert!(source.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "beta");

	line.clear();
	assert!(!source.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "gamma");
}

#[test]
fn index_of_loads_more_data_as_it_searches() {
	let mut data = vec![b'-'; 3 * SEGMENT_SIZE];
	data.push(b'!');
	let mut source = (&data[..]).buffered();

	assert_eq!(source.index_of(b'!', 0).unwrap(), Some(3 * SEGMENT_SIZE));
	assert_eq!(source.index_of(b'?', 0).unwrap(), None);
	assert_eq!(source.buf().len(), data.len(), "searching consumes nothing");
}

#[test]
fn peek_does_not_consume() {
	let mut source = (&b"peekaboo"[..]).buffered();
	{
		let mut peek = source.peek();
		let mut out = Buffer::new();
		assert_eq!(peek.read(&mut out, 4).unwrap(), 4);
		assert_eq!(out.read_utf8_to_end().unwrap(), "peek");

		// The view is forward-only; further reads continue where it left off.
		let mut rest = Buffer::new();
		assert_eq!(peek.read(&mut rest, 64).unwrap(), 4);
		assert_eq!(rest.read_utf8_to_end().unwrap(), "aboo");
		assert_eq!(peek.read(&mut rest, 1).unwrap(), 0);
	}
	assert_eq!(source.read_utf8(8).unwrap(), "peekaboo");
}

#[test]
fn peek_can_be_buffered() {
	let mut source = (&b"\x00\x2A rest"[..]).buffered();
	{
		let mut peek = source.peek().buffered();
		assert_eq!(peek.read_u16().unwrap(), 42);
	}
	assert_eq!(source.read_u16().unwrap(), 42, "the parent was not advanced");
}

#[test]
fn closed_source_fails_every_operation() {
	let mut source = (&b"data"[..]).buffered();
	source.close_source().unwrap();
	source.close_source().unwrap();

	assert!(matches!(source.read_u8(), Err(Error::Closed)));
	assert!(matches!(source.request(1), Err(Error::Closed)));
	let mut sink = Buffer::new();
	assert!(matches!(source.read(&mut sink, 1), Err(Error::Closed)));
}

#[test]
fn buffered_sink_emits_complete_segments_eagerly() {
	let mut inner = Vec::new();
	{
		let mut sink = (&mut inner).buffered();
		sink.write_slice(&vec![1u8; SEGMENT_SIZE / 2]).unwrap();
		assert_eq!(sink.buf().len(), SEGMENT_SIZE / 2, "partial tail stays");

		sink.write_slice(&vec![2u8; SEGMENT_SIZE]).unwrap();
		assert_eq!(sink.buf().len(), SEGMENT_SIZE / 2, "full segments left");

		sink.flush().unwrap();
		assert_eq!(sink.buf().len(), 0);
	}
	assert_eq!(inner.len(), SEGMENT_SIZE + SEGMENT_SIZE / 2);
}

#[test]
fn buffered_sink_close_flushes_and_is_idempotent() {
	let mut inner = Vec::new();
	{
		let mut sink = (&mut inner).buffered();
		sink.write_str("flushed on close").unwrap();
		sink.close_sink().unwrap();
		sink.close_sink().unwrap();

		assert!(matches!(sink.write_u8(0), Err(Error::Closed)));
		assert!(matches!(sink.flush(), Err(Error::Closed)));
	}
	assert_eq!(inner, b"flushed on close");
}

#[test]
fn dropping_a_buffered_sink_closes_it() {
	let mut inner = Vec::new();
	{
		let mut sink = (&mut inner).buffered();
		sink.write_str("dropped").unwrap();
	}
	assert_eq!(inner, b"dropped");
}

#[test]
fn write_all_pumps_source_to_sink() {
	let data: Vec<u8> = (0..2 * SEGMENT_SIZE + 17).map(|i| i as u8).collect();
	let mut inner = Vec::new();
	{
		let mut sink = (&mut inner).buffered();
		let mut source = &data[..];
		assert_eq!(sink.write_all(&mut source).unwrap(), data.len());
	}
	assert_eq!(inner, data);
}

#[test]
fn vec_sink_requires_enough_bytes() {
	let mut buf = Buffer::from("abc");
	let mut out = Vec::new();
	assert!(matches!(out.write(&mut buf, 4), Err(Error::Eof)));
	assert_eq!(buf.len(), 3, "nothing was consumed");
	out.write(&mut buf, 3).unwrap();
	assert_eq!(out, b"abc");
}

#[test]
fn timeout_deadline_stack() {
	let mut source = (&b"slow"[..]).buffered();
	let now = Instant::now();

	source.timeout_mut().push_deadline(now + Duration::from_secs(60));
	assert_eq!(source.read_utf8(4).unwrap(), "slow", "a future deadline does not fire");

	// A tighter child deadline overrides the parent; it is checked before
	// the next blocking refill.
	source.timeout_mut().push_deadline(now - Duration::from_secs(1));
	assert!(matches!(source.request(1), Err(Error::Interrupted)));

	// Popping restores the parent deadline.
	source.timeout_mut().pop_deadline();
	assert!(!source.request(1).unwrap(), "the source is exhausted");
}

#[test]
fn buffer_is_its_own_buffered_stream() {
	// Buffer implements the buffered traits directly; request is just an
	// availability check.
	let mut buf = Buffer::from("42 ");
	assert!(buf.request(3).unwrap());
	assert!(!buf.request(4).unwrap());
	assert_eq!(BufSource::read_decimal_i64(&mut buf).unwrap(), 42);
}

#[test]
fn source_errors_propagate() {
	struct Failing;
	impl Source for Failing {
		fn read(&mut self, _: &mut Buffer, _: usize) -> segio::Result<usize> {
			Err(Error::Protocol("broken"))
		}
	}

	let mut source = Failing.buffered();
	assert!(matches!(source.read_u8(), Err(Error::Protocol("broken"))));
}
