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

use all_asserts::assert_gt;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use segio::{Buffer, ByteString, Error, SEGMENT_SIZE};

fn invariant_holds(buf: &Buffer) -> bool {
	buf.segment_sizes().iter().sum::<usize>() == buf.len()
}

#[test]
fn read_across_a_segment_boundary() {
	let mut buf = Buffer::new();
	buf.write_str("a");
	buf.write_slice(&vec![b'b'; SEGMENT_SIZE - 1]);
	buf.write_str("c");

	assert_eq!(buf.index_of(b'c', 0, usize::MAX), Some(SEGMENT_SIZE));
	assert_eq!(buf.get(SEGMENT_SIZE - 1), Some(b'b'));
	assert!(invariant_holds(&buf));
}

#[test]
fn multi_segment_move() {
	let data: Vec<u8> = (0..4 * SEGMENT_SIZE + 1).map(|i| i as u8).collect();
	let mut a = Buffer::new();
	a.write_slice(&data);

	let mut b = Buffer::new();
	b.write(&mut a, 2 * SEGMENT_SIZE).unwrap();

	assert_eq!(b.len(), 2 * SEGMENT_SIZE);
	assert_eq!(a.len(), 2 * SEGMENT_SIZE + 1);
	assert_eq!(a.get(0), Some(data[2 * SEGMENT_SIZE]));
	assert!(invariant_holds(&a));
	assert!(invariant_holds(&b));
}

#[test]
fn snapshot_survives_clearing() {
	let mut buf = Buffer::from("hello");
	let snapshot = buf.snapshot();
	buf.clear();
	assert_eq!(snapshot.utf8(), "hello");
}

#[test]
fn snapshot_survives_later_writes_and_reads() {
	let mut buf = Buffer::new();
	buf.write_slice(&vec![b'x'; 2 * SEGMENT_SIZE]);
	let snapshot = buf.snapshot();
	assert_gt!(snapshot.block_count(), 0, "a large snapshot shares blocks");

	buf.write_str("tail");
	buf.skip(SEGMENT_SIZE).unwrap();
	assert_eq!(snapshot.len(), 2 * SEGMENT_SIZE);
	assert!(snapshot.bytes_eq_all(b'x'));
}

trait SnapshotExt {
	fn bytes_eq_all(&self, byte: u8) -> bool;
}

impl SnapshotExt for ByteString {
	fn bytes_eq_all(&self, byte: u8) -> bool {
		(0..self.len()).all(|i| self.get(i) == Some(byte))
	}
}

#[test]
fn snapshot_prefix_collapses_when_small() {
	let mut buf = Buffer::from("hello world");
	buf.write_slice(&vec![b'z'; SEGMENT_SIZE]);

	let small = buf.snapshot_prefix(5).unwrap();
	assert_eq!(small.utf8(), "hello");
	assert_eq!(small.block_count(), 0, "small snapshots are dense");

	let large = buf.snapshot_prefix(SEGMENT_SIZE).unwrap();
	assert_eq!(large.len(), SEGMENT_SIZE);
	assert_gt!(large.block_count(), 0);

	assert!(buf.snapshot_prefix(buf.len() + 1).is_err());
}

#[test]
fn clone_is_independent_both_ways() {
	let mut a = Buffer::new();
	a.write_slice(&vec![b'a'; 2 * SEGMENT_SIZE]);
	let mut b = a.clone();
	assert_eq!(a, b);

	a.write_str("only in a");
	assert_eq!(b.len(), 2 * SEGMENT_SIZE);

	b.skip(SEGMENT_SIZE).unwrap();
	b.write_str("only in b");
	assert_eq!(a.len(), 2 * SEGMENT_SIZE + 9);
	assert_eq!(a.get(0), Some(b'a'));

	assert!(invariant_holds(&a));
	assert!(invariant_holds(&b));
}

#[quickcheck]
fn equality_is_layout_independent(data: Vec<u8>, split: usize) -> bool {
	let mut canonical = Buffer::new();
	canonical.write_slice(&data);

	// A different segmentation of the same bytes: two range copies.
	let split = if data.is_empty() { 0 } else { split % data.len() };
	let mut other = Buffer::new();
	canonical.copy_to(&mut other, 0, split).unwrap();
	canonical.copy_to(&mut other, split, data.len() - split).unwrap();

	use std::collections::hash_map::DefaultHasher;
	use std::hash::{Hash, Hasher};
	let hash = |buf: &Buffer| {
		let mut hasher = DefaultHasher::new();
		buf.hash(&mut hasher);
		hasher.finish()
	};

	canonical == other
		&& hash(&canonical) == hash(&other)
		&& invariant_holds(&other)
}

#[test]
fn copy_to_shares_large_ranges() {
	let mut source = Buffer::new();
	source.write_slice(&vec![b's'; 2 * SEGMENT_SIZE]);

	let mut out = Buffer::new();
	source.copy_to(&mut out, 0, 2 * SEGMENT_SIZE).unwrap();
	assert_eq!(source.len(), 2 * SEGMENT_SIZE, "copy_to does not consume");
	assert_eq!(out, source);

	// Writing to the copy later must not disturb the source.
	out.write_str("!");
	assert_eq!(source.len(), 2 * SEGMENT_SIZE);
	assert!(invariant_holds(&out));
}

#[test]
fn get_and_index_out_of_range() {
	let buf = Buffer::from("abc");
	assert_eq!(buf.get(2), Some(b'c'));
	assert_eq!(buf.get(3), None);
	assert_eq!(buf.index_of(b'z', 0, usize::MAX), None);
	assert_eq!(buf.index_of(b'a', 1, usize::MAX), None);
	assert_eq!(buf.index_of(b'c', 1, 2), None, "to is exclusive");
}

#[test]
fn index_of_bytes_backtracks_after_partial_match() {
	let mut buf = Buffer::new();
	buf.write_str("ababab-abc");
	assert_eq!(buf.index_of_bytes(b"abc", 0), Some(7));
	assert_eq!(buf.index_of_bytes(b"abab", 1), Some(2));
	assert_eq!(buf.index_of_bytes(b"missing", 0), None);
}

#[test]
fn index_of_bytes_matches_across_segments() {
	let mut buf = Buffer::new();
	buf.write_slice(&vec![b'x'; SEGMENT_SIZE - 2]);
	buf.write_str("needle");
	assert_eq!(buf.index_of_bytes(b"needle", 0), Some(SEGMENT_SIZE - 2));
	assert_eq!(buf.index_of_element(b"ne", 0), Some(SEGMENT_SIZE - 2));
}

#[test]
fn range_equals_is_never_an_error() {
	let buf = Buffer::from("hello");
	assert!(buf.range_equals(0, b"hello"));
	assert!(buf.range_equals(1, b"ell"));
	assert!(!buf.range_equals(1, b"elp"));
	assert!(!buf.range_equals(3, b"lot"), "overruns are false");
}

#[test]
fn integer_round_trips() {
	let mut buf = Buffer::new();
	buf.write_u8(0x12)
		.write_u16(0x1234)
		.write_u16_le(0x1234)
		.write_u32(0xDEAD_BEEF)
		.write_u32_le(0xDEAD_BEEF)
		.write_u64(0x0123_4567_89AB_CDEF)
		.write_u64_le(0x0123_4567_89AB_CDEF)
		.write_i32(-2)
		.write_i64_le(i64::MIN);

	assert_eq!(buf.read_u8().unwrap(), 0x12);
	assert_eq!(buf.read_u16().unwrap(), 0x1234);
	assert_eq!(buf.read_u16_le().unwrap(), 0x1234);
	assert_eq!(buf.read_u32().unwrap(), 0xDEAD_BEEF);
	assert_eq!(buf.read_u32_le().unwrap(), 0xDEAD_BEEF);
	assert_eq!(buf.read_u64().unwrap(), 0x0123_4567_89AB_CDEF);
	assert_eq!(buf.read_u64_le().unwrap(), 0x0123_4567_89AB_CDEF);
	assert_eq!(buf.read_i32().unwrap(), -2);
	assert_eq!(buf.read_i64_le().unwrap(), i64::MIN);
	assert!(buf.is_empty());
	assert!(matches!(buf.read_u8(), Err(Error::Eof)));
}

#[test]
fn short_reads_consume_nothing() {
	let mut buf = Buffer::from("ab");
	assert!(matches!(buf.read_u32(), Err(Error::Eof)));
	assert_eq!(buf.len(), 2);
}

#[test]
fn decimal_writes() {
	let mut buf = Buffer::new();
	buf.write_decimal_i64(0)
		.write_str(" ")
		.write_decimal_i64(-42)
		.write_str(" ")
		.write_decimal_i64(i64::MAX)
		.write_str(" ")
		.write_decimal_i64(i64::MIN);
	assert_eq!(
		buf.read_utf8_to_end().unwrap(),
		"0 -42 9223372036854775807 -9223372036854775808",
	);
}

#[test]
fn decimal_reads() {
	let mut buf = Buffer::from("0 -42 9223372036854775807 -9223372036854775808 123x");
	assert_eq!(buf.read_decimal_i64().unwrap(), 0);
	buf.skip(1).unwrap();
	assert_eq!(buf.read_decimal_i64().unwrap(), -42);
	buf.skip(1).unwrap();
	assert_eq!(buf.read_decimal_i64().unwrap(), i64::MAX);
	buf.skip(1).unwrap();
	assert_eq!(buf.read_decimal_i64().unwrap(), i64::MIN);
	buf.skip(1).unwrap();
	assert_eq!(buf.read_decimal_i64().unwrap(), 123);
	assert_eq!(buf.read_utf8_to_end().unwrap(), "x", "the terminator stays");
}

#[test]
fn decimal_overflow_consumes_nothing() {
	let mut buf = Buffer::from("12345678901234567890");
	assert!(matches!(buf.read_decimal_i64(), Err(Error::Overflow(_))));
	assert_eq!(buf.len(), 20, "the whole number is still unread");

	let mut low = Buffer::from("-9223372036854775809");
	assert!(matches!(low.read_decimal_i64(), Err(Error::Overflow(_))));
	assert_eq!(low.len(), 20);
}

#[test]
fn decimal_rejects_digitless_input() {
	assert!(matches!(Buffer::from("x").read_decimal_i64(), Err(Error::IllegalArgument(_))));
	assert!(matches!(Buffer::from("-x").read_decimal_i64(), Err(Error::IllegalArgument(_))));
	assert!(matches!(Buffer::from("-").read_decimal_i64(), Err(Error::Eof)));
	assert!(matches!(Buffer::new().read_decimal_i64(), Err(Error::Eof)));
}

#[test]
fn hexadecimal_round_trips() {
	let mut buf = Buffer::new();
	buf.write_hexadecimal_u64(0)
		.write_str(" ")
		.write_hexadecimal_u64(0xDEAD_BEEF)
		.write_str(" ")
		.write_hexadecimal_u64(u64::MAX);
	assert_eq!(buf.read_utf8_to_end().unwrap(), "0 deadbeef ffffffffffffffff");

	let mut buf = Buffer::from("DeadBeef cafe");
	assert_eq!(buf.read_hexadecimal_u64().unwrap(), 0xDEAD_BEEF);
	buf.skip(1).unwrap();
	assert_eq!(buf.read_hexadecimal_u64().unwrap(), 0xCAFE);
}

#[test]
fn hexadecimal_overflow_consumes_nothing() {
	let mut buf = Buffer::from("fedcba9876543210f");
	assert!(matches!(buf.read_hexadecimal_u64(), Err(Error::Overflow(_))));
	assert_eq!(buf.len(), 17);

	// Leading zeros don't overflow; only significant digits count.
	let mut buf = Buffer::from("00000000000000000001");
	assert_eq!(buf.read_hexadecimal_u64().unwrap(), 1);
}

#[test]
fn utf8_code_point_boundaries() {
	let mut buf = Buffer::new();
	buf.write_utf8_code_point(0x10FFFF).unwrap();
	assert_eq!(buf.read_byte_string(4).unwrap(), [0xF4, 0x8F, 0xBF, 0xBF]);

	assert!(matches!(
		Buffer::new().write_utf8_code_point(0xD800),
		Err(Error::IllegalArgument(_)),
	));
	assert!(matches!(
		Buffer::new().write_utf8_code_point(0x110000),
		Err(Error::IllegalArgument(_)),
	));
}

#[test]
fn utf8_code_point_reads() {
	let mut buf = Buffer::from("a€𝄞");
	assert_eq!(buf.read_utf8_code_point().unwrap(), 'a');
	assert_eq!(buf.read_utf8_code_point().unwrap(), '€');
	assert_eq!(buf.read_utf8_code_point().unwrap(), '𝄞');

	// A lone leading byte at the end of input is EOF, leaving it unread.
	let mut buf = Buffer::new();
	buf.write_slice(b"\xE2\x82");
	assert!(matches!(buf.read_utf8_code_point(), Err(Error::Eof)));
	assert_eq!(buf.len(), 2);

	// A mistyped continuation consumes only the valid prefix.
	let mut buf = Buffer::new();
	buf.write_slice(b"\xE2\x82z");
	assert_eq!(buf.read_utf8_code_point().unwrap(), '\u{FFFD}');
	assert_eq!(buf.read_utf8_code_point().unwrap(), 'z');
}

#[test]
fn utf16_units_with_unpaired_surrogates() {
	let mut buf = Buffer::new();
	// "a" + musical G clef (a surrogate pair) + a lone high surrogate.
	buf.write_utf16(&[0x61, 0xD834, 0xDD1E, 0xD800]);
	assert_eq!(buf.read_utf8_to_end().unwrap(), "a𝄞?");
}

#[test]
fn utf8_line_reads() {
	let mut buf = Buffer::from("one\r\ntwo\nthree");
	let mut line = String::new();
	assert!(buf.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "one");

	line.clear();
	assert!(buf.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "two");

	line.clear();
	assert!(!buf.read_utf8_line(&mut line).unwrap());
	assert_eq!(line, "three");
	assert!(buf.is_empty());
}

#[test]
fn skip_consumes_then_reports_eof() {
	let mut buf = Buffer::from("abc");
	assert!(matches!(buf.skip(5), Err(Error::Eof)));
	assert!(buf.is_empty());
}

#[test]
fn byte_string_transfer_shares_segments() {
	let mut buf = Buffer::new();
	buf.write_slice(&vec![b'q'; 2 * SEGMENT_SIZE]);
	let snapshot = buf.snapshot();

	let mut out = Buffer::new();
	out.write_byte_string(&snapshot);
	assert_eq!(out.len(), snapshot.len());
	assert_eq!(out, buf);

	// A dense byte string copies instead.
	let mut out = Buffer::new();
	out.write_byte_string(&ByteString::from("dense"));
	assert_eq!(out.read_utf8_to_end().unwrap(), "dense");
}

#[test]
fn display_forms() {
	assert_eq!(Buffer::new().to_string(), "[size=0]");
	assert_eq!(Buffer::from("hello").to_string(), "[text=hello]");

	let mut binary = Buffer::new();
	binary.write_slice(&[0xFF, 0x00]);
	assert_eq!(binary.to_string(), "[hex=ff00]");

	let big = vec![b'x'; 100];
	let mut buf = Buffer::new();
	buf.write_slice(&big);
	let expected = format!("[size=100 md5={}]", ByteString::from(big).md5().hex());
	assert_eq!(buf.to_string(), expected);
}

#[quickcheck]
fn valid_utf8_round_trips(text: String) -> bool {
	let mut buf = Buffer::new();
	buf.write_str(&text);
	buf.read_utf8_to_end().unwrap() == text
}

#[quickcheck]
fn size_invariant_under_mixed_operations(ops: Vec<(bool, u16)>) -> bool {
	let mut buf = Buffer::new();
	for (write, n) in ops {
		let n = n as usize;
		if write {
			buf.write_slice(&vec![0xAB; n]);
		} else {
			let n = n.min(buf.len());
			buf.skip(n).unwrap();
		}
		if !invariant_holds(&buf) {
			return false;
		}
	}
	true
}
