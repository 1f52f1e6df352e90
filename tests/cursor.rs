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

use all_asserts::assert_ge;
use pretty_assertions::assert_eq;
use segio::{Buffer, SEGMENT_SIZE};

#[test]
fn cursor_walks_every_segment() {
	let data: Vec<u8> = (0..2 * SEGMENT_SIZE + 100).map(|i| i as u8).collect();
	let mut buf = Buffer::new();
	buf.write_slice(&data);

	let mut seen = Vec::new();
	let mut cursor = buf.cursor();
	while let Some(readable) = cursor.next().unwrap() {
		let window = cursor.data();
		assert_eq!(window.len(), readable);
		seen.extend_from_slice(window);
	}
	drop(cursor);

	assert_eq!(seen, data);
	assert_eq!(buf.len(), data.len(), "a cursor walk consumes nothing");
}

#[test]
fn seek_reports_readable_bytes() {
	let mut buf = Buffer::new();
	buf.write_slice(&vec![b'a'; SEGMENT_SIZE]);
	buf.write_slice(&vec![b'b'; 10]);

	let mut cursor = buf.cursor();
	assert_eq!(cursor.seek(0).unwrap(), Some(SEGMENT_SIZE));
	assert_eq!(cursor.offset(), Some(0));
	assert_eq!(cursor.seek(SEGMENT_SIZE - 1).unwrap(), Some(1));
	assert_eq!(cursor.seek(SEGMENT_SIZE).unwrap(), Some(10));
	assert_eq!(cursor.data()[0], b'b');
	assert_eq!(cursor.seek(SEGMENT_SIZE + 10).unwrap(), None, "past the last byte");
	assert!(cursor.seek(SEGMENT_SIZE + 11).is_err());
}

#[test]
fn read_only_cursor_rejects_writes() {
	let mut buf = Buffer::from("fixed");
	let mut cursor = buf.cursor();
	cursor.seek(0).unwrap();
	assert!(cursor.data_mut().is_err());
	assert!(cursor.expand(1).is_err());
	assert!(cursor.resize(1).is_err());
}

#[test]
fn read_write_cursor_mutates_in_place() {
	let mut buf = Buffer::from("mutate me");
	{
		let mut cursor = buf.cursor_mut();
		cursor.seek(0).unwrap();
		cursor.data_mut().unwrap()[0] = b'M';
	}
	assert_eq!(buf.read_utf8_to_end().unwrap(), "Mutate me");
}

#[test]
fn read_write_cursor_forks_shared_segments() {
	let mut buf = Buffer::new();
	buf.write_slice(&vec![b'o'; 2 * SEGMENT_SIZE]);
	let snapshot = buf.snapshot();

	{
		let mut cursor = buf.cursor_mut();
		cursor.seek(0).unwrap();
		cursor.data_mut().unwrap().fill(b'x');
	}

	assert_eq!(buf.get(0), Some(b'x'));
	assert_eq!(snapshot.get(0), Some(b'o'), "the snapshot is untouched");
}

#[test]
fn expand_appends_writable_capacity() {
	let mut buf = Buffer::from("start:");
	let old_len = buf.len();
	{
		let mut cursor = buf.cursor_mut();
		let added = cursor.expand(4).unwrap();
		assert_ge!(added, 4);
		assert_eq!(cursor.offset(), Some(old_len));

		let window = cursor.data_mut().unwrap();
		window[..4].copy_from_slice(b"data");
		// Trim the capacity we didn't use.
		cursor.resize(old_len + 4).unwrap();
	}
	assert_eq!(buf.read_utf8_to_end().unwrap(), "start:data");
}

#[test]
fn resize_grows_and_shrinks() {
	let mut buf = Buffer::from("keep");
	{
		let mut cursor = buf.cursor_mut();
		cursor.resize(2 * SEGMENT_SIZE).unwrap();
	}
	assert_eq!(buf.len(), 2 * SEGMENT_SIZE);
	assert_eq!(buf.segment_sizes().iter().sum::<usize>(), buf.len());

	{
		let mut cursor = buf.cursor_mut();
		cursor.resize(2).unwrap();
	}
	assert_eq!(buf.read_utf8_to_end().unwrap(), "ke");
}
