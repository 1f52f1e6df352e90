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

//! Prefix-matching over a fixed set of byte-string alternatives, compiled
//! once into a compact integer trie. A node is either a *scan* (a run of
//! bytes every remaining alternative shares, then one link) or a *select*
//! (a sorted table of distinguishing bytes, then one link per byte). Links
//! point at a child node or, negated, at a matching alternative's index.

use itertools::Itertools;
use crate::{ByteString, Error, Result};

/// A precompiled set of byte-string alternatives for prefix matching
/// against a buffered source.
#[derive(Clone, Debug)]
pub struct Options {
	alternatives: Vec<ByteString>,
	trie: Vec<i32>,
}

/// The outcome of matching buffered bytes against the trie.
pub(crate) enum PrefixMatch {
	/// Alternative `index` matched `len` bytes.
	Match { index: usize, len: usize },
	/// No alternative can match, no matter what bytes follow.
	Miss,
	/// The buffered bytes ran out mid-walk; more input could still change
	/// the outcome.
	Truncated,
}

impl Options {
	/// Compiles alternatives into a matching trie. Alternatives must be
	/// non-empty and distinct, and at least one must be given; ties resolve
	/// to the earliest-listed alternative.
	pub fn of(alternatives: impl IntoIterator<Item = ByteString>) -> Result<Self> {
		let alternatives: Vec<ByteString> = alternatives.into_iter().collect();
		if alternatives.is_empty() {
			return Err(Error::IllegalArgument("at least one alternative is required"));
		}
		for (i, alt) in alternatives.iter().enumerate() {
			if alt.is_empty() {
				return Err(Error::IllegalArgument("the empty byte string is not a valid alternative"));
			}
			if alternatives[..i].contains(alt) {
				return Err(Error::IllegalArgument("duplicate alternative"));
			}
		}

		let indices: Vec<usize> = (0..alternatives.len()).collect();
		let root = build_node(&alternatives, &indices, 0);
		let mut trie = Vec::new();
		serialize(&root, &mut trie);

		Ok(Self { alternatives, trie })
	}

	/// Returns the number of alternatives.
	pub fn len(&self) -> usize { self.alternatives.len() }

	pub fn is_empty(&self) -> bool { self.alternatives.is_empty() }

	/// Returns the alternative at `index`.
	pub fn get(&self, index: usize) -> Option<&ByteString> {
		self.alternatives.get(index)
	}

	/// Walks the trie against `buf`'s readable bytes. With `exhausted` set,
	/// running out of bytes resolves to the deepest terminal passed (or a
	/// miss); otherwise it reports truncation so the caller can load more.
	pub(crate) fn match_prefix(&self, buf: &crate::Buffer, exhausted: bool) -> PrefixMatch {
		let trie = &self.trie;
		let mut bytes = buf.bytes();
		let mut pos = 0usize;
		let mut consumed = 0usize;
		let mut best = None;

		loop {
			let tag = trie[pos];
			if trie[pos + 1] >= 0 {
				best = Some((trie[pos + 1] as usize, consumed));
			}

			let link = if tag < 0 {
				// Scan: every expected byte must match.
				let n = -tag as usize;
				for &expected in &trie[pos + 2..pos + 2 + n] {
					match bytes.next() {
						None if exhausted => return resolve(best),
						None => return PrefixMatch::Truncated,
						Some(b) if b as i32 == expected => consumed += 1,
						Some(_) => return resolve(best),
					}
				}
				trie[pos + 2 + n]
			} else {
				// Select: branch on the next byte.
				let n = tag as usize;
				let table = &trie[pos + 2..pos + 2 + n];
				match bytes.next() {
					None if exhausted => return resolve(best),
					None => return PrefixMatch::Truncated,
					Some(b) => match table.binary_search(&(b as i32)) {
						Ok(i) => {
							consumed += 1;
							trie[pos + 2 + n + i]
						}
						Err(_) => return resolve(best),
					},
				}
			};

			if link < 0 {
				return PrefixMatch::Match { index: (-link - 1) as usize, len: consumed };
			}
			pos = link as usize;
		}
	}
}

fn resolve(best: Option<(usize, usize)>) -> PrefixMatch {
	match best {
		Some((index, len)) => PrefixMatch::Match { index, len },
		None => PrefixMatch::Miss,
	}
}

enum Node {
	Scan { prefix_index: i32, bytes: Vec<u8>, next: Link },
	Select { prefix_index: i32, bytes: Vec<u8>, children: Vec<Link> },
}

enum Link {
	Child(Box<Node>),
	Match(usize),
}

/// Builds the node for the alternatives in `subset`, which all agree on
/// their first `offset` bytes. At least one must continue past `offset`.
fn build_node(alts: &[ByteString], subset: &[usize], offset: usize) -> Node {
	let prefix_index = subset.iter()
		.find(|&&i| alts[i].len() == offset)
		.map_or(-1, |&i| i as i32);
	let live: Vec<usize> = subset.iter()
		.copied()
		.filter(|&i| alts[i].len() > offset)
		.collect();
	debug_assert!(!live.is_empty(), "a continuing alternative exists");

	let byte_at = |i: usize, depth: usize| {
		alts[i].get(depth).expect("depth is within the alternative")
	};

	let distinct = live.iter().map(|&i| byte_at(i, offset)).unique().count();
	if distinct == 1 {
		// One shared byte: scan the longest run the group agrees on,
		// stopping where an alternative terminates or the bytes diverge.
		let mut bytes = vec![byte_at(live[0], offset)];
		let mut depth = offset + 1;
		loop {
			if live.iter().any(|&i| alts[i].len() == depth) {
				break;
			}
			let b = byte_at(live[0], depth);
			if live.iter().any(|&i| byte_at(i, depth) != b) {
				break;
			}
			bytes.push(b);
			depth += 1;
		}

		let next = link_for(alts, &live, depth);
		Node::Scan { prefix_index, bytes, next }
	} else {
		// Branch on the distinguishing byte, table sorted for search.
		let mut groups: Vec<(u8, Vec<usize>)> = Vec::new();
		for &i in &live {
			let b = byte_at(i, offset);
			match groups.binary_search_by_key(&b, |&(byte, _)| byte) {
				Ok(at) => groups[at].1.push(i),
				Err(at) => groups.insert(at, (b, vec![i])),
			}
		}

		let bytes = groups.iter().map(|&(b, _)| b).collect();
		let children = groups.iter()
			.map(|(_, group)| link_for(alts, group, offset + 1))
			.collect();
		Node::Select { prefix_index, bytes, children }
	}
}

/// Links to a direct match when a single alternative ends at `depth`, and
/// to a child node otherwise.
fn link_for(alts: &[ByteString], subset: &[usize], depth: usize) -> Link {
	if let [only] = subset {
		if alts[*only].len() == depth {
			return Link::Match(*only);
		}
	}
	Link::Child(Box::new(build_node(alts, subset, depth)))
}

/// Writes `node` at the end of `trie`, then its children, patching links as
/// their positions become known. Returns the node's position.
fn serialize(node: &Node, trie: &mut Vec<i32>) -> usize {
	let pos = trie.len();
	let (links, slots) = match node {
		Node::Scan { prefix_index, bytes, next } => {
			trie.push(-(bytes.len() as i32));
			trie.push(*prefix_index);
			trie.extend(bytes.iter().map(|&b| b as i32));
			let slot = trie.len();
			trie.push(0);
			(vec![next], vec![slot])
		}
		Node::Select { prefix_index, bytes, children } => {
			trie.push(children.len() as i32);
			trie.push(*prefix_index);
			trie.extend(bytes.iter().map(|&b| b as i32));
			let first_slot = trie.len();
			trie.resize(trie.len() + children.len(), 0);
			(
				children.iter().collect(),
				(first_slot..first_slot + children.len()).collect(),
			)
		}
	};

	for (link, slot) in links.into_iter().zip(slots) {
		let target = match link {
			Link::Match(index) => -(*index as i32) - 1,
			Link::Child(child) => serialize(child, trie) as i32,
		};
		trie[slot] = target;
	}
	pos
}
