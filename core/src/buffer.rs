/*
 * buffer.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of h2bridge, a server-side HTTP/2 session adapter.
 *
 * h2bridge is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * h2bridge is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with h2bridge.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Zero-copy outbound byte queue: ordered heterogeneous payload elements with
//! partial-consumption tracking. Elements are handed to the transport by
//! ownership transfer, never re-buffered.

use std::collections::VecDeque;

/// One owned payload element. Uniform length/slice access over the three
/// shapes a response body may be written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Binary(Vec<u8>),
    Raw(Box<[u8]>),
}

impl Chunk {
    pub fn len(&self) -> usize {
        match self {
            Chunk::Text(s) => s.len(),
            Chunk::Binary(v) => v.len(),
            Chunk::Raw(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Chunk::Text(s) => s.as_bytes(),
            Chunk::Binary(v) => v.as_slice(),
            Chunk::Raw(r) => r,
        }
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

// Borrowed inputs are copied; owned inputs are not.
impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(v: Vec<u8>) -> Self {
        Chunk::Binary(v)
    }
}

impl From<&[u8]> for Chunk {
    fn from(v: &[u8]) -> Self {
        Chunk::Binary(v.to_vec())
    }
}

impl From<Box<[u8]>> for Chunk {
    fn from(r: Box<[u8]>) -> Self {
        Chunk::Raw(r)
    }
}

struct Queued {
    chunk: Chunk,
    read: usize,
}

/// FIFO of [`Chunk`]s with a consumed offset on the front element.
///
/// Invariants: `read <= chunk.len()` for every element; no queued element is
/// empty; an element is popped only once fully consumed. No size limit is
/// enforced here.
#[derive(Default)]
pub struct ByteQueue {
    elements: VecDeque<Queued>,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self {
            elements: VecDeque::new(),
        }
    }

    /// Append an element at the tail. Empty elements are dropped: they carry
    /// no bytes and would wedge the front of the queue, since consumption is
    /// always by a positive byte count.
    pub fn push(&mut self, chunk: impl Into<Chunk>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.elements.push_back(Queued { chunk, read: 0 });
    }

    /// True iff at least `len` unconsumed bytes are queued, without copying or
    /// removing anything. `has(0)` is always true.
    pub fn has(&self, len: usize) -> bool {
        let mut accounted = 0usize;
        for q in &self.elements {
            accounted += q.chunk.len() - q.read;
            if accounted >= len {
                return true;
            }
        }
        len <= accounted
    }

    /// Total unconsumed bytes across all elements.
    pub fn remaining(&self) -> usize {
        self.elements.iter().map(|q| q.chunk.len() - q.read).sum()
    }

    /// True iff `len` unconsumed bytes end exactly on an element boundary, so
    /// that many bytes can be taken as whole elements.
    pub fn aligned(&self, len: usize) -> bool {
        let mut accounted = 0usize;
        for q in &self.elements {
            if accounted == len {
                return true;
            }
            accounted += q.chunk.len() - q.read;
            if accounted > len {
                return false;
            }
        }
        accounted == len
    }

    /// Unconsumed length of the front element, or None if the queue is empty.
    pub fn peek_next_len(&self) -> Option<usize> {
        self.elements.front().map(|q| q.chunk.len() - q.read)
    }

    /// Remove and return the front element by ownership transfer.
    ///
    /// The caller's protocol guarantees the front element has not been
    /// partially consumed when taking (the producer either takes whole
    /// elements or advances, never both on one element).
    pub fn take_front(&mut self) -> Option<Chunk> {
        let q = self.elements.pop_front()?;
        debug_assert_eq!(q.read, 0, "take_front on partially consumed element");
        Some(q.chunk)
    }

    /// Mark `len` bytes consumed from the front, popping elements as they
    /// drain. Advancing past the total remaining bytes is a caller contract
    /// violation and panics rather than clamping.
    pub fn advance(&mut self, mut len: usize) {
        while len > 0 {
            let front = self
                .elements
                .front_mut()
                .expect("advance past end of byte queue");
            let avail = front.chunk.len() - front.read;
            let step = avail.min(len);
            front.read += step;
            len -= step;
            if front.read >= front.chunk.len() {
                self.elements.pop_front();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_zero_always_true() {
        let q = ByteQueue::new();
        assert!(q.has(0));
        assert!(!q.has(1));
    }

    #[test]
    fn remaining_tracks_push_take_advance() {
        let mut q = ByteQueue::new();
        q.push("hello");
        q.push(vec![1u8, 2, 3]);
        q.push(vec![9u8; 4].into_boxed_slice());
        assert_eq!(q.remaining(), 12);
        assert!(q.has(12));
        assert!(!q.has(13));

        q.advance(2);
        assert_eq!(q.remaining(), 10);
        assert!(q.has(10));
        assert!(!q.has(11));

        q.advance(3); // drains "hello"
        assert_eq!(q.remaining(), 7);
        assert_eq!(q.take_front(), Some(Chunk::Binary(vec![1, 2, 3])));
        assert_eq!(q.remaining(), 4);
    }

    #[test]
    fn take_preserves_fifo_order() {
        let mut q = ByteQueue::new();
        q.push("aa");
        q.push(vec![1u8, 2, 3]);
        q.push("cccc");
        assert_eq!(q.peek_next_len(), Some(2));
        assert_eq!(q.take_front(), Some(Chunk::Text("aa".to_string())));
        assert_eq!(q.peek_next_len(), Some(3));
        assert_eq!(q.take_front(), Some(Chunk::Binary(vec![1, 2, 3])));
        assert_eq!(q.take_front(), Some(Chunk::Text("cccc".to_string())));
        assert_eq!(q.take_front(), None);
        assert_eq!(q.peek_next_len(), None);
    }

    #[test]
    fn advance_through_first_element_exposes_second() {
        let mut q = ByteQueue::new();
        q.push("ab");
        q.push("cd");
        q.advance(2);
        assert_eq!(q.take_front(), Some(Chunk::Text("cd".to_string())));
        assert!(q.is_empty());
    }

    #[test]
    fn partial_advance_shortens_front() {
        let mut q = ByteQueue::new();
        q.push("abcd");
        q.advance(3);
        assert_eq!(q.peek_next_len(), Some(1));
        assert!(q.has(1));
        assert!(!q.has(2));
        q.advance(1);
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic(expected = "advance past end")]
    fn advance_past_end_panics() {
        let mut q = ByteQueue::new();
        q.push("ab");
        q.advance(3);
    }

    #[test]
    fn empty_elements_are_dropped_on_push() {
        let mut q = ByteQueue::new();
        q.push("");
        q.push(Vec::<u8>::new());
        assert!(q.is_empty());
        assert_eq!(q.peek_next_len(), None);
        q.push("a");
        q.push("");
        q.push("b");
        assert_eq!(q.remaining(), 2);
        assert_eq!(q.take_front(), Some(Chunk::Text("a".to_string())));
        assert_eq!(q.take_front(), Some(Chunk::Text("b".to_string())));
    }

    #[test]
    fn aligned_only_on_element_boundaries() {
        let mut q = ByteQueue::new();
        assert!(q.aligned(0));
        assert!(!q.aligned(1));
        q.push("abc");
        q.push("de");
        assert!(q.aligned(0));
        assert!(q.aligned(3));
        assert!(q.aligned(5));
        assert!(!q.aligned(2));
        assert!(!q.aligned(4));
        assert!(!q.aligned(6));
        q.advance(1);
        assert!(q.aligned(2));
        assert!(!q.aligned(3));
        assert!(q.aligned(4));
    }
}
