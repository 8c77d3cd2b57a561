/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A fixed-capacity byte ring that keeps the most recent bytes written to it.

use std::io;

/// Number of bytes kept by a [`RingBuffer`].
pub const RING_BUFFER_CAPACITY: usize = 1024;

/// Keeps the last [`RING_BUFFER_CAPACITY`] bytes written, overwriting the oldest.
#[derive(Clone)]
pub struct RingBuffer {
    buf: Box<[u8; RING_BUFFER_CAPACITY]>,
    // index of the next write
    head: usize,
    len: usize,
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len)
            .field("contents", &String::from_utf8_lossy(&self.contents()))
            .finish()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Creates an empty ring.
    pub fn new() -> Self {
        RingBuffer {
            buf: Box::new([0; RING_BUFFER_CAPACITY]),
            head: 0,
            len: 0,
        }
    }

    /// The fixed number of bytes this ring holds.
    pub fn capacity(&self) -> usize {
        RING_BUFFER_CAPACITY
    }

    /// Number of bytes currently held, never more than the capacity.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `data`, dropping the oldest bytes once full.
    pub fn push(&mut self, data: &[u8]) {
        // only the tail of an oversized write can survive
        let data = if data.len() > RING_BUFFER_CAPACITY {
            &data[data.len() - RING_BUFFER_CAPACITY..]
        } else {
            data
        };
        let first = (RING_BUFFER_CAPACITY - self.head).min(data.len());
        self.buf[self.head..self.head + first].copy_from_slice(&data[..first]);
        let rest = data.len() - first;
        self.buf[..rest].copy_from_slice(&data[first..]);
        self.head = (self.head + data.len()) % RING_BUFFER_CAPACITY;
        self.len = (self.len + data.len()).min(RING_BUFFER_CAPACITY);
    }

    /// The held bytes, oldest first.
    pub fn contents(&self) -> Vec<u8> {
        let start = (self.head + RING_BUFFER_CAPACITY - self.len) % RING_BUFFER_CAPACITY;
        let mut out = Vec::with_capacity(self.len);
        if start + self.len <= RING_BUFFER_CAPACITY {
            out.extend_from_slice(&self.buf[start..start + self.len]);
        } else {
            out.extend_from_slice(&self.buf[start..]);
            out.extend_from_slice(&self.buf[..self.head]);
        }
        out
    }
}

impl io::Write for RingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{RingBuffer, RING_BUFFER_CAPACITY};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn holds_everything_below_capacity() {
        let mut ring = RingBuffer::new();
        assert!(ring.is_empty());
        ring.push(b"hello ");
        ring.push(b"world");
        assert_eq!(ring.contents(), b"hello world");
        assert_eq!(ring.len(), 11);
    }

    #[test]
    fn keeps_the_tail_when_wrapping() {
        let mut ring = RingBuffer::new();
        let data: Vec<u8> = (0..RING_BUFFER_CAPACITY + 10).map(|i| i as u8).collect();
        ring.push(&data[..700]);
        ring.push(&data[700..]);
        assert_eq!(ring.len(), RING_BUFFER_CAPACITY);
        assert_eq!(ring.contents(), &data[10..]);
    }

    #[test]
    fn oversized_single_write() {
        let mut ring = RingBuffer::new();
        ring.push(b"abc");
        let data = vec![b'x'; RING_BUFFER_CAPACITY * 3];
        ring.push(&data);
        assert_eq!(ring.contents(), &data[..RING_BUFFER_CAPACITY]);
    }

    proptest! {
        #[test]
        fn contents_are_the_tail_of_all_writes(
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..600), 0..10)
        ) {
            let mut ring = RingBuffer::new();
            let mut all = vec![];
            for chunk in &chunks {
                ring.push(chunk);
                all.extend_from_slice(chunk);
            }
            let expected = &all[all.len().saturating_sub(RING_BUFFER_CAPACITY)..];
            prop_assert_eq!(ring.contents(), expected);
            prop_assert!(ring.len() <= ring.capacity());
        }
    }
}
