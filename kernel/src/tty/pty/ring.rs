//! Fixed-capacity byte ring used for both directions of a pty pair

use alloc::boxed::Box;
use alloc::vec;

/// Ring buffer size for PTY data transfer (same for both directions)
pub const PTY_BUFFER_SIZE: usize = 4096;

/// Circular byte buffer with an explicit occupancy count
///
/// `count` always equals the number of unread bytes; the producer and
/// consumer cursors wrap modulo the capacity and only move together with it.
pub struct ByteRing {
    data: Box<[u8]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl ByteRing {
    pub fn new() -> Self {
        Self::with_capacity(PTY_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of unread bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Free space left
    #[inline]
    pub fn space(&self) -> usize {
        self.capacity() - self.count
    }

    /// Append one byte; returns false if the ring is full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.tail] = byte;
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        true
    }

    /// Remove the oldest byte
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(byte)
    }

    /// Append as many bytes of `src` as fit, returning how many were taken
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.space());
        for &byte in &src[..n] {
            self.push(byte);
        }
        n
    }

    /// Drain up to `dst.len()` bytes into `dst`, returning how many were copied
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let mut read = 0;
        while read < dst.len() {
            match self.pop() {
                Some(byte) => {
                    dst[read] = byte;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Discard all unread bytes
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

impl Default for ByteRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_new_ring_is_empty() {
        let ring = ByteRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), PTY_BUFFER_SIZE);
        assert_eq!(ring.space(), PTY_BUFFER_SIZE);
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let mut ring = ByteRing::with_capacity(8);
        assert_eq!(ring.write(b"abc"), 3);
        assert_eq!(ring.write(b"de"), 2);

        let mut buf = [0u8; 8];
        let n = ring.read(&mut buf);
        assert_eq!(&buf[..n], b"abcde");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_write_stops_at_capacity() {
        let mut ring = ByteRing::with_capacity(4);
        assert_eq!(ring.write(b"abcdef"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.space(), 0);
        assert!(!ring.push(b'x'));
    }

    #[test]
    fn test_exact_fill_is_accepted() {
        let mut ring = ByteRing::with_capacity(4);
        assert_eq!(ring.write(b"ab"), 2);
        assert_eq!(ring.write(b"cd"), 2);
        assert!(ring.is_full());
    }

    #[test]
    fn test_partial_read() {
        let mut ring = ByteRing::with_capacity(8);
        ring.write(b"hello");

        let mut buf = [0u8; 2];
        assert_eq!(ring.read(&mut buf), 2);
        assert_eq!(&buf, b"he");
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_wraparound() {
        let mut ring = ByteRing::with_capacity(4);
        let mut out = Vec::new();
        let mut buf = [0u8; 3];

        // Cursors wrap several times; bytes must come back in order.
        for chunk in [&b"abc"[..], b"def", b"ghi", b"jkl"] {
            assert_eq!(ring.write(chunk), 3);
            let n = ring.read(&mut buf);
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcdefghijkl");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_count_tracks_push_and_pop() {
        let mut ring = ByteRing::with_capacity(3);
        assert!(ring.push(1));
        assert!(ring.push(2));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), None);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_clear() {
        let mut ring = ByteRing::with_capacity(4);
        ring.write(b"abc");
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.write(b"wxyz"), 4);
    }
}
