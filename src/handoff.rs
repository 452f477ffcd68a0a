//! Line hand-off from interrupt context to the foreground.
//!
//! ```text
//! Interrupt             LineQueue             Foreground
//! ─────────             ─────────             ──────────
//!
//! publish() ──────▶ [ line | line | ... ] ──▶ take() ──▶ send()
//! copy, O(len)        K fixed slots          copy out, blocking ok
//! ```
//!
//! Single producer, single consumer, same index scheme as
//! [`LogStream`](crate::logging::LogStream). A modem reply is several lines
//! back to back, so the queue holds [`LINE_QUEUE_DEPTH`] of them between
//! two foreground polls.
//!
//! When every slot is occupied the newest line is dropped and counted. The
//! queued lines stay intact and in order; replacing the oldest would mean
//! writing a slot the consumer may be copying.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::assembler::{LINE_CAPACITY, SENTINEL};

/// Lines held between two foreground polls (must be power of 2).
pub const LINE_QUEUE_DEPTH: usize = 8;

/// Single-producer single-consumer queue of completed lines.
pub struct LineQueue<const N: usize = LINE_CAPACITY, const K: usize = LINE_QUEUE_DEPTH> {
    lines: UnsafeCell<[[u8; N]; K]>,
    lens: UnsafeCell<[usize; K]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    published: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: One producer (interrupt context), one consumer (foreground).
// A slot belongs to the producer until `write_idx` passes it (Release) and
// to the consumer until `read_idx` passes it (Release), so no slot is ever
// accessed from both sides at once.
unsafe impl<const N: usize, const K: usize> Sync for LineQueue<N, K> {}
unsafe impl<const N: usize, const K: usize> Send for LineQueue<N, K> {}

impl<const N: usize, const K: usize> LineQueue<N, K> {
    const MASK: usize = K - 1;

    /// Create an empty queue.
    pub const fn new() -> Self {
        const { assert!(K.is_power_of_two(), "Line queue depth must be power of 2") };

        Self {
            lines: UnsafeCell::new([[0u8; N]; K]),
            lens: UnsafeCell::new([0usize; K]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            published: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Copy a completed line into the queue (interrupt side, never blocks).
    ///
    /// Returns `false` if all slots hold untaken lines; the new line is
    /// dropped in that case. Input longer than a slot is cut to fit.
    #[inline]
    pub fn publish(&self, line: &[u8]) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= K as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let idx = (write as usize) & Self::MASK;
        let len = line.len().min(N);

        // SAFETY: Slot `idx` is free, the consumer does not touch it until
        // `write_idx` is advanced below.
        unsafe {
            let slot: &mut [u8; N] = &mut (*self.lines.get())[idx];
            slot[..len].copy_from_slice(&line[..len]);
            (*self.lens.get())[idx] = len;
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Copy the oldest line out and free its slot (foreground side).
    #[inline]
    pub fn take(&self) -> Option<CompletedLine<N>> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let idx = (read as usize) & Self::MASK;
        let mut line = CompletedLine::empty();

        // SAFETY: Slot `idx` was published, the producer will not write it
        // until `read_idx` is advanced below.
        unsafe {
            let len = (*self.lens.get())[idx];
            let slot: &[u8; N] = &(*self.lines.get())[idx];
            line.bytes[..len].copy_from_slice(&slot[..len]);
            line.len = len;
        }

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(line)
    }

    /// Lines waiting to be taken.
    #[inline]
    pub fn pending(&self) -> usize {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read) as usize
    }

    /// Check if every slot is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pending() >= K
    }

    /// Lines accepted since creation.
    #[inline]
    pub fn published(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Lines dropped because the queue was full.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize, const K: usize> Default for LineQueue<N, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned copy of a line taken from a [`LineQueue`].
#[derive(Clone, Copy)]
pub struct CompletedLine<const N: usize = LINE_CAPACITY> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> CompletedLine<N> {
    const fn empty() -> Self {
        Self {
            bytes: [0u8; N],
            len: 0,
        }
    }

    /// Stored bytes, NUL sentinel included if the producer sent one.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Stored bytes with a trailing NUL sentinel removed.
    pub fn as_bytes(&self) -> &[u8] {
        match self.as_bytes_with_nul().split_last() {
            Some((&SENTINEL, rest)) => rest,
            _ => self.as_bytes_with_nul(),
        }
    }

    /// Content as text, if valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> core::fmt::Debug for CompletedLine<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompletedLine")
            .field("bytes", &self.as_bytes_with_nul())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_then_take() {
        let queue = LineQueue::<16, 2>::new();
        assert!(queue.take().is_none());

        assert!(queue.publish(b"OK\r\0"));
        assert_eq!(queue.pending(), 1);

        let line = queue.take().unwrap();
        assert_eq!(line.as_bytes_with_nul(), b"OK\r\0");
        assert_eq!(line.as_bytes(), b"OK\r");
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_lines_taken_in_order() {
        let queue = LineQueue::<16, 4>::new();
        queue.publish(b"AT+GMR\r\0");
        queue.publish(b"OK\r\0");

        assert_eq!(queue.take().unwrap().as_bytes(), b"AT+GMR\r");
        assert_eq!(queue.take().unwrap().as_bytes(), b"OK\r");
        assert!(queue.take().is_none());
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let queue = LineQueue::<16, 2>::new();

        assert!(queue.publish(b"first\0"));
        assert!(queue.publish(b"second\0"));
        assert!(queue.is_full());
        assert!(!queue.publish(b"third\0"));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.published(), 2);

        assert_eq!(queue.take().unwrap().as_bytes(), b"first");
        assert!(queue.publish(b"fourth\0"));
        assert_eq!(queue.take().unwrap().as_bytes(), b"second");
        assert_eq!(queue.take().unwrap().as_bytes(), b"fourth");
    }

    #[test]
    fn test_slot_reuse_after_wrap() {
        let queue = LineQueue::<8, 2>::new();
        for _ in 0..5 {
            queue.publish(b"LONGER\0");
            queue.take();
        }
        queue.publish(b"OK\0");
        assert_eq!(queue.take().unwrap().as_bytes(), b"OK");
    }

    #[test]
    fn test_oversized_input_cut_to_fit() {
        let queue = LineQueue::<4, 2>::new();
        assert!(queue.publish(b"ABCDEFG"));
        assert_eq!(queue.take().unwrap().as_bytes(), b"ABCD");
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        use std::sync::Arc;
        use std::thread;

        let queue = Arc::new(LineQueue::<8, 4>::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..1000u32 {
                    let b = b'0' + (i % 10) as u8;
                    queue.publish(&[b, b, b, 0]);
                }
            })
        };

        let mut taken = 0u32;
        while !producer.is_finished() || queue.pending() > 0 {
            if let Some(line) = queue.take() {
                // A torn copy would mix digits
                let bytes = line.as_bytes();
                assert_eq!(bytes.len(), 3);
                assert!(bytes.iter().all(|&b| b == bytes[0]));
                taken += 1;
            }
        }
        producer.join().unwrap();

        assert_eq!(taken + queue.dropped(), 1000);
    }
}
