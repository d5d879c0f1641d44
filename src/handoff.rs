//! ISR → task handoff queue.
//!
//! Lock-free SPSC ring of pool slot indices. The UART interrupt is the only
//! producer, the session runner the only consumer. Indices come out in the
//! order they went in, so byte order across buffers is preserved.
//!
//! # Memory Ordering
//!
//! - Producer writes the slot, then publishes with `Release` on `head`
//! - Consumer observes `head` with `Acquire` before reading the slot
//! - Same pairing in the other direction on `tail`

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::POOL_SLOTS;

/// Bounded SPSC queue of slot indices.
///
/// Size it at least as large as the pool: a slot is in the queue at most
/// once, so `push` can then never fail.
pub struct Handoff<const N: usize = POOL_SLOTS> {
    slots: UnsafeCell<[u8; N]>,
    /// Next write position (producer only).
    head: AtomicU32,
    /// Next read position (consumer only).
    tail: AtomicU32,
}

// SAFETY: one producer, one consumer, positions published atomically.
unsafe impl<const N: usize> Sync for Handoff<N> {}
unsafe impl<const N: usize> Send for Handoff<N> {}

impl<const N: usize> Handoff<N> {
    const MASK: u32 = (N as u32).wrapping_sub(1);

    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Handoff size must be power of 2");

        Self {
            slots: UnsafeCell::new([0; N]),
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }

    /// Enqueue a slot index. Producer side. Returns false when full.
    #[inline]
    pub fn push(&self, index: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) as usize >= N {
            return false;
        }

        // SAFETY: single producer; the consumer never reads past `head`
        unsafe {
            (&mut *self.slots.get())[(head & Self::MASK) as usize] = index;
        }
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest index. Consumer side.
    #[inline]
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        // SAFETY: single consumer; the producer never writes at `tail`
        // until it is released below
        let index = unsafe { (&*self.slots.get())[(tail & Self::MASK) as usize] };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for Handoff<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let q = Handoff::<4>::new();
        assert!(q.push(3));
        assert!(q.push(1));
        assert!(q.push(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_full_rejects() {
        let q = Handoff::<2>::new();
        assert!(q.push(0));
        assert!(q.push(1));
        assert!(!q.push(2));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_wraparound() {
        let q = Handoff::<2>::new();
        for i in 0..10u8 {
            assert!(q.push(i));
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.is_empty());
    }
}
