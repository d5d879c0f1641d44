//! Line buffer pool shared by the UART interrupt and the runner task.
//!
//! A fixed slab of `SLOTS` buffers, each `CAP` bytes. A slot is either
//! unallocated (counts against nothing), free (warm, ready for reuse) or
//! held by exactly one [`LineBuffer`] handle. "Allocating" claims an
//! unallocated slot; "freeing" gives it back. Both sides only use
//! compare-and-swap on the slot state, so the interrupt never blocks.
//!
//! # Conservation
//!
//! `allocs - frees == live == free_len + held` at every quiescent point.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::{MAX_LINE, POOL_SLOTS};

const UNALLOCATED: u8 = 0;
const FREE: u8 = 1;
const HELD: u8 = 2;

struct Slot<const CAP: usize> {
    state: AtomicU8,
    len: UnsafeCell<usize>,
    data: UnsafeCell<[u8; CAP]>,
}

impl<const CAP: usize> Slot<CAP> {
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: Self = Self {
        state: AtomicU8::new(UNALLOCATED),
        len: UnsafeCell::new(0),
        data: UnsafeCell::new([0; CAP]),
    };
}

/// Exclusive handle on one pooled buffer.
///
/// Not `Clone`: whoever holds it (ISR while filling, handoff queue while in
/// transit, runner while processing) is the only writer. Dropping a handle
/// without [`BufferPool::release`] leaks the slot until reboot.
pub struct LineBuffer<'p, const CAP: usize = MAX_LINE> {
    slot: &'p Slot<CAP>,
    index: u8,
}

impl<'p, const CAP: usize> LineBuffer<'p, CAP> {
    /// Slot number inside the pool.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        // SAFETY: the handle is the slot's only accessor while HELD
        unsafe { *self.slot.len.get() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == CAP
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Filled bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        let len = self.len();
        // SAFETY: exclusive handle, len <= CAP
        unsafe { &(&*self.slot.data.get())[..len] }
    }

    /// Filled bytes, writable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len();
        // SAFETY: exclusive handle, len <= CAP
        unsafe { &mut (&mut *self.slot.data.get())[..len] }
    }

    /// Unfilled tail of the buffer.
    #[inline]
    pub fn spare_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        // SAFETY: exclusive handle, len <= CAP
        unsafe { &mut (&mut *self.slot.data.get())[len..] }
    }

    /// Set the fill length, clamped to capacity.
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        // SAFETY: exclusive handle
        unsafe { *self.slot.len.get() = len.min(CAP) };
    }

    /// Append as much of `bytes` as fits. Returns bytes copied.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let spare = self.spare_mut();
        let n = bytes.len().min(spare.len());
        spare[..n].copy_from_slice(&bytes[..n]);
        let len = self.len();
        self.set_len(len + n);
        n
    }

    /// Drop the first `n` bytes, moving the rest to the front.
    pub fn consume(&mut self, n: usize) {
        let len = self.len();
        let n = n.min(len);
        // SAFETY: exclusive handle
        let data = unsafe { &mut *self.slot.data.get() };
        data.copy_within(n..len, 0);
        self.set_len(len - n);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Give up the handle, keeping the slot HELD. Pair with `from_raw`.
    #[inline]
    pub(crate) fn into_raw(self) -> u8 {
        self.index
    }
}

/// Pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Slots currently allocated (free + held).
    pub live: u32,
    /// Highest `live` seen.
    pub max_live: u32,
    pub allocs: u32,
    pub frees: u32,
    /// Warm slots waiting for reuse.
    pub free_len: u32,
    /// Slots owned by a handle, the handoff queue or the ISR.
    pub held: u32,
    /// `acquire` calls that found no slot.
    pub failures: u32,
}

/// Fixed-capacity buffer pool.
pub struct BufferPool<const SLOTS: usize = POOL_SLOTS, const CAP: usize = MAX_LINE> {
    slots: [Slot<CAP>; SLOTS],
    live: AtomicU32,
    max_live: AtomicU32,
    allocs: AtomicU32,
    frees: AtomicU32,
    failures: AtomicU32,
}

// SAFETY: slot data is only reachable through a LineBuffer, and a
// LineBuffer only exists for a slot whose state was CAS'd to HELD.
unsafe impl<const SLOTS: usize, const CAP: usize> Sync for BufferPool<SLOTS, CAP> {}
unsafe impl<const SLOTS: usize, const CAP: usize> Send for BufferPool<SLOTS, CAP> {}

impl<const SLOTS: usize, const CAP: usize> BufferPool<SLOTS, CAP> {
    pub const fn new() -> Self {
        assert!(SLOTS > 0 && SLOTS <= u8::MAX as usize, "pool needs 1..=255 slots");
        assert!(CAP > 0, "line buffers need capacity");

        Self {
            slots: [Slot::<CAP>::EMPTY; SLOTS],
            live: AtomicU32::new(0),
            max_live: AtomicU32::new(0),
            allocs: AtomicU32::new(0),
            frees: AtomicU32::new(0),
            failures: AtomicU32::new(0),
        }
    }

    /// Get a buffer, reusing a warm one before allocating.
    ///
    /// ISR-safe. `None` means the slab is exhausted; the caller drops
    /// whatever it wanted to store.
    pub fn acquire(&self) -> Option<LineBuffer<'_, CAP>> {
        for (i, slot) in self.slots.iter().enumerate() {
            if slot
                .state
                .compare_exchange(FREE, HELD, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(self.handle(i));
            }
        }

        for (i, slot) in self.slots.iter().enumerate() {
            if slot
                .state
                .compare_exchange(UNALLOCATED, HELD, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.allocs.fetch_add(1, Ordering::Relaxed);
                let live = self.live.fetch_add(1, Ordering::AcqRel) + 1;
                self.max_live.fetch_max(live, Ordering::Relaxed);
                return Some(self.handle(i));
            }
        }

        self.failures.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Return a buffer.
    ///
    /// With more than one buffer live the slot is freed outright; the last
    /// one stays warm for the next burst.
    pub fn release(&self, buf: LineBuffer<'_, CAP>) {
        let index = buf.index();
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        if !core::ptr::eq(slot, buf.slot) {
            return;
        }

        // SAFETY: still exclusive until the state store below
        unsafe { *slot.len.get() = 0 };

        if self.live.load(Ordering::Acquire) > 1 {
            self.live.fetch_sub(1, Ordering::AcqRel);
            self.frees.fetch_add(1, Ordering::Relaxed);
            slot.state.store(UNALLOCATED, Ordering::Release);
        } else {
            slot.state.store(FREE, Ordering::Release);
        }
    }

    /// Free every warm buffer. Returns how many were freed.
    ///
    /// Call only when the link is idle; held buffers are untouched.
    pub fn drain_idle(&self) -> u32 {
        let mut freed = 0;
        for slot in self.slots.iter() {
            if slot
                .state
                .compare_exchange(FREE, UNALLOCATED, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.live.fetch_sub(1, Ordering::AcqRel);
                self.frees.fetch_add(1, Ordering::Relaxed);
                freed += 1;
            }
        }
        freed
    }

    /// Buffers currently allocated.
    #[inline]
    pub fn live(&self) -> u32 {
        self.live.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let mut free_len = 0;
        let mut held = 0;
        for slot in self.slots.iter() {
            match slot.state.load(Ordering::Acquire) {
                FREE => free_len += 1,
                HELD => held += 1,
                _ => {}
            }
        }
        PoolStats {
            live: self.live(),
            max_live: self.max_live.load(Ordering::Relaxed),
            allocs: self.allocs.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            free_len,
            held,
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Rebuild a handle given up with `into_raw`.
    ///
    /// # Safety
    ///
    /// `index` must come from `into_raw` on a handle of this pool, and no
    /// other handle for it may exist.
    #[inline]
    pub(crate) unsafe fn from_raw(&self, index: u8) -> LineBuffer<'_, CAP> {
        self.handle(index as usize)
    }

    #[inline]
    fn handle(&self, index: usize) -> LineBuffer<'_, CAP> {
        LineBuffer {
            slot: &self.slots[index],
            index: index as u8,
        }
    }
}

impl<const SLOTS: usize, const CAP: usize> Default for BufferPool<SLOTS, CAP> {
    fn default() -> Self {
        Self::new()
    }
}
