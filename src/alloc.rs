//! Allocator policy injected into every container.
//!
//! Containers never call the global allocator directly; they hold an
//! implementation of [`RawAllocator`] as a field and route every
//! allocation through it. Construction and destruction of elements in the
//! returned memory is done by the container (`ptr::write` /
//! `ptr::drop_in_place`), so the allocator only deals in raw bytes.

use crate::error::{CollectionError, Result};
use core::alloc::Layout;
use core::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of raw, uninitialized memory.
///
/// # Safety
///
/// `allocate` must either fail or return a pointer to a block valid for
/// reads and writes of `layout.size()` bytes, aligned to `layout.align()`,
/// that stays valid until it is passed back to `deallocate` with the same
/// layout. Callers never request zero-sized layouts.
pub unsafe trait RawAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or a clone of it)
    /// with exactly `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Largest block, in bytes, this allocator can hand out.
    fn max_size(&self) -> usize {
        isize::MAX as usize
    }

    /// Largest element count of `T` a single block can hold.
    fn max_elements<T>(&self) -> usize {
        match core::mem::size_of::<T>() {
            0 => usize::MAX,
            n => self.max_size() / n,
        }
    }
}

/// The process-wide heap, via `std::alloc`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAllocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| CollectionError::allocation_failure(layout.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

/// Counters shared by a [`TrackingAllocator`] and all of its clones.
#[derive(Debug)]
pub struct AllocStats {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    bytes_allocated: AtomicUsize,
    bytes_live: AtomicUsize,
    peak_bytes: AtomicUsize,
    limit: AtomicUsize,
}

impl AllocStats {
    fn new() -> Self {
        Self {
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            bytes_allocated: AtomicUsize::new(0),
            bytes_live: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            limit: AtomicUsize::new(usize::MAX),
        }
    }

    /// Number of successful `allocate` calls.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Total bytes ever handed out, including blocks already freed.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    /// Bytes currently outstanding.
    pub fn bytes_live(&self) -> usize {
        self.bytes_live.load(Ordering::Relaxed)
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Allocations that would push `bytes_live` above `limit` fail with
    /// `AllocationFailure`. `usize::MAX` disables the limit.
    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    /// True when every block handed out has been returned.
    pub fn is_balanced(&self) -> bool {
        self.allocations() == self.deallocations() && self.bytes_live() == 0
    }
}

/// Allocator wrapper that records every request made through it.
///
/// The counters live behind an `Arc`, so a container and the clones of the
/// allocator it makes internally all report into the same [`AllocStats`].
/// Nothing is global: tracking covers exactly the containers built with
/// this instance.
#[derive(Debug, Clone)]
pub struct TrackingAllocator<A = Global> {
    inner: A,
    stats: Arc<AllocStats>,
}

impl TrackingAllocator<Global> {
    pub fn new() -> Self {
        Self::wrap(Global)
    }
}

impl Default for TrackingAllocator<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TrackingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            stats: Arc::new(AllocStats::new()),
        }
    }

    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }
}

unsafe impl<A: RawAllocator> RawAllocator for TrackingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let size = layout.size();
        let live = self.stats.bytes_live();
        if live.saturating_add(size) > self.stats.limit.load(Ordering::Relaxed) {
            return Err(CollectionError::allocation_failure(size));
        }
        let ptr = self.inner.allocate(layout)?;
        self.stats.allocations.fetch_add(1, Ordering::Relaxed);
        self.stats.bytes_allocated.fetch_add(size, Ordering::Relaxed);
        let now = self.stats.bytes_live.fetch_add(size, Ordering::Relaxed) + size;
        self.stats.peak_bytes.fetch_max(now, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.deallocations.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_live
            .fetch_sub(layout.size(), Ordering::Relaxed);
        self.inner.deallocate(ptr, layout)
    }

    fn max_size(&self) -> usize {
        self.inner.max_size()
    }
}
