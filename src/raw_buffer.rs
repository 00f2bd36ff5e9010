//! RawBuffer: an owned block of uninitialized `T` slots.
//!
//! The buffer knows its capacity and its allocator but not how many slots
//! are live; the owner tracks that and is responsible for dropping live
//! elements before the buffer is released.

use crate::alloc::RawAllocator;
use crate::error::{CollectionError, Result};
use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};

pub(crate) struct RawBuffer<T, A: RawAllocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
}

// The buffer owns its `T`s exactly like a `Box<[T]>` would.
unsafe impl<T: Send, A: RawAllocator + Send> Send for RawBuffer<T, A> {}
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for RawBuffer<T, A> {}

impl<T, A: RawAllocator> RawBuffer<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
        }
    }

    pub(crate) fn with_capacity_in(cap: usize, alloc: A) -> Result<Self> {
        let mut buf = Self::new_in(alloc);
        if cap > buf.cap {
            buf.relocate(cap, 0)?;
        }
        Ok(buf)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    pub(crate) fn max_capacity(&self) -> usize {
        self.alloc.max_elements::<T>().min(isize::MAX as usize)
    }

    fn layout_for(&self, cap: usize) -> Result<Layout> {
        let max = self.max_capacity();
        if cap > max {
            return Err(CollectionError::length_error(cap, max));
        }
        Layout::array::<T>(cap).map_err(|_| CollectionError::length_error(cap, max))
    }

    /// Move the first `len` slots into a fresh block of exactly `new_cap`
    /// slots and release the old block. On error the buffer is untouched.
    ///
    /// Rust moves are bitwise, so relocation is a single non-overlapping
    /// copy for every `T`.
    pub(crate) fn relocate(&mut self, new_cap: usize, len: usize) -> Result<()> {
        debug_assert!(len <= new_cap && len <= self.cap);
        if Self::IS_ZST || new_cap == self.cap {
            return Ok(());
        }
        let new_ptr = if new_cap == 0 {
            NonNull::dangling()
        } else {
            let layout = self.layout_for(new_cap)?;
            let raw = self.alloc.allocate(layout)?;
            let new_ptr = raw.cast::<T>();
            unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len) };
            new_ptr
        };
        log::trace!(
            "relocating {} live slots from capacity {} to {}",
            len,
            self.cap,
            new_cap
        );
        self.release();
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    fn release(&mut self) {
        if Self::IS_ZST || self.cap == 0 {
            return;
        }
        // The layout was valid when this block was allocated.
        if let Ok(layout) = Layout::array::<T>(self.cap) {
            unsafe { self.alloc.deallocate(self.ptr.cast::<u8>(), layout) };
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }
}

impl<T, A: RawAllocator> Drop for RawBuffer<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{Global, TrackingAllocator};

    #[test]
    fn empty_buffer_does_not_allocate() {
        let a = TrackingAllocator::new();
        let buf: RawBuffer<u32, _> = RawBuffer::new_in(a.clone());
        assert_eq!(buf.capacity(), 0);
        drop(buf);
        assert_eq!(a.stats().allocations(), 0);
    }

    /// Invariant: relocation preserves the live prefix and frees the old block.
    #[test]
    fn relocate_preserves_prefix() {
        let a = TrackingAllocator::new();
        let mut buf: RawBuffer<u64, _> = RawBuffer::with_capacity_in(4, a.clone()).unwrap();
        for i in 0..4 {
            unsafe { buf.as_ptr().add(i).write(i as u64 * 10) };
        }
        buf.relocate(16, 4).unwrap();
        assert_eq!(buf.capacity(), 16);
        for i in 0..4 {
            assert_eq!(unsafe { buf.as_ptr().add(i).read() }, i as u64 * 10);
        }
        assert_eq!(a.stats().allocations(), 2);
        assert_eq!(a.stats().deallocations(), 1);
        drop(buf);
        assert!(a.stats().is_balanced());
    }

    #[test]
    fn oversized_request_is_a_length_error() {
        let mut buf: RawBuffer<u64, Global> = RawBuffer::new_in(Global);
        let err = buf.relocate(usize::MAX, 0).unwrap_err();
        assert_eq!(err.category(), "length_error");
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn zero_sized_types_never_allocate() {
        let buf: RawBuffer<(), Global> = RawBuffer::with_capacity_in(1000, Global).unwrap();
        assert_eq!(buf.capacity(), usize::MAX);
    }
}
