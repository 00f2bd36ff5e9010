//! ContiguousArray: a growable array over one allocator-provided block.
//!
//! Slots `[0, len)` are live, `[len, capacity)` are uninitialized. Growth
//! goes through [`ContiguousArray::reserve`] (exact) or the internal
//! amortized path used by every inserting operation, which at least doubles
//! the capacity so that `N` appends cost `O(N)` relocations in total.
//!
//! Indexing with `array[i]` goes through the slice and panics out of range;
//! [`ContiguousArray::at`] is the checked accessor reporting `OutOfRange`,
//! and `get_unchecked` (via the slice) is the unchecked one whose
//! precondition `i < len` is the caller's responsibility.

use crate::alloc::{Global, RawAllocator};
use crate::error::{CollectionError, Result};
use crate::raw_buffer::RawBuffer;
use core::fmt;
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut, Range};
use core::ptr;
use core::slice;

/// Capacity of the first allocation made by the amortized growth path.
pub const BASE_CAPACITY: usize = 16;
/// Multiplier applied to the capacity whenever the amortized path grows.
pub const GROWTH_FACTOR: usize = 2;

pub struct ContiguousArray<T, A: RawAllocator = Global> {
    buf: RawBuffer<T, A>,
    len: usize,
}

impl<T> ContiguousArray<T> {
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(cap: usize) -> Result<Self> {
        Self::with_capacity_in(cap, Global)
    }

    /// `count` clones of `value`.
    pub fn from_elem(value: T, count: usize) -> Result<Self>
    where
        T: Clone,
    {
        let mut out = Self::with_capacity(count)?;
        out.resize(count, value)?;
        Ok(out)
    }
}

impl<T> Default for ContiguousArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: RawAllocator> ContiguousArray<T, A> {
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuffer::new_in(alloc),
            len: 0,
        }
    }

    pub fn with_capacity_in(cap: usize, alloc: A) -> Result<Self> {
        Ok(Self {
            buf: RawBuffer::with_capacity_in(cap, alloc)?,
            len: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Largest length the allocator could ever back.
    pub fn max_len(&self) -> usize {
        self.buf.max_capacity()
    }

    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    /// Bounds-checked access.
    pub fn at(&self, index: usize) -> Result<&T> {
        self.as_slice()
            .get(index)
            .ok_or(CollectionError::out_of_range(index, self.len))
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(CollectionError::out_of_range(index, len))
    }

    /// Ensure `capacity() >= cap`, allocating exactly `cap` slots if it has
    /// to grow. Never shrinks. On error the array is unchanged.
    pub fn reserve(&mut self, cap: usize) -> Result<()> {
        if cap <= self.capacity() {
            return Ok(());
        }
        self.buf.relocate(cap, self.len)
    }

    /// Amortized growth: make room for `required` slots, at least doubling.
    fn grow_for(&mut self, required: usize) -> Result<()> {
        let cap = self.capacity();
        if required <= cap {
            return Ok(());
        }
        let max = self.max_len();
        if required > max {
            return Err(CollectionError::length_error(required, max));
        }
        let target = required
            .max(cap.saturating_mul(GROWTH_FACTOR))
            .max(BASE_CAPACITY)
            .min(max);
        self.buf.relocate(target, self.len)
    }

    fn required_for(&self, additional: usize) -> Result<usize> {
        self.len
            .checked_add(additional)
            .ok_or_else(|| CollectionError::length_error(usize::MAX, self.max_len()))
    }

    /// Reallocate so that `capacity() == len()`.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if self.capacity() > self.len {
            self.buf.relocate(self.len, self.len)?;
        }
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.capacity() {
            self.grow_for(self.required_for(1)?)?;
        }
        unsafe { self.buf.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.buf.as_ptr().add(self.len).read() })
    }

    /// Insert `value` before `index`; `index == len()` appends.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        let mut value = Some(value);
        self.insert_with(index, 1, || value.take())
    }

    /// Insert `count` clones of `value` before `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        self.insert_with(index, count, || Some(value.clone()))
    }

    /// Insert every item of `items` before `index`, in order.
    ///
    /// The items are gathered first, so a panicking iterator leaves the
    /// array as it was.
    pub fn insert_from<I>(&mut self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        A: Clone,
    {
        if index > self.len {
            return Err(CollectionError::out_of_range(index, self.len));
        }
        let mut staged = ContiguousArray::new_in(self.allocator().clone());
        for item in items {
            staged.push(item)?;
        }
        let count = staged.len;
        self.grow_for(self.required_for(count)?)?;
        unsafe {
            let at = self.buf.as_ptr().add(index);
            ptr::copy(at, at.add(count), self.len - index);
            ptr::copy_nonoverlapping(staged.buf.as_ptr(), at, count);
            staged.len = 0;
        }
        self.len += count;
        Ok(())
    }

    /// Open a gap of `count` slots at `index` and fill it from `next`.
    ///
    /// If `next` panics, the values already written are dropped and the tail
    /// is moved back, leaving the array as it was before the call.
    fn insert_with<F>(&mut self, index: usize, count: usize, mut next: F) -> Result<()>
    where
        F: FnMut() -> Option<T>,
    {
        if index > self.len {
            return Err(CollectionError::out_of_range(index, self.len));
        }
        self.grow_for(self.required_for(count)?)?;

        struct Gap<'a, T> {
            base: *mut T,
            index: usize,
            count: usize,
            filled: usize,
            tail: usize,
            len: &'a mut usize,
        }

        impl<T> Drop for Gap<'_, T> {
            fn drop(&mut self) {
                unsafe {
                    let at = self.base.add(self.index);
                    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(at, self.filled));
                    ptr::copy(at.add(self.count), at, self.tail);
                }
                *self.len = self.index + self.tail;
            }
        }

        let tail = self.len - index;
        let base = self.buf.as_ptr();
        // Hide the shifted tail from `Drop` while the gap is open.
        self.len = index;
        unsafe { ptr::copy(base.add(index), base.add(index + count), tail) };
        let mut gap = Gap {
            base,
            index,
            count,
            filled: 0,
            tail,
            len: &mut self.len,
        };
        while gap.filled < count {
            let Some(value) = next() else { break };
            unsafe { base.add(index + gap.filled).write(value) };
            gap.filled += 1;
        }
        if gap.filled < count {
            drop(gap);
            return Err(CollectionError::invalid_argument(
                "item source ended before the gap was filled",
            ));
        }
        let total = index + count + tail;
        mem::forget(gap);
        self.len = total;
        Ok(())
    }

    /// Remove and return the element at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(CollectionError::out_of_range(index, self.len));
        }
        unsafe {
            let at = self.buf.as_ptr().add(index);
            let value = at.read();
            ptr::copy(at.add(1), at, self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Drop the elements in `range` and close the gap.
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        let Range { start, end } = range;
        if end > self.len {
            return Err(CollectionError::out_of_range(end, self.len));
        }
        if start > end {
            return Err(CollectionError::out_of_range(start, end));
        }
        let tail = self.len - end;
        // If a destructor panics the tail leaks instead of dropping twice.
        self.len = start;
        unsafe {
            let at = self.buf.as_ptr().add(start);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(at, end - start));
            ptr::copy(at.add(end - start), at, tail);
        }
        self.len = start + tail;
        Ok(())
    }

    /// Keep the first `len` elements, dropping the rest.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let dropped = self.len - len;
        self.len = len;
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.buf.as_ptr().add(len),
                dropped,
            ));
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F) -> Result<()>
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        let at = self.len;
        self.insert_with(at, new_len - at, || Some(f()))
    }

    pub fn resize(&mut self, new_len: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone())
    }

    /// Replace the contents with `count` clones of `value`.
    pub fn assign(&mut self, count: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        self.clear();
        self.reserve(count)?;
        self.resize(count, value)
    }

    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()>
    where
        T: Clone,
    {
        let mut it = items.iter();
        let at = self.len;
        self.insert_with(at, items.len(), || it.next().cloned())
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Deep copy. Either every element is cloned or nothing is kept.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
        A: Clone,
    {
        let mut out = Self::with_capacity_in(self.len, self.allocator().clone())?;
        out.extend_from_slice(self.as_slice())?;
        Ok(out)
    }
}

impl<T, A: RawAllocator> Drop for ContiguousArray<T, A> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

impl<T, A: RawAllocator> Deref for ContiguousArray<T, A> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: RawAllocator> DerefMut for ContiguousArray<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: RawAllocator + Clone> Clone for ContiguousArray<T, A> {
    /// Panics if the allocator refuses the copy; use `try_clone` to observe
    /// the error instead.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(out) => out,
            Err(e) => panic!("ContiguousArray::clone: {e}"),
        }
    }
}

// Slice equality is element-wise; core compares bytes directly for element
// types where that is equivalent.
impl<T, U, A, B> PartialEq<ContiguousArray<U, B>> for ContiguousArray<T, A>
where
    T: PartialEq<U>,
    A: RawAllocator,
    B: RawAllocator,
{
    fn eq(&self, other: &ContiguousArray<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: RawAllocator> Eq for ContiguousArray<T, A> {}

impl<T: fmt::Debug, A: RawAllocator> fmt::Debug for ContiguousArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// `[a, b, c]`
impl<T: fmt::Display, A: RawAllocator> fmt::Display for ContiguousArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

impl<T, A: RawAllocator> Extend<T> for ContiguousArray<T, A> {
    /// Panics if the allocator refuses to grow.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            if let Err(e) = self.push(item) {
                panic!("ContiguousArray::extend: {e}");
            }
        }
    }
}

impl<T> FromIterator<T> for ContiguousArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl<'a, T, A: RawAllocator> IntoIterator for &'a ContiguousArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: RawAllocator> IntoIterator for &'a mut ContiguousArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: RawAllocator> IntoIterator for ContiguousArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;
    fn into_iter(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        // Ownership of the buffer moves into the iterator; `this` is never
        // dropped.
        let buf = unsafe { ptr::read(&this.buf) };
        IntoIter {
            buf,
            start: 0,
            end: this.len,
        }
    }
}

/// Owning iterator over the elements of a [`ContiguousArray`].
pub struct IntoIter<T, A: RawAllocator = Global> {
    buf: RawBuffer<T, A>,
    start: usize,
    end: usize,
}

impl<T, A: RawAllocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let value = unsafe { self.buf.as_ptr().add(self.start).read() };
        self.start += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.start;
        (n, Some(n))
    }
}

impl<T, A: RawAllocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { self.buf.as_ptr().add(self.end).read() })
    }
}

impl<T, A: RawAllocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: RawAllocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.buf.as_ptr().add(self.start),
                self.end - self.start,
            ));
        }
    }
}
