//! Iterators over a [`RobinHoodTable`](crate::RobinHoodTable).
//!
//! All of them walk the bucket array in physical order, skip empty buckets
//! and stop after the bucket flagged as last.

use crate::alloc::{Global, RawAllocator};
use crate::bucket::{Bucket, Distance};
use crate::contiguous_array;
use core::iter::FusedIterator;
use core::slice;

/// Shared iterator over `(&K, &V)`.
pub struct Iter<'a, K, V> {
    buckets: slice::Iter<'a, Bucket<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(buckets: &'a [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for bucket in self.buckets.by_ref() {
            if let Some((k, v)) = bucket.entry() {
                self.remaining -= 1;
                return Some((k, v));
            }
            if bucket.is_last() {
                break;
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            remaining: self.remaining,
        }
    }
}

/// Iterator over `(&K, &mut V)`. Keys stay immutable so their hashes do not
/// change under the table.
pub struct IterMut<'a, K, V> {
    buckets: slice::IterMut<'a, Bucket<K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(buckets: &'a mut [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter_mut(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for bucket in self.buckets.by_ref() {
            let last = bucket.is_last();
            if let Some((k, v)) = bucket.entry_mut() {
                self.remaining -= 1;
                return Some((&*k, v));
            }
            if last {
                break;
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator; entries not yet yielded are dropped with it.
pub struct IntoIter<K, V, A: RawAllocator = Global> {
    buckets: contiguous_array::IntoIter<Bucket<K, V>, A>,
    remaining: usize,
}

impl<K, V, A: RawAllocator> IntoIter<K, V, A> {
    pub(crate) fn new(buckets: contiguous_array::IntoIter<Bucket<K, V>, A>, len: usize) -> Self {
        Self {
            buckets,
            remaining: len,
        }
    }
}

impl<K, V, A: RawAllocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        if self.remaining == 0 {
            return None;
        }
        for mut bucket in self.buckets.by_ref() {
            if let Some((_, _, entry)) = bucket.take() {
                self.remaining -= 1;
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, A: RawAllocator> ExactSizeIterator for IntoIter<K, V, A> {}
impl<K, V, A: RawAllocator> FusedIterator for IntoIter<K, V, A> {}

/// Entries sharing one ideal bucket, as returned by
/// [`RobinHoodTable::bucket_entries`](crate::RobinHoodTable::bucket_entries).
///
/// Walks forward from the ideal bucket: an entry `j` buckets along belongs
/// to it exactly when its recorded distance is `j`. Larger distances belong
/// to earlier buckets and are skipped; a smaller distance or an empty bucket
/// ends the run.
pub struct BucketEntries<'a, K, V> {
    buckets: &'a [Bucket<K, V>],
    index: usize,
    offset: Distance,
    mask: usize,
    done: bool,
}

impl<'a, K, V> BucketEntries<'a, K, V> {
    pub(crate) fn new(buckets: &'a [Bucket<K, V>], bucket: usize, mask: usize) -> Self {
        Self {
            buckets,
            index: bucket,
            offset: 0,
            mask,
            done: bucket >= buckets.len(),
        }
    }
}

impl<'a, K, V> Iterator for BucketEntries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.offset as usize > self.mask {
                self.done = true;
                break;
            }
            let bucket = &self.buckets[self.index];
            if bucket.distance() < self.offset {
                self.done = true;
                break;
            }
            let found = bucket.distance() == self.offset;
            self.index = (self.index + 1) & self.mask;
            self.offset += 1;
            if found {
                if let Some((k, v)) = bucket.entry() {
                    return Some((k, v));
                }
            }
        }
        None
    }
}

impl<K, V> FusedIterator for BucketEntries<'_, K, V> {}
