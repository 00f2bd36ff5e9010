//! Bucket: one slot of the Robin Hood table.
//!
//! The entry lives in `MaybeUninit` storage and is initialized exactly when
//! `distance != EMPTY`. Every method that writes or reads the entry keeps
//! that pairing intact, including across panics in user `Drop` impls.

use core::mem::{self, MaybeUninit};

/// Displacement of an entry from its ideal bucket.
pub(crate) type Distance = i32;

/// Low 32 bits of the key's hash, cached next to the entry.
pub(crate) type TruncatedHash = u32;

pub(crate) const EMPTY: Distance = -1;

#[inline]
pub(crate) fn truncate_hash(hash: u64) -> TruncatedHash {
    hash as TruncatedHash
}

pub(crate) struct Bucket<K, V> {
    distance: Distance,
    last: bool,
    hash: TruncatedHash,
    entry: MaybeUninit<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    pub(crate) const fn empty() -> Self {
        Self {
            distance: EMPTY,
            last: false,
            hash: 0,
            entry: MaybeUninit::uninit(),
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.distance == EMPTY
    }

    #[inline]
    pub(crate) fn is_last(&self) -> bool {
        self.last
    }

    pub(crate) fn set_as_last(&mut self) {
        self.last = true;
    }

    /// `EMPTY` for an empty bucket.
    #[inline]
    pub(crate) fn distance(&self) -> Distance {
        self.distance
    }

    #[cfg(test)]
    pub(crate) fn truncated_hash(&self) -> TruncatedHash {
        self.hash
    }

    #[inline]
    pub(crate) fn hash_equals(&self, hash: u64) -> bool {
        self.hash == truncate_hash(hash)
    }

    #[inline]
    pub(crate) fn entry(&self) -> Option<&(K, V)> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.entry.assume_init_ref() })
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self) -> Option<&mut (K, V)> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.entry.assume_init_mut() })
    }

    /// Occupy an empty bucket.
    pub(crate) fn set_entry(&mut self, distance: Distance, hash: TruncatedHash, entry: (K, V)) {
        debug_assert!(self.is_empty());
        debug_assert!(distance >= 0);
        self.entry.write(entry);
        self.hash = hash;
        self.distance = distance;
    }

    /// Move the entry out, leaving the bucket empty.
    pub(crate) fn take(&mut self) -> Option<(Distance, TruncatedHash, (K, V))> {
        if self.is_empty() {
            return None;
        }
        let distance = mem::replace(&mut self.distance, EMPTY);
        Some((distance, self.hash, unsafe { self.entry.assume_init_read() }))
    }

    /// Drop the entry in place, if any.
    pub(crate) fn clear(&mut self) {
        if !self.is_empty() {
            // Mark empty first so a panicking destructor cannot cause a
            // second drop.
            self.distance = EMPTY;
            unsafe { self.entry.assume_init_drop() };
        }
    }

    /// Exchange the stored entry with the one being carried by an insertion.
    /// Ownership moves both ways; no destructor runs.
    pub(crate) fn swap_with_entry(
        &mut self,
        distance: &mut Distance,
        hash: &mut TruncatedHash,
        entry: &mut (K, V),
    ) {
        debug_assert!(!self.is_empty());
        mem::swap(&mut self.distance, distance);
        mem::swap(&mut self.hash, hash);
        mem::swap(unsafe { self.entry.assume_init_mut() }, entry);
    }
}

impl<K, V> Drop for Bucket<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Clone, V: Clone> Clone for Bucket<K, V> {
    fn clone(&self) -> Self {
        let mut out = Bucket::empty();
        out.last = self.last;
        if let Some(entry) = self.entry() {
            out.set_entry(self.distance, self.hash, entry.clone());
        }
        out
    }
}
