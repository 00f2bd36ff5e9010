//! RobinHoodTable: open addressing with Robin Hood displacement and
//! backward-shift deletion over a power-of-two bucket array.
//!
//! Every occupied bucket records how far it sits from its ideal bucket
//! (`hash & mask`). Insertion walks forward from the ideal bucket and hands
//! its slot to any occupant that is closer to home than the entry being
//! placed; the evicted occupant continues the walk. Lookups stop as soon as
//! the probe distance exceeds the distance stored in the bucket. Removal
//! pulls each following displaced entry back by one bucket, so the table
//! never holds tombstones.

use crate::alloc::{Global, RawAllocator};
use crate::bucket::{truncate_hash, Bucket, Distance, TruncatedHash};
use crate::contiguous_array::ContiguousArray;
use crate::error::{CollectionError, Result};
use crate::reentrancy::DebugReentrancy;
use crate::robin_hood_iter::{BucketEntries, IntoIter, Iter, IterMut};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::DefaultHashBuilder;

/// Load factor above which an insert grows the table.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.9;
/// Smallest non-zero bucket count.
pub const MIN_BUCKET_COUNT: usize = 4;
/// Probe distance that schedules a growth on the next insert.
pub const REHASH_HIGH_PROBE: usize = 128;
/// Below this load factor long probes are tolerated instead of growing.
pub const REHASH_MIN_LOAD_FACTOR: f32 = 0.15;

fn check_max_load_factor(factor: f32) -> Result<()> {
    if factor > 0.0 && factor <= 1.0 {
        Ok(())
    } else {
        Err(CollectionError::invalid_argument(format!(
            "max load factor {factor} is outside (0, 1]"
        )))
    }
}

/// Construction parameters for a [`RobinHoodTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Requested bucket count; rounded up to a power of two (0 allocates
    /// nothing until the first insert).
    pub bucket_count: usize,
    pub max_load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_count(mut self, count: usize) -> Self {
        self.bucket_count = count;
        self
    }

    pub fn max_load_factor(mut self, factor: f32) -> Self {
        self.max_load_factor = factor;
        self
    }

    /// Rejects a max load factor outside `(0, 1]`. Bucket counts are checked
    /// against the allocator when the table is built.
    pub fn validate(&self) -> Result<()> {
        check_max_load_factor(self.max_load_factor)
    }
}

/// Physical bucket holding an entry, as returned by `find` and `insert`.
///
/// A slot stays meaningful only until the table is next mutated; after
/// that it may name an empty bucket or a different entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slot(usize);

impl Slot {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn key<'a, K, V, S, A>(self, table: &'a RobinHoodTable<K, V, S, A>) -> Option<&'a K>
    where
        A: RawAllocator,
    {
        table.table.entry(self.0).map(|(k, _)| k)
    }

    pub fn value<'a, K, V, S, A>(self, table: &'a RobinHoodTable<K, V, S, A>) -> Option<&'a V>
    where
        A: RawAllocator,
    {
        table.table.entry(self.0).map(|(_, v)| v)
    }

    pub fn value_mut<'a, K, V, S, A>(
        self,
        table: &'a mut RobinHoodTable<K, V, S, A>,
    ) -> Option<&'a mut V>
    where
        A: RawAllocator,
    {
        table.table.entry_mut(self.0).map(|(_, v)| v)
    }
}

/// Bucket array plus the bookkeeping that drives growth. Knows nothing about
/// hashing beyond the `u64` values it is handed.
struct RawTable<K, V, A: RawAllocator> {
    buckets: ContiguousArray<Bucket<K, V>, A>,
    len: usize,
    mask: usize,
    load_threshold: usize,
    max_load_factor: f32,
    grow_at_next_insert: bool,
}

impl<K, V, A: RawAllocator> RawTable<K, V, A> {
    const fn new_in(alloc: A) -> Self {
        Self {
            buckets: ContiguousArray::new_in(alloc),
            len: 0,
            mask: 0,
            load_threshold: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            grow_at_next_insert: false,
        }
    }

    #[inline]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn max_bucket_count(&self) -> usize {
        match self.buckets.max_len() {
            0 => 0,
            max => 1 << (usize::BITS - 1 - max.leading_zeros()),
        }
    }

    fn threshold_for(&self, count: usize) -> usize {
        (count as f64 * f64::from(self.max_load_factor)) as usize
    }

    /// Fewest buckets whose threshold admits `n` entries.
    fn min_buckets_for(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let mut count = (n as f64 / f64::from(self.max_load_factor)).ceil() as usize;
        while self.threshold_for(count) < n && count < usize::MAX {
            count += 1;
        }
        count
    }

    fn round_up(&self, count: usize) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }
        let max = self.max_bucket_count();
        count
            .max(MIN_BUCKET_COUNT)
            .checked_next_power_of_two()
            .filter(|&n| n <= max)
            .ok_or_else(|| CollectionError::length_error(count, max))
    }

    fn load_factor(&self) -> f32 {
        match self.bucket_count() {
            0 => 0.0,
            n => self.len as f32 / n as f32,
        }
    }

    fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        check_max_load_factor(factor)?;
        self.max_load_factor = factor;
        self.load_threshold = self.threshold_for(self.bucket_count());
        Ok(())
    }

    #[inline]
    fn home(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    #[inline]
    fn next(&self, index: usize) -> usize {
        (index + 1) & self.mask
    }

    #[inline]
    fn entry(&self, index: usize) -> Option<&(K, V)> {
        self.buckets.get(index)?.entry()
    }

    #[inline]
    fn entry_mut(&mut self, index: usize) -> Option<&mut (K, V)> {
        self.buckets.get_mut(index)?.entry_mut()
    }

    fn find<F>(&self, hash: u64, mut eq: F) -> Option<usize>
    where
        F: FnMut(&K) -> bool,
    {
        if self.len == 0 {
            return None;
        }
        let mut index = self.home(hash);
        let mut dist: Distance = 0;
        loop {
            let bucket = &self.buckets[index];
            // Also stops on empty buckets, whose distance is negative.
            if bucket.distance() < dist {
                return None;
            }
            if bucket.hash_equals(hash) {
                if let Some((k, _)) = bucket.entry() {
                    if eq(k) {
                        return Some(index);
                    }
                }
            }
            index = self.next(index);
            dist += 1;
        }
    }

    /// Place an entry known to be absent. Requires a free bucket.
    fn place(&mut self, hash: u64, trunc: TruncatedHash, entry: (K, V), track_probe: bool) -> usize {
        debug_assert!(self.len < self.bucket_count());
        let mut index = self.home(hash);
        let mut dist: Distance = 0;
        while self.buckets[index].distance() >= dist {
            index = self.next(index);
            dist += 1;
        }

        let placed = index;
        let mut longest = dist;
        if self.buckets[index].is_empty() {
            self.buckets[index].set_entry(dist, trunc, entry);
        } else {
            let mut trunc = trunc;
            let mut carried = entry;
            self.buckets[index].swap_with_entry(&mut dist, &mut trunc, &mut carried);
            loop {
                index = self.next(index);
                dist += 1;
                longest = longest.max(dist);
                let bucket = &mut self.buckets[index];
                if bucket.is_empty() {
                    bucket.set_entry(dist, trunc, carried);
                    break;
                }
                if bucket.distance() < dist {
                    bucket.swap_with_entry(&mut dist, &mut trunc, &mut carried);
                }
            }
        }
        self.len += 1;
        if track_probe {
            self.note_probe(longest);
        }
        placed
    }

    fn note_probe(&mut self, dist: Distance) {
        if dist as usize > REHASH_HIGH_PROBE
            && !self.grow_at_next_insert
            && self.load_factor() >= REHASH_MIN_LOAD_FACTOR
        {
            log::debug!(
                "probe distance {} at load factor {:.3}; growing on next insert",
                dist,
                self.load_factor()
            );
            self.grow_at_next_insert = true;
        }
    }

    /// Take the entry at `index` out and shift the following run back.
    fn remove_at(&mut self, index: usize) -> Option<(K, V)> {
        let (_, _, entry) = self.buckets.get_mut(index)?.take()?;
        self.len -= 1;
        let mut gap = index;
        let mut cur = self.next(index);
        // An entry at distance 0 is home; everything before it has moved.
        while self.buckets[cur].distance() > 0 {
            if let Some((dist, trunc, moved)) = self.buckets[cur].take() {
                self.buckets[gap].set_entry(dist - 1, trunc, moved);
            }
            gap = cur;
            cur = self.next(cur);
        }
        Some(entry)
    }

    fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            if !bucket.is_empty() {
                self.len -= 1;
                bucket.clear();
            }
        }
        self.grow_at_next_insert = false;
    }
}

impl<K, V, A: RawAllocator + Clone> RawTable<K, V, A> {
    fn allocate_buckets(alloc: &A, count: usize) -> Result<ContiguousArray<Bucket<K, V>, A>> {
        let mut buckets = ContiguousArray::with_capacity_in(count, alloc.clone())?;
        buckets.resize_with(count, Bucket::empty)?;
        if let Some(last) = buckets.last_mut() {
            last.set_as_last();
        }
        Ok(buckets)
    }

    fn with_config(config: &TableConfig, alloc: A) -> Result<Self> {
        config.validate()?;
        let mut table = Self::new_in(alloc);
        table.max_load_factor = config.max_load_factor;
        let count = table.round_up(config.bucket_count)?;
        if count > 0 {
            table.buckets = Self::allocate_buckets(table.buckets.allocator(), count)?;
            table.mask = count - 1;
            table.load_threshold = table.threshold_for(count);
        }
        Ok(table)
    }

    /// Rebuild into `count` buckets (rounded up, and never fewer than the
    /// current entries need). On allocation failure nothing changes.
    ///
    /// Entries are re-bucketed from their stored truncated hash whenever the
    /// new mask fits in it; `hash_of` is only called for larger tables.
    fn rehash_to<H>(&mut self, count: usize, hash_of: H) -> Result<()>
    where
        H: Fn(&K) -> u64,
    {
        let count = self.round_up(count.max(self.min_buckets_for(self.len)))?;
        let fresh = Self::allocate_buckets(self.buckets.allocator(), count)?;
        log::trace!(
            "rehashing {} entries from {} to {} buckets",
            self.len,
            self.bucket_count(),
            count
        );
        let mut old = mem::replace(&mut self.buckets, fresh);
        self.mask = count.saturating_sub(1);
        self.load_threshold = self.threshold_for(count);
        self.grow_at_next_insert = false;
        self.len = 0;

        let use_stored = self.mask as u64 <= u64::from(TruncatedHash::MAX);
        for bucket in old.iter_mut() {
            if let Some((_, trunc, entry)) = bucket.take() {
                let hash = if use_stored {
                    u64::from(trunc)
                } else {
                    hash_of(&entry.0)
                };
                self.place(hash, trunc, entry, false);
            }
        }
        Ok(())
    }

    /// Make room for one more entry, growing when the load threshold or the
    /// long-probe heuristic asks for it.
    fn reserve_one<H>(&mut self, hash_of: H) -> Result<()>
    where
        H: Fn(&K) -> u64,
    {
        let needed = self
            .len
            .checked_add(1)
            .ok_or_else(|| CollectionError::length_error(usize::MAX, self.max_bucket_count()))?;
        if self.grow_at_next_insert || needed > self.load_threshold {
            let target = self
                .bucket_count()
                .saturating_mul(2)
                .max(self.min_buckets_for(needed));
            self.rehash_to(target, hash_of)?;
        }
        Ok(())
    }

    fn try_clone(&self) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        Ok(Self {
            buckets: self.buckets.try_clone()?,
            len: self.len,
            mask: self.mask,
            load_threshold: self.load_threshold,
            max_load_factor: self.max_load_factor,
            grow_at_next_insert: self.grow_at_next_insert,
        })
    }
}

/// Hash table keyed by `K`, with unique keys and first-insert-wins
/// semantics.
///
/// `S` builds the hash function and `A` supplies bucket memory. Entries are
/// stored inline in the bucket array; iteration visits them in bucket order,
/// which is unrelated to insertion order and changes across rehashes.
pub struct RobinHoodTable<K, V, S = DefaultHashBuilder, A: RawAllocator = Global> {
    table: RawTable<K, V, A>,
    hasher: S,
    reentrancy: DebugReentrancy,
}

impl<K, V> RobinHoodTable<K, V> {
    /// Empty table; the first insert allocates.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    pub fn with_capacity(bucket_count: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(bucket_count, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for RobinHoodTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> RobinHoodTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_in(hasher, Global)
    }

    pub fn with_capacity_and_hasher(bucket_count: usize, hasher: S) -> Result<Self> {
        Self::with_config(TableConfig::new().bucket_count(bucket_count), hasher, Global)
    }
}

impl<K, V, S, A: RawAllocator> RobinHoodTable<K, V, S, A> {
    pub fn with_hasher_in(hasher: S, alloc: A) -> Self {
        Self {
            table: RawTable::new_in(alloc),
            hasher,
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }

    /// Always zero or a power of two.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Largest power-of-two bucket count the allocator can back.
    pub fn max_bucket_count(&self) -> usize {
        self.table.max_bucket_count()
    }

    /// Most entries the table can hold at the current max load factor.
    pub fn max_len(&self) -> usize {
        self.table.threshold_for(self.table.max_bucket_count())
    }

    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor
    }

    /// Fails with `InvalidArgument` outside `(0, 1]`. A lower factor takes
    /// effect at the next insert.
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        self.table.set_max_load_factor(factor)
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn allocator(&self) -> &A {
        self.table.buckets.allocator()
    }

    /// Drop every entry, keeping the bucket array.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table.buckets, self.table.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.table.len;
        IterMut::new(&mut self.table.buckets, len)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Entries whose ideal bucket is `bucket`. Robin Hood ordering keeps
    /// them in one contiguous run.
    pub fn bucket_entries(&self, bucket: usize) -> BucketEntries<'_, K, V> {
        BucketEntries::new(&self.table.buckets, bucket, self.table.mask)
    }

    pub fn bucket_size(&self, bucket: usize) -> usize {
        self.bucket_entries(bucket).count()
    }
}

impl<K, V, S, A: RawAllocator + Clone> RobinHoodTable<K, V, S, A> {
    /// Fails with `InvalidArgument` for a bad load factor and `LengthError`
    /// when the bucket count exceeds [`max_bucket_count`](Self::max_bucket_count).
    pub fn with_config(config: TableConfig, hasher: S, alloc: A) -> Result<Self> {
        Ok(Self {
            table: RawTable::with_config(&config, alloc)?,
            hasher,
            reentrancy: DebugReentrancy::new(),
        })
    }

    /// Deep copy that reports allocation failure instead of panicking.
    pub fn try_clone(&self) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        Ok(Self {
            table: self.table.try_clone()?,
            hasher: self.hasher.clone(),
            reentrancy: DebugReentrancy::new(),
        })
    }
}

impl<K, V, S, A> RobinHoodTable<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    #[inline]
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Slot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find");
        let hash = self.make_hash(q);
        self.table.find(hash, |k| <K as Borrow<Q>>::borrow(k) == q).map(Slot)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    /// 1 if the key is stored, 0 otherwise.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        usize::from(self.contains_key(q))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find(q)?;
        slot.value(self)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find(q)?;
        self.table.entry(slot.0).map(|(k, v)| (k, v))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find(q)?;
        slot.value_mut(self)
    }

    /// Checked lookup: `KeyNotFound` when absent.
    pub fn at<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).ok_or(CollectionError::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).ok_or(CollectionError::KeyNotFound)
    }

    /// The zero-or-one entries equal to `q`.
    pub fn equal_range<Q>(&self, q: &Q) -> core::option::IntoIter<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).into_iter()
    }

    /// Ideal bucket of `q` under the current mask (not necessarily where the
    /// entry is stored).
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.home(self.make_hash(q))
    }

    /// Insert `key -> value` unless `key` is already stored.
    ///
    /// Returns the entry's slot and whether it was inserted. An existing
    /// entry keeps its value and the arguments are dropped.
    pub fn insert(&mut self, key: K, value: V) -> Result<(Slot, bool)> {
        self.insert_impl("insert", key, move || value)
    }

    /// Like [`insert`](Self::insert), but `make` only runs when the key is
    /// absent.
    pub fn insert_with<F>(&mut self, key: K, make: F) -> Result<(Slot, bool)>
    where
        F: FnOnce() -> V,
    {
        self.insert_impl("insert_with", key, make)
    }

    fn insert_impl<F>(&mut self, op: &'static str, key: K, make: F) -> Result<(Slot, bool)>
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter(op);
        let hash = self.hasher.hash_one(&key);
        if let Some(index) = self.table.find(hash, |k| *k == key) {
            return Ok((Slot(index), false));
        }
        let hasher = &self.hasher;
        self.table.reserve_one(|k| hasher.hash_one(k))?;
        let value = make();
        let index = self.table.place(hash, truncate_hash(hash), (key, value), true);
        Ok((Slot(index), true))
    }

    /// Insert `key -> value`, overwriting the value of an existing key.
    /// Returns the slot and the previous value, if any.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<(Slot, Option<V>)> {
        let _g = self.reentrancy.enter("insert_or_assign");
        let hash = self.hasher.hash_one(&key);
        if let Some(index) = self.table.find(hash, |k| *k == key) {
            let old = self
                .table
                .entry_mut(index)
                .map(|(_, v)| mem::replace(v, value));
            return Ok((Slot(index), old));
        }
        let hasher = &self.hasher;
        self.table.reserve_one(|k| hasher.hash_one(k))?;
        let index = self.table.place(hash, truncate_hash(hash), (key, value), true);
        Ok((Slot(index), None))
    }

    /// The value for `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&mut V>
    where
        F: FnOnce() -> V,
    {
        let (slot, _) = self.insert_with(key, make)?;
        slot.value_mut(self).ok_or(CollectionError::KeyNotFound)
    }

    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("remove");
        let hash = self.make_hash(q);
        let index = self.table.find(hash, |k| <K as Borrow<Q>>::borrow(k) == q)?;
        self.table.remove_at(index)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Remove `q` and drop its entry. Returns whether anything was removed.
    pub fn erase<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).is_some()
    }

    /// Remove the entry in `slot`, if the slot is occupied.
    pub fn remove_at(&mut self, slot: Slot) -> Option<(K, V)> {
        let _g = self.reentrancy.enter("remove_at");
        self.table.remove_at(slot.0)
    }

    /// Rebuild into at least `bucket_count` buckets (rounded up to a power of
    /// two, and never fewer than the current entries need).
    pub fn rehash(&mut self, bucket_count: usize) -> Result<()> {
        let _g = self.reentrancy.enter("rehash");
        let hasher = &self.hasher;
        self.table.rehash_to(bucket_count, |k| hasher.hash_one(k))
    }

    /// Make room for `count` entries without further growth.
    pub fn reserve(&mut self, count: usize) -> Result<()> {
        if count <= self.table.load_threshold {
            return Ok(());
        }
        let buckets = self.table.min_buckets_for(count);
        self.rehash(buckets)
    }

    /// Check the structural invariants: power-of-two sizing, the probe
    /// distance of every entry, Robin Hood ordering, the entry count and
    /// the last-bucket marker.
    #[cfg(test)]
    pub(crate) fn validate(&self) -> core::result::Result<(), String> {
        let t = &self.table;
        let count = t.bucket_count();
        if count != 0 && !count.is_power_of_two() {
            return Err(format!("bucket count {count} is not a power of two"));
        }
        if count != 0 && t.mask != count - 1 {
            return Err(format!("mask {} does not match {count} buckets", t.mask));
        }
        let mut occupied = 0;
        for (i, bucket) in t.buckets.iter().enumerate() {
            if bucket.is_last() != (i + 1 == count) {
                return Err(format!("last marker wrong at bucket {i}"));
            }
            let Some((k, _)) = bucket.entry() else {
                continue;
            };
            occupied += 1;
            let hash = self.make_hash(k);
            if !bucket.hash_equals(hash) {
                return Err(format!("stale truncated hash at bucket {i}"));
            }
            let home = t.home(hash);
            let expected = (i.wrapping_sub(home) & t.mask) as Distance;
            if bucket.distance() != expected {
                return Err(format!(
                    "bucket {i} records distance {} but sits {expected} from home {home}",
                    bucket.distance()
                ));
            }
            let next = &t.buckets[t.next(i)];
            if next.distance() > bucket.distance() + 1 {
                return Err(format!("Robin Hood ordering broken after bucket {i}"));
            }
            if t.find(hash, |other| other == k) != Some(i) {
                return Err(format!("entry at bucket {i} is not reachable by lookup"));
            }
        }
        if occupied != t.len {
            return Err(format!("{occupied} occupied buckets but len {}", t.len));
        }
        Ok(())
    }
}

impl<K, V, S, A> Clone for RobinHoodTable<K, V, S, A>
where
    K: Clone,
    V: Clone,
    S: Clone,
    A: RawAllocator + Clone,
{
    /// Panics if the allocator refuses the copy; `try_clone` reports it.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(out) => out,
            Err(e) => panic!("RobinHoodTable::clone: {e}"),
        }
    }
}

impl<K, V, S, A> PartialEq for RobinHoodTable<K, V, S, A>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, A> Eq for RobinHoodTable<K, V, S, A>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S, A: RawAllocator> fmt::Debug for RobinHoodTable<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// `{(A, 1), (B, 2)}` in bucket order. Diagnostic only.
impl<K: fmt::Display, V: fmt::Display, S, A: RawAllocator> fmt::Display
    for RobinHoodTable<K, V, S, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({k}, {v})")?;
        }
        f.write_str("}")
    }
}

impl<K, V, S, A> Extend<(K, V)> for RobinHoodTable<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    /// Panics if the table cannot grow.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            if let Err(e) = self.insert(k, v) {
                panic!("RobinHoodTable::extend: {e}");
            }
        }
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for RobinHoodTable<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S, A: RawAllocator> IntoIterator for &'a RobinHoodTable<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: RawAllocator> IntoIterator for &'a mut RobinHoodTable<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, A: RawAllocator> IntoIterator for RobinHoodTable<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;
    fn into_iter(self) -> Self::IntoIter {
        let len = self.table.len;
        IntoIter::new(self.table.buckets.into_iter(), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::TrackingAllocator;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::hash::Hasher;
    use std::rc::Rc;

    /// Hashes every key to 0.
    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        }
    }

    /// Hashes a `u64` key to itself, so tests can pick ideal buckets.
    #[derive(Clone, Default)]
    struct IdentityBuildHasher;
    #[derive(Default)]
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    fn identity_table(buckets: usize) -> RobinHoodTable<u64, &'static str, IdentityBuildHasher> {
        RobinHoodTable::with_capacity_and_hasher(buckets, IdentityBuildHasher).unwrap()
    }

    #[test]
    fn new_table_is_empty_and_unallocated() {
        let t: RobinHoodTable<String, i32> = RobinHoodTable::new();
        assert!(t.is_empty());
        assert_eq!(t.bucket_count(), 0);
        assert_eq!(t.load_factor(), 0.0);
        assert!(t.find("a").is_none());
        assert_eq!(t.to_string(), "{}");
    }

    /// Invariant: bucket counts are rounded up to a power of two.
    #[test]
    fn bucket_count_rounds_up_to_power_of_two() {
        let t: RobinHoodTable<u32, u32> = RobinHoodTable::with_capacity(6).unwrap();
        assert_eq!(t.bucket_count(), 8);
        let t: RobinHoodTable<u32, u32> = RobinHoodTable::with_capacity(1).unwrap();
        assert_eq!(t.bucket_count(), MIN_BUCKET_COUNT);
        let t: RobinHoodTable<u32, u32> = RobinHoodTable::with_capacity(64).unwrap();
        assert_eq!(t.bucket_count(), 64);
    }

    /// Invariant: existing keys are not overwritten; the caller's value is
    /// dropped and `inserted` is false.
    #[test]
    fn insert_is_first_wins() {
        let mut t = RobinHoodTable::new();
        let (s1, inserted) = t.insert("k".to_string(), 1).unwrap();
        assert!(inserted);
        let (s2, inserted) = t.insert("k".to_string(), 2).unwrap();
        assert!(!inserted);
        assert_eq!(s1, s2);
        assert_eq!(t.get("k"), Some(&1));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: `insert_with` only builds the value when inserting.
    #[test]
    fn insert_with_is_lazy() {
        let calls = Cell::new(0);
        let mut t = RobinHoodTable::new();
        t.insert_with("k", || {
            calls.set(calls.get() + 1);
            10
        })
        .unwrap();
        t.insert_with("k", || {
            calls.set(calls.get() + 1);
            20
        })
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(t.get("k"), Some(&10));
    }

    #[test]
    fn slot_accessors_follow_the_entry() {
        let mut t = RobinHoodTable::new();
        let (slot, _) = t.insert("a".to_string(), 5).unwrap();
        assert_eq!(slot.key(&t).map(String::as_str), Some("a"));
        *slot.value_mut(&mut t).unwrap() += 1;
        assert_eq!(slot.value(&t), Some(&6));
        assert_eq!(t.find("a"), Some(slot));
        assert_eq!(t.remove_at(slot), Some(("a".to_string(), 6)));
        assert!(slot.value(&t).is_none());
    }

    #[test]
    fn checked_lookup_reports_missing_keys() {
        let mut t: RobinHoodTable<&str, i32> = [("a", 1)].into_iter().collect();
        assert_eq!(t.at("a"), Ok(&1));
        assert_eq!(t.at("b"), Err(CollectionError::KeyNotFound));
        *t.at_mut("a").unwrap() = 3;
        assert_eq!(t.count("a"), 1);
        assert_eq!(t.count("b"), 0);
        assert_eq!(t.equal_range("a").collect::<Vec<_>>(), vec![(&"a", &3)]);
        assert_eq!(t.equal_range("b").count(), 0);
    }

    /// Invariant: the load factor stays at or below the maximum after every
    /// insert, growth keeps power-of-two sizing and probe distances exact.
    #[test]
    fn growth_keeps_load_factor_bounded() {
        let mut t = RobinHoodTable::new();
        for i in 0..2000u32 {
            t.insert(i, i * 2).unwrap();
            assert!(t.load_factor() <= t.max_load_factor());
        }
        t.validate().unwrap();
        assert!(t.bucket_count().is_power_of_two());
        for i in 0..2000u32 {
            assert_eq!(t.get(&i), Some(&(i * 2)));
        }
    }

    /// Invariant: erase shifts the following run back; no tombstones are
    /// left behind, and reinserting works regardless of earlier chains.
    #[test]
    fn erase_shifts_back_without_tombstones() {
        let mut t = identity_table(16);
        for k in [0u64, 16, 32, 48] {
            t.insert(k, "x").unwrap();
        }
        assert_eq!(t.find(&48).map(Slot::index), Some(3));
        assert!(t.erase(&16));
        t.validate().unwrap();
        assert_eq!(t.find(&32).map(Slot::index), Some(1));
        assert_eq!(t.find(&48).map(Slot::index), Some(2));
        assert!(!t.erase(&16));
        assert_eq!(t.count(&16), 0);

        t.insert(16, "again").unwrap();
        t.validate().unwrap();
        assert_eq!(t.get(&16), Some(&"again"));
        assert_eq!(t.len(), 4);
    }

    /// Invariant: an entry far from home takes the slot of one that is
    /// closer to home; the evicted entry moves on and both stay findable.
    #[test]
    fn robin_hood_displacement_favours_the_poorer_entry() {
        let mut t = identity_table(16);
        t.insert(1, "rich").unwrap(); // home 1, at 1
        t.insert(0, "zero").unwrap(); // home 0, at 0
        assert_eq!(t.find(&1).map(Slot::index), Some(1));

        // Home 0: bucket 0 is taken at distance 0, bucket 1 holds an entry at
        // distance 0 < 1, so the new key claims bucket 1.
        let (slot, inserted) = t.insert(16, "poor").unwrap();
        assert!(inserted);
        assert_eq!(slot.index(), 1);
        assert_eq!(t.find(&1).map(Slot::index), Some(2));
        assert_eq!(t.get(&1), Some(&"rich"));
        assert_eq!(t.get(&16), Some(&"poor"));
        t.validate().unwrap();
    }

    /// Invariant: a degenerate hash still yields a correct table; every key
    /// stays reachable and erase keeps the chain intact.
    #[test]
    fn constant_hash_still_resolves_by_equality() {
        let mut t = RobinHoodTable::with_hasher(ConstBuildHasher);
        for i in 0..300u32 {
            t.insert(i, i).unwrap();
        }
        t.validate().unwrap();
        for i in (0..300u32).step_by(3) {
            assert_eq!(t.remove(&i), Some(i));
        }
        t.validate().unwrap();
        for i in 0..300u32 {
            assert_eq!(t.contains_key(&i), i % 3 != 0);
        }
    }

    /// Invariant: long probes at a meaningful load factor schedule growth.
    #[test]
    fn long_probe_schedules_growth() {
        let mut t = RobinHoodTable::with_capacity_and_hasher(256, ConstBuildHasher).unwrap();
        for i in 0..(REHASH_HIGH_PROBE as u32 + 2) {
            t.insert(i, ()).unwrap();
        }
        assert!(t.table.grow_at_next_insert);
        let before = t.bucket_count();
        t.insert(u32::MAX, ()).unwrap();
        assert!(t.bucket_count() > before);
        assert!(!t.table.grow_at_next_insert || t.load_factor() >= REHASH_MIN_LOAD_FACTOR);
        t.validate().unwrap();
    }

    /// Invariant: rehash keeps every entry and never shrinks below what the
    /// entries need.
    #[test]
    fn rehash_preserves_contents() {
        let mut t: RobinHoodTable<u32, u32> = (0..50).map(|i| (i, i + 100)).collect();
        t.rehash(1000).unwrap();
        assert_eq!(t.bucket_count(), 1024);
        t.validate().unwrap();
        t.rehash(0).unwrap();
        assert!(t.load_factor() <= t.max_load_factor());
        t.validate().unwrap();
        for i in 0..50 {
            assert_eq!(t.get(&i), Some(&(i + 100)));
        }
    }

    #[test]
    fn reserve_avoids_later_growth() {
        let mut t = RobinHoodTable::new();
        t.reserve(100).unwrap();
        let buckets = t.bucket_count();
        assert!(buckets as f32 * t.max_load_factor() >= 100.0);
        for i in 0..100u32 {
            t.insert(i, ()).unwrap();
        }
        assert_eq!(t.bucket_count(), buckets);
    }

    #[test]
    fn max_load_factor_is_validated() {
        let mut t: RobinHoodTable<u8, u8> = RobinHoodTable::new();
        for bad in [0.0, -0.5, 1.5, f32::NAN] {
            let err = t.set_max_load_factor(bad).unwrap_err();
            assert_eq!(err.category(), "invalid_argument");
        }
        assert_eq!(t.max_load_factor(), DEFAULT_MAX_LOAD_FACTOR);
        t.set_max_load_factor(0.5).unwrap();
        for i in 0..100 {
            t.insert(i, i).unwrap();
            assert!(t.load_factor() <= 0.5);
        }
        t.set_max_load_factor(1.0).unwrap();
        assert_eq!(t.max_load_factor(), 1.0);
    }

    #[test]
    fn oversized_construction_is_a_length_error() {
        let err = RobinHoodTable::<u64, u64>::with_capacity(usize::MAX).unwrap_err();
        assert_eq!(err.category(), "length_error");
        let config = TableConfig::new().max_load_factor(2.0);
        let err = RobinHoodTable::<u64, u64>::with_config(config, DefaultHashBuilder::default(), Global)
            .unwrap_err();
        assert_eq!(err.category(), "invalid_argument");
    }

    #[test]
    fn bucket_entries_lists_one_home() {
        let mut t = identity_table(16);
        for k in [3u64, 19, 4, 35] {
            t.insert(k, "v").unwrap();
        }
        let home3: BTreeSet<u64> = t.bucket_entries(3).map(|(k, _)| *k).collect();
        assert_eq!(home3, [3, 19, 35].into_iter().collect());
        assert_eq!(t.bucket_size(4), 1);
        assert_eq!(t.bucket_size(5), 0);
        assert_eq!(t.bucket(&35), 3);
        assert_eq!(t.bucket_size(99), 0);
    }

    #[test]
    fn iteration_visits_each_entry_once() {
        let mut t: RobinHoodTable<u32, u32> = (0..100).map(|i| (i, i)).collect();
        assert_eq!(t.iter().len(), 100);
        let keys: BTreeSet<u32> = t.keys().copied().collect();
        assert_eq!(keys, (0..100).collect());
        for v in t.values_mut() {
            *v += 1;
        }
        assert!(t.iter().all(|(k, v)| *v == k + 1));
        let mut owned: Vec<(u32, u32)> = t.into_iter().collect();
        owned.sort_unstable();
        assert_eq!(owned.len(), 100);
        assert_eq!(owned[0], (0, 1));
    }

    /// Invariant: every stored value is dropped exactly once across erase,
    /// rehash, clear and drop.
    #[test]
    fn values_drop_exactly_once() {
        struct Counted(Rc<Cell<usize>>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }
        let drops = Rc::new(Cell::new(0));
        let mut t = RobinHoodTable::new();
        for i in 0..40u32 {
            t.insert(i, Counted(drops.clone())).unwrap();
        }
        assert!(t.erase(&0));
        assert_eq!(drops.get(), 1);
        t.rehash(512).unwrap();
        assert_eq!(drops.get(), 1);
        let (_, inserted) = t.insert(1, Counted(drops.clone())).unwrap();
        assert!(!inserted);
        assert_eq!(drops.get(), 2, "rejected value is dropped");
        t.clear();
        assert_eq!(drops.get(), 41);
        assert!(t.is_empty());
        t.insert(7, Counted(drops.clone())).unwrap();
        drop(t);
        assert_eq!(drops.get(), 42);
    }

    #[test]
    fn clone_and_equality() {
        let t: RobinHoodTable<String, u32> =
            ["a", "b", "c"].iter().map(|s| (s.to_string(), 1)).collect();
        let mut c = t.clone();
        assert_eq!(t, c);
        *c.get_mut("a").unwrap() = 2;
        assert_ne!(t, c);
        c.rehash(256).unwrap();
        *c.get_mut("a").unwrap() = 1;
        assert_eq!(t, c, "equality ignores bucket layout");
    }

    #[test]
    fn get_or_insert_behaves_like_index_operator() {
        let mut t: RobinHoodTable<&str, u32> = RobinHoodTable::new();
        *t.get_or_insert_default("hits").unwrap() += 1;
        *t.get_or_insert_default("hits").unwrap() += 1;
        assert_eq!(t.get("hits"), Some(&2));
        assert_eq!(*t.get_or_insert_with("miss", || 9).unwrap(), 9);
    }

    #[test]
    fn tracking_allocator_sees_every_bucket_array() {
        let alloc = TrackingAllocator::new();
        let mut t = RobinHoodTable::with_config(TableConfig::new(), IdentityBuildHasher, alloc.clone())
            .unwrap();
        for i in 0..100u64 {
            t.insert(i, i).unwrap();
        }
        assert!(alloc.stats().allocations() >= 2);
        drop(t);
        assert!(alloc.stats().is_balanced());
    }

    /// Invariant: a failed growth leaves the table as it was.
    #[test]
    fn failed_growth_is_strongly_safe() {
        let alloc = TrackingAllocator::new();
        let config = TableConfig::new().bucket_count(4);
        let mut t = RobinHoodTable::with_config(config, IdentityBuildHasher, alloc.clone()).unwrap();
        for i in 0..3u64 {
            t.insert(i, i).unwrap();
        }
        alloc.stats().set_limit(alloc.stats().bytes_live());
        let err = t.insert(3, 3).unwrap_err();
        assert_eq!(err.category(), "allocation_failure");
        assert_eq!(t.len(), 3);
        assert_eq!(t.bucket_count(), 4);
        t.validate().unwrap();
        alloc.stats().set_limit(usize::MAX);
        t.insert(3, 3).unwrap();
        assert_eq!(t.len(), 4);
    }

    /// Invariant (debug-only): re-entering the table from `Eq` during a probe
    /// panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_from_eq_panics() {
        struct Key {
            id: u32,
            table: *const RobinHoodTable<Key, (), ConstBuildHasher>,
        }
        impl PartialEq for Key {
            fn eq(&self, other: &Self) -> bool {
                if !other.table.is_null() {
                    let t = unsafe { &*other.table };
                    let _ = t.len();
                    let _ = t.contains_key(&Key {
                        id: 0,
                        table: core::ptr::null(),
                    });
                }
                self.id == other.id
            }
        }
        impl Eq for Key {}
        impl Hash for Key {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        let mut t = RobinHoodTable::with_hasher(ConstBuildHasher);
        t.insert(
            Key {
                id: 1,
                table: core::ptr::null(),
            },
            (),
        )
        .unwrap();
        let query = Key {
            id: 2,
            table: &t as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.contains_key(&query)));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    /// Invariant: at max load factor 1.0 a full ring still answers misses,
    /// erases by backward shift, and grows on the next insert.
    #[test]
    fn full_ring_at_load_factor_one() {
        let config = TableConfig::new().bucket_count(4).max_load_factor(1.0);
        let mut t: RobinHoodTable<u64, u64, IdentityBuildHasher> =
            RobinHoodTable::with_config(config, IdentityBuildHasher, Global).unwrap();
        for k in [3u64, 7, 11, 15] {
            assert!(t.insert(k, k * 10).unwrap().1);
            t.validate().unwrap();
        }
        assert_eq!(t.len(), 4);
        assert_eq!(t.bucket_count(), 4);
        assert_eq!(t.load_factor(), 1.0);
        assert_eq!(t.bucket_entries(3).count(), 4);
        assert!(t.find(&19).is_none());
        assert!(t.find(&0).is_none());

        assert_eq!(t.remove(&7), Some(70));
        t.validate().unwrap();
        assert_eq!(t.remove(&3), Some(30));
        t.validate().unwrap();
        assert_eq!(t.get(&11), Some(&110));
        assert_eq!(t.get(&15), Some(&150));
        assert!(t.find(&7).is_none());

        t.insert(7, 70).unwrap();
        t.insert(3, 30).unwrap();
        t.validate().unwrap();
        assert_eq!(t.bucket_count(), 4);
        t.insert(19, 190).unwrap();
        t.validate().unwrap();
        assert_eq!(t.bucket_count(), 8);
        for k in [3u64, 7, 11, 15, 19] {
            assert_eq!(t.get(&k), Some(&(k * 10)));
        }
    }

    /// Invariant: a panicking `Hash` or `Eq` propagates and leaves the table
    /// as it was.
    #[test]
    fn panicking_key_impls_leave_table_intact() {
        thread_local! {
            static PANIC_EQ: Cell<bool> = const { Cell::new(false) };
            static PANIC_HASH: Cell<bool> = const { Cell::new(false) };
        }
        #[derive(Debug)]
        struct Key(u32);
        impl PartialEq for Key {
            fn eq(&self, other: &Self) -> bool {
                if PANIC_EQ.with(Cell::get) {
                    panic!("eq");
                }
                self.0 == other.0
            }
        }
        impl Eq for Key {}
        impl Hash for Key {
            fn hash<H: Hasher>(&self, state: &mut H) {
                if PANIC_HASH.with(Cell::get) {
                    panic!("hash");
                }
                self.0.hash(state);
            }
        }

        let mut t = RobinHoodTable::with_hasher(ConstBuildHasher);
        for i in 0..50u32 {
            t.insert(Key(i), i).unwrap();
        }

        PANIC_EQ.with(|f| f.set(true));
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = t.insert(Key(7), 700);
        }));
        assert!(res.is_err());
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.erase(&Key(9))));
        assert!(res.is_err());
        PANIC_EQ.with(|f| f.set(false));

        PANIC_HASH.with(|f| f.set(true));
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = t.insert(Key(100), 100);
        }));
        assert!(res.is_err());
        PANIC_HASH.with(|f| f.set(false));

        t.validate().unwrap();
        assert_eq!(t.len(), 50);
        assert_eq!(t.get(&Key(7)), Some(&7));
        assert_eq!(t.get(&Key(9)), Some(&9));
        assert!(!t.contains_key(&Key(100)));
        t.insert(Key(100), 100).unwrap();
        assert!(t.erase(&Key(9)));
        t.validate().unwrap();
    }

    #[test]
    fn insert_or_assign_overwrites_in_place() {
        let mut t = identity_table(16);
        let (first, old) = t.insert_or_assign(5, "a").unwrap();
        assert_eq!(old, None);
        let (second, old) = t.insert_or_assign(5, "b").unwrap();
        assert_eq!(old, Some("a"));
        assert_eq!(first.index(), second.index());
        assert_eq!(second.value(&t), Some(&"b"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn max_len_respects_load_factor() {
        let mut t: RobinHoodTable<u64, u64> = RobinHoodTable::new();
        let buckets = t.max_bucket_count();
        assert!(t.max_len() < buckets);
        assert_eq!(t.max_len(), (buckets as f64 * f64::from(DEFAULT_MAX_LOAD_FACTOR)) as usize);
        t.set_max_load_factor(1.0).unwrap();
        assert_eq!(t.max_len(), buckets);
    }
}
