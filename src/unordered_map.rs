//! UnorderedMap: a map-shaped front end over [`RobinHoodTable`].
//!
//! Lookups and iteration forward to the table. The differences are in the
//! mutation surface: `insert` reports only whether the key was new,
//! `entry_or_default` plays the role of a subscript that creates missing
//! entries, and `map[&key]` panics on a missing key like `std`'s maps.

use crate::alloc::{Global, RawAllocator};
use crate::error::Result;
use crate::robin_hood::{RobinHoodTable, TableConfig};
use crate::robin_hood_iter::{BucketEntries, IntoIter, Iter, IterMut};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::DefaultHashBuilder;

pub struct UnorderedMap<K, V, S = DefaultHashBuilder, A: RawAllocator = Global> {
    table: RobinHoodTable<K, V, S, A>,
}

impl<K, V> UnorderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            table: RobinHoodTable::new(),
        }
    }

    pub fn with_capacity(bucket_count: usize) -> Result<Self> {
        Ok(Self {
            table: RobinHoodTable::with_capacity(bucket_count)?,
        })
    }
}

impl<K, V> Default for UnorderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> UnorderedMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: RobinHoodTable::with_hasher(hasher),
        }
    }
}

impl<K, V, S, A: RawAllocator + Clone> UnorderedMap<K, V, S, A> {
    pub fn with_config(config: TableConfig, hasher: S, alloc: A) -> Result<Self> {
        Ok(Self {
            table: RobinHoodTable::with_config(config, hasher, alloc)?,
        })
    }
}

impl<K, V, S, A: RawAllocator> UnorderedMap<K, V, S, A> {
    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }
    pub fn max_bucket_count(&self) -> usize {
        self.table.max_bucket_count()
    }
    pub fn max_len(&self) -> usize {
        self.table.max_len()
    }
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<()> {
        self.table.set_max_load_factor(factor)
    }
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.table.swap(&mut other.table);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.table.iter_mut()
    }
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.table.keys()
    }
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.table.values()
    }
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.table.values_mut()
    }
    pub fn bucket_entries(&self, bucket: usize) -> BucketEntries<'_, K, V> {
        self.table.bucket_entries(bucket)
    }

    /// The underlying table, for slot-level access.
    pub fn as_table(&self) -> &RobinHoodTable<K, V, S, A> {
        &self.table
    }

    pub fn into_table(self) -> RobinHoodTable<K, V, S, A> {
        self.table
    }
}

impl<K, V, S, A> UnorderedMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    /// Insert `key -> value` if `key` is absent. Returns whether it was
    /// inserted; an existing value is left untouched.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        self.table.insert(key, value).map(|(_, inserted)| inserted)
    }

    /// Insert, or overwrite the value of an existing key. Returns the old
    /// value if there was one.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.table.insert_or_assign(key, value).map(|(_, old)| old)
    }

    /// The value for `key`, default-inserting it first if absent.
    pub fn entry_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        self.table.get_or_insert_default(key)
    }

    pub fn entry_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&mut V>
    where
        F: FnOnce() -> V,
    {
        self.table.get_or_insert_with(key, make)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get(q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get_mut(q)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get_key_value(q)
    }

    /// `KeyNotFound` when absent.
    pub fn at<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.at(q)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.at_mut(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(q)
    }

    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.count(q)
    }

    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.bucket(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove(q)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove_entry(q)
    }

    /// Number of entries removed (0 or 1).
    pub fn erase<Q>(&mut self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        usize::from(self.table.erase(q))
    }

    pub fn reserve(&mut self, count: usize) -> Result<()> {
        self.table.reserve(count)
    }

    pub fn rehash(&mut self, bucket_count: usize) -> Result<()> {
        self.table.rehash(bucket_count)
    }
}

impl<K, V, S, A, Q> Index<&Q> for UnorderedMap<K, V, S, A>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    type Output = V;

    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.table.get(key) {
            Some(v) => v,
            None => panic!("UnorderedMap: key not found"),
        }
    }
}

impl<K: Clone, V: Clone, S: Clone, A: RawAllocator + Clone> Clone for UnorderedMap<K, V, S, A> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K, V, S, A> PartialEq for UnorderedMap<K, V, S, A>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<K, V, S, A> Eq for UnorderedMap<K, V, S, A>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S, A: RawAllocator> fmt::Debug for UnorderedMap<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

impl<K: fmt::Display, V: fmt::Display, S, A: RawAllocator> fmt::Display for UnorderedMap<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.table, f)
    }
}

impl<K, V, S, A> Extend<(K, V)> for UnorderedMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: RawAllocator + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for UnorderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().collect(),
        }
    }
}

impl<K, V, S, A: RawAllocator> From<RobinHoodTable<K, V, S, A>> for UnorderedMap<K, V, S, A> {
    fn from(table: RobinHoodTable<K, V, S, A>) -> Self {
        Self { table }
    }
}

impl<'a, K, V, S, A: RawAllocator> IntoIterator for &'a UnorderedMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: RawAllocator> IntoIterator for &'a mut UnorderedMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, A: RawAllocator> IntoIterator for UnorderedMap<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;
    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}
