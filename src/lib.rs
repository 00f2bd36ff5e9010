//! rh-collections: a Robin Hood hash table and the contiguous array it is
//! built on, both with pluggable allocators.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an open-addressing table whose probe sequences stay short and
//!   whose deletions leave no tombstones, on top of a growable array that
//!   owns exactly one allocation.
//! - Layers:
//!   - RawBuffer<T, A>: one block of uninitialized slots obtained from a
//!     `RawAllocator`; knows its capacity, not which slots are live.
//!   - ContiguousArray<T, A>: `Vec`-like array over a RawBuffer with an
//!     explicit growth policy (`max(requested, 2 * capacity, 16)`) and
//!     fallible, strongly safe growth.
//!   - RobinHoodTable<K, V, S, A>: array of buckets, each recording its
//!     entry's distance from the ideal bucket and a truncated hash.
//!   - UnorderedMap<K, V, S, A>: map-shaped front end over the table.
//!
//! Constraints
//! - Bucket counts are zero or a power of two; the ideal bucket of a hash
//!   is `hash & (bucket_count - 1)`.
//! - After every insert, `len / bucket_count <= max_load_factor`.
//! - Every occupied bucket's recorded distance equals its displacement
//!   from the ideal bucket, modulo the bucket count.
//! - Unique keys; inserting an existing key leaves the stored value alone.
//!
//! Growth and rehashing
//! - A table grows when the next insert would pass the load threshold, or
//!   when an earlier insert probed further than `REHASH_HIGH_PROBE` while
//!   the load factor was at least `REHASH_MIN_LOAD_FACTOR`.
//! - Each bucket caches the low 32 bits of its key's hash. Rehashing into
//!   at most 2^32 buckets re-buckets from that cache and never calls
//!   `K: Hash`.
//! - Growth allocates the new bucket array before touching the old one, so
//!   a failed allocation leaves the table unchanged.
//!
//! Reentrancy policy
//! - Table operations call user `Hash`/`Eq` while probing. A debug-only
//!   guard at the start of each operation panics on nested entry into the
//!   same table. Values are dropped after the guard is released, so `Drop`
//!   impls may touch the table again.
//!
//! Errors
//! - Fallible operations return [`CollectionError`]: out-of-range access,
//!   invalid arguments, sizes over the allocator's maximum, and refused
//!   allocations. `Clone` and `Extend` panic on allocation failure;
//!   `try_clone` and `insert` report it.
//!
//! Notes and non-goals
//! - Single-threaded containers: tables are `Send` when their contents
//!   are, but not `Sync`.
//! - No multimap variant; `equal_range` yields zero or one entries.
//! - Iteration order is physical bucket order and changes on rehash.

pub mod alloc;
mod bucket;
pub mod contiguous_array;
pub mod error;
mod raw_buffer;
mod reentrancy;
pub mod robin_hood;
pub mod robin_hood_iter;
mod robin_hood_proptest;
pub mod unordered_map;

// Public surface
pub use alloc::{AllocStats, Global, RawAllocator, TrackingAllocator};
pub use contiguous_array::ContiguousArray;
pub use error::{CollectionError, Result};
pub use robin_hood::{RobinHoodTable, Slot, TableConfig};
pub use unordered_map::UnorderedMap;
