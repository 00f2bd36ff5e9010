#![cfg(test)]

// Property tests for RobinHoodTable kept inside the crate so they can call
// the structural validator.

use crate::robin_hood::RobinHoodTable;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    // The flag removes through the slot returned by `find`.
    Remove(usize, bool),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    Reserve(usize),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            4 => (idx.clone(), any::<bool>()).prop_map(|(i, by_slot)| OpI::Remove(i, by_slot)),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (0usize..300).prop_map(OpI::Rehash),
            1 => (0usize..100).prop_map(OpI::Reserve),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives one scenario against std's HashMap. After every step the table must
// pass its structural validator (power-of-two sizing, exact probe distances,
// Robin Hood ordering, no tombstones, entry count) and match the model.
fn run_state_machine<S: BuildHasher>(
    mut sut: RobinHoodTable<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let make_calls = Rc::new(Cell::new(0));

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let (slot, inserted) = sut.insert(k.clone(), v).expect("allocation succeeds");
                prop_assert_eq!(inserted, !already, "inserted iff the key was absent");
                prop_assert_eq!(slot.key(&sut), Some(&k));
                if inserted {
                    model.insert(k.clone(), v);
                    prop_assert!(sut.load_factor() <= sut.max_load_factor());
                }
                // First insert wins: the stored value is the model's.
                prop_assert_eq!(slot.value(&sut), model.get(&k));
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let counter = make_calls.clone();
                let before = counter.get();
                let (_, inserted) = sut
                    .insert_with(k.clone(), move || {
                        counter.set(counter.get() + 1);
                        v
                    })
                    .expect("allocation succeeds");
                prop_assert_eq!(inserted, !already);
                if inserted {
                    prop_assert_eq!(make_calls.get(), before + 1, "value built exactly once");
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(make_calls.get(), before, "value not built for a present key");
                }
            }
            OpI::Remove(i, false) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_entry(&k), model.remove_entry(&k));
                prop_assert!(sut.find(&k).is_none());
            }
            OpI::Remove(i, true) => {
                let k = key_from(pool, i);
                if let Some(slot) = sut.find(&k) {
                    let (kk, vv) = sut.remove_at(slot).expect("found slot is occupied");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&kk));
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let s = sut.find(&k);
                prop_assert_eq!(s.is_some(), model.contains_key(&k));
                if let Some(slot) = s {
                    prop_assert_eq!(slot.value(&sut), model.get(&k));
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Rehash(n) => {
                sut.rehash(n).expect("rehash succeeds");
                prop_assert!(sut.bucket_count() >= n);
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::Reserve(n) => {
                sut.reserve(n).expect("reserve succeeds");
                let threshold = (sut.bucket_count() as f64 * f64::from(sut.max_load_factor())) as usize;
                prop_assert!(threshold >= n, "reserve({}) left threshold {}", n, threshold);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), sut.len());
            }
        }

        // Post-conditions after each op
        if let Err(msg) = sut.validate() {
            return Err(TestCaseError::fail(msg));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(RobinHoodTable::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
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

// Low-entropy variant: hashes collapse to 0..3, so every key lands in one of
// a few ideal buckets and displacement chains overlap.
#[derive(Clone, Default)]
struct CoarseBuildHasher;
#[derive(Default)]
struct CoarseHasher(u64);
impl BuildHasher for CoarseBuildHasher {
    type Hasher = CoarseHasher;
    fn build_hasher(&self) -> Self::Hasher {
        CoarseHasher(0)
    }
}
impl Hasher for CoarseHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 3
    }
}

// Property: Same state-machine invariants under worst-case collision
// behavior (constant hasher) and under heavily clustered hashes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(RobinHoodTable::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_clustered((pool, ops) in arb_scenario()) {
        run_state_machine(RobinHoodTable::with_hasher(CoarseBuildHasher), &pool, ops)?;
    }
}
