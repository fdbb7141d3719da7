#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can
// check internal invariants (chain lengths, load limit) directly.

use crate::chained_hash_map::{ChainedHashMap, DEFAULT_CAPACITY, GROWTH_FACTOR};
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(Vec<u8>),
    Mutate(usize, i32),
    Walk,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<OpI>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=24).prop_flat_map(
        |pool| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let contains_pool = proptest::sample::select(pool.clone());
            let op = prop_oneof![
                6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
                2 => idx.clone().prop_map(OpI::Remove),
                2 => idx.clone().prop_map(OpI::Get),
                1 => prop_oneof![
                    contains_pool,
                    proptest::collection::vec(any::<u8>(), 0..6)
                ]
                .prop_map(OpI::Contains),
                1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
                1 => Just(OpI::Walk),
                1 => Just(OpI::Clear),
            ];
            proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

// Drives one scenario against a std HashMap model. Checked after each op:
// - len parity with the model and with the summed chain lengths;
// - the load factor stays below 0.7 and capacity is DEFAULT * GROWTH^n;
// - values reaching the destructor are exactly the replaced/cleared ones,
//   never the removed ones.
fn run_scenario<S: BuildHasher>(
    hasher: S,
    pool: &[Vec<u8>],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let discarded = Rc::new(RefCell::new(Vec::new()));
    let sink = discarded.clone();
    let mut sut: ChainedHashMap<i32, S> = ChainedHashMap::builder()
        .hasher(hasher)
        .destructor(move |v| sink.borrow_mut().push(v))
        .build()
        .expect("initial buckets");
    let mut model: HashMap<Vec<u8>, i32> = HashMap::new();
    let mut expected_discards: Vec<i32> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = &pool[i];
                sut.insert(k, v).expect("insert");
                if let Some(old) = model.insert(k.clone(), v) {
                    expected_discards.push(old);
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k));
                prop_assert!(!sut.contains_key(k));
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Contains(k) => {
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(v) = sut.get_mut(k) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(k) {
                    *v = v.wrapping_add(d);
                }
            }
            OpI::Walk => {
                let mut seen = BTreeSet::new();
                let mut c = sut.cursor();
                while let Some((k, v)) = c.entry() {
                    prop_assert!(seen.insert(k.to_vec()), "key visited twice");
                    prop_assert_eq!(Some(v), model.get(k));
                    c.advance();
                }
                prop_assert_eq!(seen.len(), model.len());
            }
            OpI::Clear => {
                let cap = sut.capacity();
                sut.clear();
                expected_discards.extend(model.drain().map(|(_, v)| v));
                prop_assert_eq!(sut.capacity(), cap);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.chained_len(), sut.len());
        prop_assert!(sut.len() * 10 < sut.capacity() * 7);

        let mut cap = sut.capacity();
        while cap > DEFAULT_CAPACITY {
            prop_assert_eq!(cap % GROWTH_FACTOR, 0);
            cap /= GROWTH_FACTOR;
        }
        prop_assert_eq!(cap, DEFAULT_CAPACITY);

        let mut got = discarded.borrow().clone();
        let mut want = expected_discards.clone();
        got.sort_unstable();
        want.sort_unstable();
        prop_assert_eq!(got, want);
    }

    // Dropping the table discards whatever is left.
    expected_discards.extend(model.into_values());
    drop(sut);
    let mut got = discarded.borrow().clone();
    got.sort_unstable();
    expected_discards.sort_unstable();
    prop_assert_eq!(got, expected_discards);
    Ok(())
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    // Property: state-machine equivalence against std::collections::HashMap
    // with the default additive bucket hash.
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(crate::hash::BuildAdditiveHasher, &pool, ops)?;
    }

    // Property: same invariants under djb2.
    #[test]
    fn prop_state_machine_djb2((pool, ops) in arb_scenario()) {
        run_scenario(crate::hash::BuildDjb2Hasher, &pool, ops)?;
    }

    // Property: same invariants with every key in one chain.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ConstBuildHasher, &pool, ops)?;
    }
}
