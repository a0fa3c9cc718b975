//! Property tests driving random operation sequences against a model
//! map, for every insertion mode and address split.
#![cfg(test)]

use crate::{CoalescedHashMap, ConstructionError, InsertResult, InsertionMode};
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;

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

#[derive(Clone, Default)]
struct IdentityBuildHasher;
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
    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
enum Op {
    /// Insert pool[i % len] with the given value.
    Insert(usize, u32),
    /// Find pool[i % len] and check the returned iterator suffix.
    Find(usize),
    /// Compare contains_key/get against the model.
    Contains(usize),
    /// Compare a full iteration against the model's insertion order.
    Iterate,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Insert(i, v)),
        2 => any::<usize>().prop_map(Op::Find),
        2 => any::<usize>().prop_map(Op::Contains),
        1 => Just(Op::Iterate),
    ]
}

fn arb_mode() -> impl Strategy<Value = InsertionMode> {
    prop_oneof![
        Just(InsertionMode::Lisch),
        Just(InsertionMode::Eisch),
        Just(InsertionMode::Lich),
        Just(InsertionMode::Eich),
        Just(InsertionMode::Vich),
    ]
}

type Scenario = (u32, f64, InsertionMode, Vec<u32>, Vec<Op>);

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    (
        1..=24u32,
        prop_oneof![Just(0.5), Just(0.86), Just(1.0)],
        arb_mode(),
        // Small key pool so Insert ops revisit keys and exercise the
        // duplicate path.
        prop::collection::vec(0u32..48, 1..=12),
        prop::collection::vec(arb_op(), 1..60),
    )
}

fn run_scenario<S: BuildHasher>(
    capacity: u32,
    factor: f64,
    mode: InsertionMode,
    pool: &[u32],
    ops: &[Op],
    hasher: S,
) -> Result<(), TestCaseError> {
    let address = (f64::from(capacity) * factor) as u32;
    let mut sut = match CoalescedHashMap::with_address_factor(capacity, mode, factor, hasher) {
        Ok(m) => m,
        Err(ConstructionError::EmptyAddressRegion(_)) => {
            prop_assert_eq!(address, 0);
            return Ok(());
        }
        Err(ConstructionError::NoCellar) => {
            prop_assert_eq!(address, capacity);
            prop_assert!(matches!(
                mode,
                InsertionMode::Lisch | InsertionMode::Eisch
            ));
            return Ok(());
        }
        Err(other) => panic!("unexpected construction error: {}", other),
    };
    let mut model: HashMap<u32, u32> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();

    for op in ops {
        match *op {
            Op::Insert(i, v) => {
                let key = pool[i % pool.len()];
                let already = model.contains_key(&key);
                let mut full = false;
                match sut.insert(key, v) {
                    InsertResult::Inserted(mut it) => {
                        prop_assert!(!already);
                        prop_assert_eq!(it.next(), Some((&key, &v)));
                        model.insert(key, v);
                        order.push(key);
                    }
                    InsertResult::AlreadyPresent(mut it) => {
                        prop_assert!(already);
                        let expected = model[&key];
                        prop_assert_eq!(it.next(), Some((&key, &expected)));
                    }
                    InsertResult::Full {
                        key: rejected_key,
                        value: rejected_value,
                    } => {
                        prop_assert!(!already);
                        prop_assert_eq!(rejected_key, key);
                        prop_assert_eq!(rejected_value, v);
                        full = true;
                    }
                }
                if full {
                    if matches!(mode, InsertionMode::Lisch | InsertionMode::Eisch) {
                        // The standard modes saturate once the cursor
                        // reaches the cellar floor.
                        prop_assert_eq!(sut.free_tail(), sut.address_slots());
                    } else {
                        prop_assert_eq!(sut.len(), sut.capacity() as usize);
                    }
                }
            }
            Op::Find(i) => {
                let key = pool[i % pool.len()];
                match sut.find(&key) {
                    Some(it) => {
                        prop_assert!(model.contains_key(&key));
                        let got: Vec<(u32, u32)> = it.map(|(&k, &v)| (k, v)).collect();
                        let pos = order.iter().position(|&k| k == key).unwrap();
                        let want: Vec<(u32, u32)> =
                            order[pos..].iter().map(|&k| (k, model[&k])).collect();
                        prop_assert_eq!(got, want);
                    }
                    None => prop_assert!(!model.contains_key(&key)),
                }
            }
            Op::Contains(i) => {
                let key = pool[i % pool.len()];
                prop_assert_eq!(sut.contains_key(&key), model.contains_key(&key));
                prop_assert_eq!(sut.get(&key), model.get(&key));
            }
            Op::Iterate => {
                let got: Vec<(u32, u32)> = sut.iter().map(|(&k, &v)| (k, v)).collect();
                let want: Vec<(u32, u32)> =
                    order.iter().map(|&k| (k, model[&k])).collect();
                prop_assert_eq!(got, want);
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        sut.assert_invariants();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant: under a random hasher the table agrees with a model
    /// HashMap on membership, values, order and length after every
    /// operation, in every mode.
    #[test]
    fn prop_state_machine((capacity, factor, mode, pool, ops) in arb_scenario()) {
        run_scenario(capacity, factor, mode, &pool, &ops, RandomState::new())?;
    }

    /// Invariant: the same holds when every key collides into one
    /// chain, the worst case for coalescing.
    #[test]
    fn prop_state_machine_with_collisions((capacity, factor, mode, pool, ops) in arb_scenario()) {
        run_scenario(capacity, factor, mode, &pool, &ops, ConstBuildHasher)?;
    }

    /// Invariant: without a cellar requirement, `Full` appears exactly
    /// when the table holds `capacity` entries and is terminal for
    /// distinct keys.
    #[test]
    fn prop_full_is_terminal_without_cellar(
        capacity in 1..=20u32,
        mode in prop_oneof![
            Just(InsertionMode::Lich),
            Just(InsertionMode::Eich),
            Just(InsertionMode::Vich),
        ],
    ) {
        let mut sut: CoalescedHashMap<u32, u32, IdentityBuildHasher> =
            CoalescedHashMap::with_address_factor(capacity, mode, 1.0, IdentityBuildHasher)
                .unwrap();
        let mut full_seen = false;
        let mut inserted = Vec::new();
        for k in 0..capacity * 2 {
            match sut.insert(k, k) {
                InsertResult::Inserted(_) => {
                    prop_assert!(!full_seen, "insert succeeded after the table was full");
                    inserted.push(k);
                }
                InsertResult::Full { .. } => {
                    full_seen = true;
                }
                InsertResult::AlreadyPresent(_) => {
                    prop_assert!(false, "keys are distinct");
                }
            }
        }
        prop_assert!(full_seen);
        prop_assert_eq!(inserted.len(), capacity as usize);
        prop_assert_eq!(sut.len(), capacity as usize);
        for &k in &inserted {
            prop_assert_eq!(sut.get(&k), Some(&k));
        }
        sut.assert_invariants();
    }
}
