//! Model-based checks of `Map` against `BTreeMap`.

use proptest::prelude::*;
use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, Pair, MIN_CAPACITY};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    InsertCopy(u16, i32),
    Emplace(u16, i32),
    Erase(u16),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Narrow key range so operations collide often
    let key = 0u16..64;
    prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::InsertCopy(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Emplace(k, v)),
        3 => key.prop_map(Op::Erase),
        1 => Just(Op::Clear),
    ]
}

fn descriptor() -> MapDescriptor {
    MapDescriptor::new(descriptor_of::<u16>(), descriptor_of::<i32>())
}

fn contents(map: &Map, model: &BTreeMap<u16, i32>) -> Vec<(u16, Option<i32>)> {
    model
        .keys()
        .map(|k| (*k, map.get_as::<u16, i32>(*k).copied()))
        .collect()
}

fn apply(map: &mut Map, model: &mut BTreeMap<u16, i32>, op: &Op) -> Result<(), TestCaseError> {
    match *op {
        Op::Insert(k, v) => {
            let mut pair =
                Pair::from_key_value(*descriptor().pair(), AnyValue::new(k), AnyValue::new(v))
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            map.insert_or_assign(&mut pair)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(pair.is_empty());
            model.insert(k, v);
        }
        Op::InsertCopy(k, v) => {
            let pair =
                Pair::from_key_value(*descriptor().pair(), AnyValue::new(k), AnyValue::new(v))
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            map.insert_or_assign_copy(&pair)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(!pair.is_empty());
            model.insert(k, v);
        }
        Op::Emplace(k, v) => {
            let inserted = map
                .emplace_key_copy(&AnyValue::new(k), |slot| {
                    slot.set(v);
                    Ok(())
                })
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(inserted, !model.contains_key(&k));
            model.entry(k).or_insert(v);
        }
        Op::Erase(k) => {
            prop_assert_eq!(map.erase(&AnyValue::new(k)), model.remove(&k).is_some());
        }
        Op::Clear => {
            map.clear();
            model.clear();
            prop_assert_eq!(map.capacity(), MIN_CAPACITY);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    /// Any sequence of operations leaves the map agreeing with the model.
    #[test]
    fn prop_matches_btreemap(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut map = Map::new(descriptor()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut model = BTreeMap::new();

        for op in &ops {
            apply(&mut map, &mut model, op)?;

            prop_assert_eq!(map.len(), model.len());
            prop_assert!(map.len() <= map.capacity());
            prop_assert!(map.capacity() >= MIN_CAPACITY);
        }

        let expected: Vec<(u16, Option<i32>)> =
            model.iter().map(|(k, v)| (*k, Some(*v))).collect();
        prop_assert_eq!(contents(&map, &model), expected);
    }

    /// Inserting keys and erasing all of them brings the capacity back down.
    #[test]
    fn prop_erase_all_restores_minimum(keys in prop::collection::btree_set(any::<u16>(), 0..300)) {
        let mut map = Map::new(descriptor()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        for k in &keys {
            apply(&mut map, &mut BTreeMap::new(), &Op::Insert(*k, 0))?;
        }
        prop_assert_eq!(map.len(), keys.len());
        prop_assert!(map.capacity() >= keys.len());

        for k in &keys {
            prop_assert!(map.erase(&AnyValue::new(*k)));
        }
        prop_assert!(map.is_empty());
        prop_assert_eq!(map.capacity(), MIN_CAPACITY);
    }

    /// A copy compares equal and stays equal after the source changes.
    #[test]
    fn prop_copy_is_independent(
        entries in prop::collection::btree_map(any::<u16>(), any::<i32>(), 1..50),
        extra in any::<u16>(),
    ) {
        let mut map = Map::new(descriptor()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut model = BTreeMap::new();
        for (k, v) in &entries {
            apply(&mut map, &mut model, &Op::Insert(*k, *v))?;
        }

        let copy = map.try_clone().map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(copy.equal(&map));

        let erased = map.erase(&AnyValue::new(extra));
        prop_assert_eq!(erased, entries.contains_key(&extra));
        prop_assert_eq!(copy.len(), entries.len());
        prop_assert_eq!(copy.equal(&map), !erased);
    }
}
