mod common;

use common::FlakyDescriptor;
use sovran_metamap::{descriptor_of, AnyValue, MapError, Pair, PairDescriptor};
use std::cmp::Ordering;

fn string_int() -> PairDescriptor {
    PairDescriptor::new(descriptor_of::<String>(), descriptor_of::<i32>())
}

fn pair(key: &str, value: i32) -> Result<Pair, MapError> {
    Pair::from_copies(
        string_int(),
        &AnyValue::new(key.to_string()),
        &AnyValue::new(value),
    )
}

fn key_of(pair: &Pair) -> Option<&str> {
    pair.key()?.downcast_ref::<String>().map(String::as_str)
}

fn value_of(pair: &Pair) -> Option<i32> {
    pair.value()?.downcast_ref::<i32>().copied()
}

#[test]
fn test_init_from_key_value() -> Result<(), MapError> {
    let pair = Pair::from_key_value(
        string_int(),
        AnyValue::new("Hello world".to_string()),
        AnyValue::new(42),
    )?;

    assert_eq!(*pair.descriptor(), string_int());
    assert_eq!(key_of(&pair), Some("Hello world"));
    assert_eq!(value_of(&pair), Some(42));

    Ok(())
}

#[test]
fn test_init_copies_leave_sources_alone() -> Result<(), MapError> {
    let key = AnyValue::new("Hello world".to_string());
    let value = AnyValue::new(42);

    let pair = Pair::from_copies(string_int(), &key, &value)?;
    assert_eq!(key_of(&pair), Some("Hello world"));
    assert_eq!(value_of(&pair), Some(42));

    // Sources are still intact
    assert_eq!(key.downcast_ref::<String>().map(String::as_str), Some("Hello world"));
    assert_eq!(value.downcast_ref::<i32>(), Some(&42));

    let pair = Pair::from_key_copy_value(string_int(), &key, AnyValue::new(7))?;
    assert_eq!(key_of(&pair), Some("Hello world"));
    assert_eq!(value_of(&pair), Some(7));

    Ok(())
}

#[test]
fn test_compare_first() -> Result<(), MapError> {
    let pair1 = pair("Hello world", 42)?;
    let pair2 = pair("Hello world!", 42)?;

    assert_eq!(pair1.compare(&pair2), Ordering::Less);
    assert_eq!(pair2.compare(&pair1), Ordering::Greater);
    assert_eq!(pair1.compare(&pair1), Ordering::Equal);
    assert_eq!(pair1.compare_keys(&pair2), Ordering::Less);
    assert!(!pair1.equal(&pair2));

    Ok(())
}

#[test]
fn test_compare_second() -> Result<(), MapError> {
    let pair1 = pair("Hello world", 42)?;
    let pair2 = pair("Hello world", 43)?;

    // Keys tie, so the values decide
    assert_eq!(pair1.compare_keys(&pair2), Ordering::Equal);
    assert_eq!(pair1.compare(&pair2), Ordering::Less);
    assert_eq!(pair2.compare(&pair1), Ordering::Greater);
    assert!(pair1 < pair2);
    assert!(!pair1.equal(&pair2));
    assert!(pair1.equal(&pair("Hello world", 42)?));

    Ok(())
}

#[test]
fn test_type_mismatch_is_rejected() {
    let result = Pair::from_key_value(
        string_int(),
        AnyValue::new(1u8),
        AnyValue::new(42),
    );
    assert!(matches!(result, Err(MapError::TypeMismatch { .. })));

    let result = Pair::from_copies(
        string_int(),
        &AnyValue::new("key".to_string()),
        &AnyValue::new("not an int".to_string()),
    );
    assert!(matches!(result, Err(MapError::TypeMismatch { .. })));
}

#[test]
fn test_move_leaves_source_empty() -> Result<(), MapError> {
    let mut src = pair("key", 1)?;
    let dest = src.take();

    assert!(src.is_empty());
    assert!(src.key().is_none());
    assert!(src.value().is_none());
    assert_eq!(key_of(&dest), Some("key"));
    assert_eq!(value_of(&dest), Some(1));

    // Empty pairs can still be dropped and deinitialized
    src.deinit();
    assert!(src.is_empty());

    Ok(())
}

#[test]
fn test_copy_is_independent() -> Result<(), MapError> {
    let src = pair("key", 1)?;
    let mut copy = src.try_clone()?;

    if let Some(value) = copy.value_mut_as::<i32>() {
        *value = 2;
    }

    assert_eq!(value_of(&src), Some(1));
    assert_eq!(value_of(&copy), Some(2));

    // Mutable access never reaches past the stored type
    assert!(copy.value_mut_as::<String>().is_none());
    assert!(copy.take().value_mut_as::<i32>().is_some());
    assert!(copy.value_mut_as::<i32>().is_none());

    Ok(())
}

#[test]
fn test_assignment() -> Result<(), MapError> {
    let mut dest = pair("a", 1)?;
    let src = pair("b", 2)?;

    dest.assign_copy(&src)?;
    assert!(dest.equal(&src));

    let mut other = pair("c", 3)?;
    dest.assign_move(&mut other);
    assert!(other.is_empty());
    assert_eq!(key_of(&dest), Some("c"));

    let mut swapped = pair("d", 4)?;
    dest.swap(&mut swapped);
    assert_eq!(key_of(&dest), Some("d"));
    assert_eq!(key_of(&swapped), Some("c"));

    let (key, value) = dest.into_parts().expect("live pair has parts");
    assert_eq!(key.downcast::<String>().ok().as_deref(), Some("d"));
    assert_eq!(value.downcast::<i32>().ok(), Some(4));

    Ok(())
}

#[test]
fn test_failed_copy_leaves_nothing_behind() -> Result<(), MapError> {
    static KEY: FlakyDescriptor = FlakyDescriptor::new(usize::MAX);
    static VALUE: FlakyDescriptor = FlakyDescriptor::new(usize::MAX);
    let descriptor = PairDescriptor::new(&KEY, &VALUE);

    let src = Pair::from_key_value(
        descriptor,
        AnyValue::new("key".to_string()),
        AnyValue::new("value".to_string()),
    )?;

    // Key copy succeeds, value copy fails
    KEY.allow(1);
    VALUE.allow(0);
    assert_eq!(
        src.try_clone().err(),
        Some(MapError::AllocationFailure { requested: 1 })
    );

    // A failed assignment leaves the destination as it was
    let mut dest = Pair::from_key_value(
        descriptor,
        AnyValue::new("old".to_string()),
        AnyValue::new("pair".to_string()),
    )?;
    KEY.allow(1);
    assert!(dest.assign_copy(&src).is_err());
    assert_eq!(
        dest.key().and_then(|k| k.downcast_ref::<String>()).map(String::as_str),
        Some("old")
    );

    VALUE.allow(1);
    KEY.allow(1);
    assert!(dest.assign_copy(&src).is_ok());
    assert!(dest.equal(&src));

    Ok(())
}
