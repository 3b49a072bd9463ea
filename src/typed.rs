use crate::any_value::AnyValue;
use crate::descriptor::{MapDescriptor, NativeType};
use crate::error::MapError;
use crate::map::Map;
use crate::pair::Pair;
use crate::registry::descriptor_of;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// A statically typed view of a [`Map`]
///
/// `TypedMap` builds its descriptor from the shared native descriptors of `K` and `V`,
/// so every `TypedMap<K, V>` uses the same descriptor as a hand-built
/// `Map` over `descriptor_of::<K>()` and `descriptor_of::<V>()`. Entries stay sorted by
/// key, so `keys()` and `values()` come back in key order.
///
/// # Examples
///
/// ```
/// use sovran_metamap::{MapError, TypedMap};
///
/// let mut counts = TypedMap::<String, u32>::new()?;
/// for word in ["sort", "the", "sort", "table"] {
///     counts.emplace(word.to_string(), || 0)?;
///     if let Some(count) = counts.get_mut(&word.to_string()) {
///         *count += 1;
///     }
/// }
///
/// assert_eq!(counts.get(&"sort".to_string()), Some(&2));
/// assert_eq!(counts.keys(), vec!["sort", "table", "the"]);
/// # Ok::<(), MapError>(())
/// ```
pub struct TypedMap<K, V> {
    map: Map,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> TypedMap<K, V>
where
    K: NativeType,
    V: NativeType,
{
    /// The descriptor shared by every `TypedMap<K, V>`
    pub fn descriptor() -> MapDescriptor {
        MapDescriptor::new(descriptor_of::<K>(), descriptor_of::<V>())
    }

    /// Creates a new, empty TypedMap
    ///
    /// # Errors
    ///
    /// Returns `MapError::AllocationFailure` if the initial storage can't be allocated.
    pub fn new() -> Result<Self, MapError> {
        Ok(Self {
            map: Map::new(Self::descriptor())?,
            _marker: PhantomData,
        })
    }

    /// Wraps an untyped map built with this type's descriptor
    ///
    /// # Errors
    ///
    /// Returns `MapError::DescriptorMismatch` if the map was built for other types.
    pub fn from_map(map: Map) -> Result<Self, MapError> {
        if map.descriptor() != Some(&Self::descriptor()) {
            return Err(MapError::DescriptorMismatch);
        }
        Ok(Self {
            map,
            _marker: PhantomData,
        })
    }

    /// Stores a value, replacing any previous value for the key
    ///
    /// # Errors
    ///
    /// Returns `MapError::AllocationFailure` if the map needs to grow and can't.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<(), MapError> {
        let mut pair = Pair::from_key_value(
            *Self::descriptor().pair(),
            AnyValue::new(key),
            AnyValue::new(value),
        )?;
        self.map.insert_or_assign(&mut pair)
    }

    /// Stores `init()` under `key` unless the key is already present
    ///
    /// Returns `Ok(true)` if the value was inserted and `Ok(false)` if the key
    /// already existed, in which case `init` is never called.
    pub fn emplace<F>(&mut self, key: K, init: F) -> Result<bool, MapError>
    where
        F: FnOnce() -> V,
    {
        let mut key = AnyValue::new(key);
        self.map.emplace(&mut key, |slot| {
            slot.set(init());
            Ok(())
        })
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.at(&wrap(key))?.downcast_ref::<V>()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.at_mut_as::<V>(&wrap(key))
    }

    /// Runs a closure with read access to a stored value
    ///
    /// Returns `None` if the key doesn't exist.
    pub fn with<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.get(key).map(f)
    }

    /// Runs a closure with write access to a stored value
    ///
    /// Returns `None` if the key doesn't exist.
    pub fn with_mut<F, R>(&mut self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        self.get_mut(key).map(f)
    }

    /// Removes a value from the map
    ///
    /// Returns `true` if the key was present and removed, `false` if not present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.map.erase(&wrap(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains(&wrap(key))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns all keys in ascending order
    pub fn keys(&self) -> Vec<K> {
        self.entries().map(|(key, _)| key.clone()).collect()
    }

    /// Returns all values in key order
    pub fn values(&self) -> Vec<V> {
        self.entries().map(|(_, value)| value.clone()).collect()
    }

    /// Applies a function to all key-value pairs in key order
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error produced by `f`.
    pub fn apply<F>(&self, mut f: F) -> Result<(), MapError>
    where
        F: FnMut(&K, &V) -> Result<(), MapError>,
    {
        for (key, value) in self.entries() {
            f(key, value)?;
        }
        Ok(())
    }

    pub fn try_clone(&self) -> Result<Self, MapError> {
        Ok(Self {
            map: self.map.try_clone()?,
            _marker: PhantomData,
        })
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    pub fn into_map(self) -> Map {
        self.map
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.map.pairs().iter().filter_map(|pair| {
            let key = pair.key()?.downcast_ref::<K>()?;
            let value = pair.value()?.downcast_ref::<V>()?;
            Some((key, value))
        })
    }
}

fn wrap<K: NativeType>(key: &K) -> AnyValue {
    AnyValue::new(key.clone())
}

impl<K, V> PartialEq for TypedMap<K, V>
where
    K: NativeType,
    V: NativeType,
{
    fn eq(&self, other: &Self) -> bool {
        self.map.equal(&other.map)
    }
}

impl<K, V> PartialOrd for TypedMap<K, V>
where
    K: NativeType,
    V: NativeType,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.map.compare(&other.map))
    }
}

impl<K, V> fmt::Debug for TypedMap<K, V>
where
    K: NativeType + fmt::Debug,
    V: NativeType + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}
