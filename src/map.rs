use crate::any_value::AnyValue;
use crate::descriptor::{type_mismatch, MapDescriptor, TypeDescriptor};
use crate::error::MapError;
use crate::pair::Pair;
use std::any::{self, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use tracing::{debug, trace};

/// Smallest capacity a live map ever has
pub const MIN_CAPACITY: usize = 2;

/// A sorted associative container over opaque keys and values
///
/// `Map` stores [`Pair`]s in a contiguous array kept sorted by key under the key
/// descriptor's comparator. Lookups are binary searches; insertions and removals shift
/// the tail of the array. Keys are unique.
///
/// The pair array doubles when it is full and halves when fewer than a quarter of
/// its slots are in use, never dropping below [`MIN_CAPACITY`]. Growth is fallible: if
/// the allocation (or the configured capacity limit) refuses, the operation returns
/// [`MapError::AllocationFailure`] and the map is left as it was.
///
/// A map that has been moved from with [`take`](Map::take) has no descriptor. It
/// behaves as an empty map for queries, rejects insertions with
/// [`MapError::MovedFrom`], and can be brought back to life by
/// [`assign_copy`](Map::assign_copy) or [`assign_move`](Map::assign_move).
///
/// # Examples
///
/// ```
/// use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError, Pair};
///
/// let descriptor = MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<i32>());
/// let mut map = Map::new(descriptor)?;
///
/// let mut pair = Pair::from_key_value(
///     *descriptor.pair(),
///     AnyValue::new("the".to_string()),
///     AnyValue::new(1),
/// )?;
/// map.insert_or_assign(&mut pair)?;
/// assert!(pair.is_empty());
///
/// let key = AnyValue::new("the".to_string());
/// assert!(map.contains(&key));
/// assert_eq!(map.at(&key).and_then(|v| v.downcast_ref::<i32>()), Some(&1));
/// assert!(map.erase(&key));
/// assert!(map.is_empty());
/// # Ok::<(), MapError>(())
/// ```
pub struct Map {
    descriptor: Option<MapDescriptor>,
    pairs: Vec<Pair>,
    capacity: usize,
    capacity_limit: Option<usize>,
}

impl Map {
    /// Creates an empty map
    ///
    /// # Errors
    ///
    /// Returns `MapError::AllocationFailure` if the initial pair array can't be
    /// allocated.
    pub fn new(descriptor: MapDescriptor) -> Result<Self, MapError> {
        Self::build(descriptor, None)
    }

    /// Creates an empty map that refuses to grow past `limit` pairs
    ///
    /// The limit behaves like an allocator quota: growth beyond it fails with
    /// `MapError::AllocationFailure`. Limits below [`MIN_CAPACITY`] are raised to it.
    pub fn with_capacity_limit(descriptor: MapDescriptor, limit: usize) -> Result<Self, MapError> {
        Self::build(descriptor, Some(limit.max(MIN_CAPACITY)))
    }

    fn build(descriptor: MapDescriptor, capacity_limit: Option<usize>) -> Result<Self, MapError> {
        let mut pairs = Vec::new();
        reserve(&mut pairs, MIN_CAPACITY)?;
        Ok(Self {
            descriptor: Some(descriptor),
            pairs,
            capacity: MIN_CAPACITY,
            capacity_limit,
        })
    }

    /// Deep copies every pair into a new, independent map
    ///
    /// The copy has the same descriptor, capacity and capacity limit. If any pair
    /// fails to copy, the pairs copied so far are released and the error is returned.
    pub fn try_clone(&self) -> Result<Self, MapError> {
        let mut pairs = Vec::new();
        reserve(&mut pairs, self.capacity)?;
        for pair in &self.pairs {
            pairs.push(pair.try_clone()?);
        }
        Ok(Self {
            descriptor: self.descriptor,
            pairs,
            capacity: self.capacity,
            capacity_limit: self.capacity_limit,
        })
    }

    /// Moves the whole map out, leaving this one in the moved-from state
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Replaces this map with a deep copy of `src`
    ///
    /// The copy is built before anything is released, so on failure this map is
    /// unchanged.
    pub fn assign_copy(&mut self, src: &Map) -> Result<(), MapError> {
        let copy = src.try_clone()?;
        *self = copy;
        Ok(())
    }

    /// Replaces this map with the contents of `src`, leaving `src` moved-from
    pub fn assign_move(&mut self, src: &mut Map) {
        *self = src.take();
    }

    /// The map's descriptor, or `None` once moved from
    pub fn descriptor(&self) -> Option<&MapDescriptor> {
        self.descriptor.as_ref()
    }

    /// Whether the map has a descriptor and accepts insertions
    pub fn is_live(&self) -> bool {
        self.descriptor.is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pair slots currently allocated
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity_limit
    }

    /// Upper bound on the number of pairs any map can address
    pub fn max_size(&self) -> usize {
        isize::MAX as usize / mem::size_of::<Pair>()
    }

    /// Returns the pair whose key equals `key`
    pub fn find(&self, key: &AnyValue) -> Option<&Pair> {
        let index = self.search(key)?.ok()?;
        self.pairs.get(index)
    }

    /// Returns the value mapped to `key`
    pub fn at(&self, key: &AnyValue) -> Option<&AnyValue> {
        self.find(key).and_then(Pair::value)
    }

    /// Returns the value mapped to `key` as a `V` for in-place modification
    ///
    /// Only the value is reachable, and only through its concrete type, so neither the
    /// ordering nor the value's type can be changed. Returns `None` if the key is
    /// missing or the stored value isn't a `V`.
    pub fn at_mut_as<V: 'static>(&mut self, key: &AnyValue) -> Option<&mut V> {
        let index = self.search(key)?.ok()?;
        self.pairs.get_mut(index)?.value_mut_as::<V>()
    }

    /// Typed lookup: wraps `key` and downcasts the value to `V`
    pub fn get_as<K, V>(&self, key: K) -> Option<&V>
    where
        K: any::Any + Send + Sync,
        V: 'static,
    {
        self.at(&AnyValue::new(key))?.downcast_ref::<V>()
    }

    pub fn contains(&self, key: &AnyValue) -> bool {
        matches!(self.search(key), Some(Ok(_)))
    }

    /// Destroys every pair and returns the capacity to [`MIN_CAPACITY`]
    pub fn clear(&mut self) {
        self.pairs.clear();
        if self.capacity > MIN_CAPACITY {
            self.pairs.shrink_to(MIN_CAPACITY);
            trace!(from = self.capacity, to = MIN_CAPACITY, "cleared pair array");
            self.capacity = MIN_CAPACITY;
        }
    }

    /// Removes the pair mapped to `key`
    ///
    /// Returns `true` if a pair was removed and `false` if the key wasn't present.
    pub fn erase(&mut self, key: &AnyValue) -> bool {
        let Some(Ok(index)) = self.search(key) else {
            return false;
        };
        drop(self.pairs.remove(index));
        self.shrink_on_policy();
        true
    }

    /// Inserts `pair`, or replaces the pair with the same key, by moving it in
    ///
    /// On success `pair` is left empty. An existing entry is replaced whole (key
    /// and value) in its current position.
    ///
    /// # Errors
    ///
    /// - Returns `MapError::MovedFrom` if this map has no descriptor
    /// - Returns `MapError::DescriptorMismatch` if `pair` was built for another descriptor
    /// - Returns `MapError::EmptyPair` if `pair` owns nothing
    /// - Returns `MapError::AllocationFailure` if the array can't grow; `pair` is untouched
    pub fn insert_or_assign(&mut self, pair: &mut Pair) -> Result<(), MapError> {
        let slot = self.locate(pair)?;
        match slot {
            Ok(index) => self.pairs[index] = pair.take(),
            Err(index) => {
                self.reserve_slot()?;
                self.pairs.insert(index, pair.take());
            }
        }
        Ok(())
    }

    /// Inserts a copy of `pair`, or replaces the pair with the same key by a copy
    ///
    /// The copy is made before the map is touched, so a failed copy leaves the map
    /// unmodified.
    pub fn insert_or_assign_copy(&mut self, pair: &Pair) -> Result<(), MapError> {
        let slot = self.locate(pair)?;
        let copy = pair.try_clone()?;
        match slot {
            Ok(index) => self.pairs[index] = copy,
            Err(index) => {
                self.reserve_slot()?;
                self.pairs.insert(index, copy);
            }
        }
        Ok(())
    }

    /// Constructs a new pair in place, moving `key` into it
    ///
    /// If `key` is already present nothing happens and `Ok(false)` is returned;
    /// `init` is dropped without being called. Otherwise a default value is built by
    /// the value descriptor, handed to `init` for initialization, and the pair is
    /// inserted. `key` is left in its moved-from state only once the value is built.
    ///
    /// On any failure everything constructed so far is released and the map's
    /// contents are unchanged.
    pub fn emplace<F>(&mut self, key: &mut AnyValue, init: F) -> Result<bool, MapError>
    where
        F: FnOnce(&mut AnyValue) -> Result<(), MapError>,
    {
        let Some((descriptor, index)) = self.vacancy(key)? else {
            return Ok(false);
        };
        let previous = self.capacity;
        let value = self.construct_value(&descriptor, init)?;
        let owned_key = descriptor.key().init_move(key);
        self.place(&descriptor, index, previous, owned_key, value)
    }

    /// Like [`emplace`](Map::emplace), but copies `key` instead of moving it
    pub fn emplace_key_copy<F>(&mut self, key: &AnyValue, init: F) -> Result<bool, MapError>
    where
        F: FnOnce(&mut AnyValue) -> Result<(), MapError>,
    {
        let Some((descriptor, index)) = self.vacancy(key)? else {
            return Ok(false);
        };
        let previous = self.capacity;
        let value = self.construct_value(&descriptor, init)?;
        let owned_key = descriptor.key().init_copy(key);
        self.place(&descriptor, index, previous, owned_key, value)
    }

    /// Sorted position for a new `key`, or `None` if the key is already present
    fn vacancy(&self, key: &AnyValue) -> Result<Option<(MapDescriptor, usize)>, MapError> {
        let descriptor = self.descriptor.ok_or(MapError::MovedFrom)?;
        if !descriptor.key().accepts(key) {
            return Err(type_mismatch(descriptor.key(), key));
        }
        Ok(self.position(key).err().map(|index| (descriptor, index)))
    }

    /// Builds an emplaced value and makes room for it
    fn construct_value<F>(&mut self, descriptor: &MapDescriptor, init: F) -> Result<AnyValue, MapError>
    where
        F: FnOnce(&mut AnyValue) -> Result<(), MapError>,
    {
        let value_descriptor = descriptor.value();
        let mut value = value_descriptor.init_default()?;
        if let Err(e) = init(&mut value) {
            value_descriptor.deinit(value);
            return Err(e);
        }
        if !value_descriptor.accepts(&value) {
            let e = type_mismatch(value_descriptor, &value);
            value_descriptor.deinit(value);
            return Err(e);
        }
        if let Err(e) = self.reserve_slot() {
            value_descriptor.deinit(value);
            return Err(e);
        }
        Ok(value)
    }

    /// Inserts the emplaced pair, or undoes the slot reservation if the key or the
    /// pair couldn't be built
    fn place(
        &mut self,
        descriptor: &MapDescriptor,
        index: usize,
        previous_capacity: usize,
        key: Result<AnyValue, MapError>,
        value: AnyValue,
    ) -> Result<bool, MapError> {
        let pair = match key {
            Ok(key) => Pair::from_key_value(*descriptor.pair(), key, value),
            Err(e) => {
                descriptor.value().deinit(value);
                Err(e)
            }
        };
        match pair {
            Ok(pair) => {
                self.pairs.insert(index, pair);
                Ok(true)
            }
            Err(e) => {
                self.restore_capacity(previous_capacity);
                Err(e)
            }
        }
    }

    /// Exchanges the contents of two maps without touching any pair
    pub fn swap(&mut self, other: &mut Map) {
        mem::swap(self, other);
    }

    /// Whether both maps hold equal keys mapped to equal values
    ///
    /// Two live maps with different descriptors are never equal, even when empty. A
    /// moved-from map equals any empty map.
    pub fn equal(&self, other: &Map) -> bool {
        self.len() == other.len()
            && self.comparable(other)
            && self
                .pairs
                .iter()
                .zip(&other.pairs)
                .all(|(a, b)| a.equal(b))
    }

    /// Lexicographic comparison of the sorted (key, value) sequences
    ///
    /// A map that is a strict prefix of the other compares less.
    pub fn compare(&self, other: &Map) -> Ordering {
        for (a, b) in self.pairs.iter().zip(&other.pairs) {
            match a.compare(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.len().cmp(&other.len())
    }

    /// Both maps share a descriptor, or at least one of them is moved-from
    fn comparable(&self, other: &Map) -> bool {
        match (&self.descriptor, &other.descriptor) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    pub(crate) fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    fn search(&self, key: &AnyValue) -> Option<Result<usize, usize>> {
        let descriptor = self.descriptor.as_ref()?;
        if !descriptor.key().accepts(key) {
            return None;
        }
        Some(self.position(key))
    }

    fn position(&self, key: &AnyValue) -> Result<usize, usize> {
        let Some(descriptor) = self.descriptor.as_ref() else {
            return Err(0);
        };
        let key_descriptor = descriptor.key();
        self.pairs.binary_search_by(|pair| match pair.key() {
            Some(existing) => key_descriptor.compare(existing, key),
            // Pairs stored in a map are never empty.
            None => Ordering::Less,
        })
    }

    fn locate(&self, pair: &Pair) -> Result<Result<usize, usize>, MapError> {
        let descriptor = self.descriptor.as_ref().ok_or(MapError::MovedFrom)?;
        if pair.descriptor() != descriptor.pair() {
            debug!(
                expected = ?descriptor.pair(),
                found = ?pair.descriptor(),
                "rejecting pair with mismatched descriptor"
            );
            return Err(MapError::DescriptorMismatch);
        }
        let key = pair.key().ok_or(MapError::EmptyPair)?;
        Ok(self.position(key))
    }

    /// Makes sure one more pair fits, doubling the array if it is full
    fn reserve_slot(&mut self) -> Result<(), MapError> {
        if self.pairs.len() < self.capacity {
            return Ok(());
        }
        let requested = self
            .capacity
            .checked_mul(2)
            .ok_or(MapError::AllocationFailure {
                requested: usize::MAX,
            })?;
        self.grow_to(requested)
    }

    fn grow_to(&mut self, new_capacity: usize) -> Result<(), MapError> {
        if let Some(limit) = self.capacity_limit {
            if new_capacity > limit {
                debug!(requested = new_capacity, limit, "capacity limit reached");
                return Err(MapError::AllocationFailure {
                    requested: new_capacity,
                });
            }
        }
        reserve(&mut self.pairs, new_capacity)?;
        trace!(from = self.capacity, to = new_capacity, "grew pair array");
        self.capacity = new_capacity;
        Ok(())
    }

    fn restore_capacity(&mut self, capacity: usize) {
        if capacity < self.capacity {
            self.pairs.shrink_to(capacity);
            trace!(from = self.capacity, to = capacity, "released reserved slot");
            self.capacity = capacity;
        }
    }

    fn shrink_on_policy(&mut self) {
        let mut new_capacity = self.capacity;
        while self.pairs.len() < new_capacity / 4 && new_capacity > MIN_CAPACITY {
            new_capacity /= 2;
        }
        if new_capacity != self.capacity {
            self.pairs.shrink_to(new_capacity);
            trace!(from = self.capacity, to = new_capacity, "shrank pair array");
            self.capacity = new_capacity;
        }
    }
}

/// Moved-from state: no descriptor, no pairs, no capacity
impl Default for Map {
    fn default() -> Self {
        Self {
            descriptor: None,
            pairs: Vec::new(),
            capacity: 0,
            capacity_limit: None,
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

/// Maps with different descriptors are unordered
impl PartialOrd for Map {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.comparable(other).then(|| self.compare(other))
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("descriptor", &self.descriptor)
            .field("len", &self.pairs.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Ensures `pairs` can hold `capacity` entries without reallocating
fn reserve(pairs: &mut Vec<Pair>, capacity: usize) -> Result<(), MapError> {
    let additional = capacity.saturating_sub(pairs.len());
    pairs.try_reserve_exact(additional).map_err(|e| {
        debug!(requested = capacity, error = %e, "pair array allocation failed");
        MapError::AllocationFailure {
            requested: capacity,
        }
    })
}

/// A descriptor whose values are maps
///
/// Lets a [`Map`] be stored as the value (or key) of another map. New values must be
/// bound to the inner descriptor. A stored map reached through
/// [`Map::at_mut_as`] can still be moved from or replaced; copies and moves of such a
/// value keep working.
///
/// # Examples
///
/// ```
/// use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapValueDescriptor, TypeDescriptor};
/// use std::sync::LazyLock;
///
/// static SCORES: LazyLock<MapValueDescriptor> = LazyLock::new(|| {
///     MapValueDescriptor::new(MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<u32>()))
/// });
///
/// let inner = SCORES.init_default().unwrap();
/// assert!(inner.downcast_ref::<Map>().unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct MapValueDescriptor {
    descriptor: MapDescriptor,
}

impl MapValueDescriptor {
    pub const fn new(descriptor: MapDescriptor) -> Self {
        Self { descriptor }
    }

    /// Descriptor every inner map carries
    pub fn inner(&self) -> &MapDescriptor {
        &self.descriptor
    }

    /// A map bound to the inner descriptor, the only kind of value this descriptor
    /// accepts for storage
    fn bound<'a>(&self, obj: &'a AnyValue) -> Result<&'a Map, MapError> {
        self.map(obj)
            .ok()
            .filter(|map| map.descriptor.as_ref() == Some(&self.descriptor))
            .ok_or_else(|| type_mismatch(self, obj))
    }

    // Copies and moves only require a `Map`.
    fn map<'a>(&self, obj: &'a AnyValue) -> Result<&'a Map, MapError> {
        obj.downcast_ref::<Map>().ok_or_else(|| type_mismatch(self, obj))
    }

    fn map_mut<'a>(&self, obj: &'a mut AnyValue) -> Result<&'a mut Map, MapError> {
        let found = obj.type_name();
        obj.downcast_mut::<Map>().ok_or(MapError::TypeMismatch {
            expected: any::type_name::<Map>(),
            found,
        })
    }
}

impl TypeDescriptor for MapValueDescriptor {
    fn name(&self) -> &'static str {
        any::type_name::<Map>()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<Map>()
    }

    fn size(&self) -> usize {
        mem::size_of::<Map>()
    }

    fn init_default(&self) -> Result<AnyValue, MapError> {
        Map::new(self.descriptor).map(AnyValue::new)
    }

    fn init_copy(&self, src: &AnyValue) -> Result<AnyValue, MapError> {
        self.map(src)?.try_clone().map(AnyValue::new)
    }

    /// The source map is left moved-from
    fn init_move(&self, src: &mut AnyValue) -> Result<AnyValue, MapError> {
        self.map(src)?;
        Ok(AnyValue::new(self.map_mut(src)?.take()))
    }

    fn assign_copy(&self, dest: &mut AnyValue, src: &AnyValue) -> Result<(), MapError> {
        let src = self.map(src)?;
        self.map_mut(dest)?.assign_copy(src)
    }

    fn assign_move(&self, dest: &mut AnyValue, src: &mut AnyValue) -> Result<(), MapError> {
        self.map(src)?;
        self.map_mut(dest)?;
        let taken = self.map_mut(src)?.take();
        *self.map_mut(dest)? = taken;
        Ok(())
    }

    fn equal(&self, a: &AnyValue, b: &AnyValue) -> bool {
        match (a.downcast_ref::<Map>(), b.downcast_ref::<Map>()) {
            (Some(a), Some(b)) => a.equal(b),
            _ => false,
        }
    }

    fn compare(&self, a: &AnyValue, b: &AnyValue) -> Ordering {
        match (a.downcast_ref::<Map>(), b.downcast_ref::<Map>()) {
            (Some(a), Some(b)) => a.compare(b),
            _ => a.value_type_id().cmp(&b.value_type_id()),
        }
    }

    fn swap(&self, a: &mut AnyValue, b: &mut AnyValue) {
        mem::swap(a, b);
    }

    fn accepts(&self, obj: &AnyValue) -> bool {
        self.bound(obj).is_ok()
    }
}
