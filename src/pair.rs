use crate::any_value::AnyValue;
use crate::descriptor::{type_mismatch, PairDescriptor, TypeDescriptor};
use crate::error::MapError;
use std::cmp::Ordering;
use std::mem;

#[derive(Debug)]
struct Slots {
    key: AnyValue,
    value: AnyValue,
}

/// An owned key/value tuple of opaque objects
///
/// A pair either owns both its key and its value or owns neither. It is empty after
/// being moved from with [`take`](Pair::take) or cleared with
/// [`deinit`](Pair::deinit). An empty pair can still be dropped, reassigned or
/// compared, but it can't be inserted into a map.
///
/// # Examples
///
/// ```
/// use sovran_metamap::{descriptor_of, AnyValue, MapError, Pair, PairDescriptor};
///
/// let descriptor = PairDescriptor::new(descriptor_of::<String>(), descriptor_of::<i32>());
/// let mut pair = Pair::from_key_value(
///     descriptor,
///     AnyValue::new("answer".to_string()),
///     AnyValue::new(42),
/// )?;
///
/// let moved = pair.take();
/// assert!(pair.is_empty());
/// assert_eq!(moved.value().and_then(|v| v.downcast_ref::<i32>()), Some(&42));
/// # Ok::<(), MapError>(())
/// ```
#[derive(Debug)]
pub struct Pair {
    descriptor: PairDescriptor,
    slots: Option<Slots>,
}

impl Pair {
    /// An empty pair bound to `descriptor`
    pub fn empty(descriptor: PairDescriptor) -> Self {
        Self {
            descriptor,
            slots: None,
        }
    }

    /// Default-constructs both the key and the value
    pub fn new_default(descriptor: PairDescriptor) -> Result<Self, MapError> {
        let key = descriptor.key().init_default()?;
        let value = match descriptor.value().init_default() {
            Ok(value) => value,
            Err(e) => {
                descriptor.key().deinit(key);
                return Err(e);
            }
        };
        Ok(Self::assemble(descriptor, key, value))
    }

    /// Takes ownership of an existing key and value without copying either
    ///
    /// # Errors
    ///
    /// Returns `MapError::TypeMismatch` if either object doesn't belong to its
    /// descriptor. Both objects are released in that case.
    pub fn from_key_value(
        descriptor: PairDescriptor,
        key: AnyValue,
        value: AnyValue,
    ) -> Result<Self, MapError> {
        check(descriptor.key(), &key)?;
        check(descriptor.value(), &value)?;
        Ok(Self::assemble(descriptor, key, value))
    }

    /// Copies the key and takes ownership of the value
    pub fn from_key_copy_value(
        descriptor: PairDescriptor,
        key: &AnyValue,
        value: AnyValue,
    ) -> Result<Self, MapError> {
        check(descriptor.key(), key)?;
        check(descriptor.value(), &value)?;
        let key = descriptor.key().init_copy(key)?;
        Ok(Self::assemble(descriptor, key, value))
    }

    /// Copies both the key and the value
    pub fn from_copies(
        descriptor: PairDescriptor,
        key: &AnyValue,
        value: &AnyValue,
    ) -> Result<Self, MapError> {
        check(descriptor.key(), key)?;
        check(descriptor.value(), value)?;
        copy_slots(descriptor, key, value).map(|slots| Self {
            descriptor,
            slots: Some(slots),
        })
    }

    fn assemble(descriptor: PairDescriptor, key: AnyValue, value: AnyValue) -> Self {
        Self {
            descriptor,
            slots: Some(Slots { key, value }),
        }
    }

    /// Deep copy through the key and value descriptors
    ///
    /// If copying the value fails after the key was copied, the key copy is
    /// released before the error is returned.
    pub fn try_clone(&self) -> Result<Self, MapError> {
        let slots = match &self.slots {
            Some(slots) => Some(copy_slots(self.descriptor, &slots.key, &slots.value)?),
            None => None,
        };
        Ok(Self {
            descriptor: self.descriptor,
            slots,
        })
    }

    /// Moves the key and value out into a new pair, leaving this one empty
    pub fn take(&mut self) -> Self {
        Self {
            descriptor: self.descriptor,
            slots: self.slots.take(),
        }
    }

    /// Destroys the key and value. Does nothing on an empty pair.
    pub fn deinit(&mut self) {
        if let Some(Slots { key, value }) = self.slots.take() {
            self.descriptor.key().deinit(key);
            self.descriptor.value().deinit(value);
        }
    }

    /// Replaces this pair with a copy of `src`
    ///
    /// On failure this pair is left unchanged.
    pub fn assign_copy(&mut self, src: &Pair) -> Result<(), MapError> {
        let copy = src.try_clone()?;
        *self = copy;
        Ok(())
    }

    /// Replaces this pair with the contents of `src`, leaving `src` empty
    pub fn assign_move(&mut self, src: &mut Pair) {
        *self = src.take();
    }

    pub fn swap(&mut self, other: &mut Pair) {
        mem::swap(self, other);
    }

    pub fn descriptor(&self) -> &PairDescriptor {
        &self.descriptor
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_none()
    }

    pub fn key(&self) -> Option<&AnyValue> {
        self.slots.as_ref().map(|slots| &slots.key)
    }

    pub fn value(&self) -> Option<&AnyValue> {
        self.slots.as_ref().map(|slots| &slots.value)
    }

    /// The value as a `V` for in-place modification
    ///
    /// The value can't be replaced with one of another type. Returns `None` on an
    /// empty pair or if the value isn't a `V`.
    pub fn value_mut_as<V: 'static>(&mut self) -> Option<&mut V> {
        self.slots.as_mut()?.value.downcast_mut::<V>()
    }

    /// Releases ownership of the key and value to the caller
    pub fn into_parts(mut self) -> Option<(AnyValue, AnyValue)> {
        self.slots.take().map(|Slots { key, value }| (key, value))
    }

    /// Orders two pairs by key alone
    pub fn compare_keys(&self, other: &Pair) -> Ordering {
        match (self.key(), other.key()) {
            (Some(a), Some(b)) => self.descriptor.key().compare(a, b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        }
    }

    /// Orders two pairs by key, then by value
    pub fn compare(&self, other: &Pair) -> Ordering {
        self.compare_keys(other).then_with(|| match (self.value(), other.value()) {
            (Some(a), Some(b)) => self.descriptor.value().compare(a, b),
            _ => Ordering::Equal,
        })
    }

    /// Whether both the keys and the values are equal
    pub fn equal(&self, other: &Pair) -> bool {
        match (&self.slots, &other.slots) {
            (Some(a), Some(b)) => {
                self.descriptor.key().equal(&a.key, &b.key)
                    && self.descriptor.value().equal(&a.value, &b.value)
            }
            (None, None) => true,
            _ => false,
        }
    }
}

impl Drop for Pair {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl PartialOrd for Pair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

fn check(descriptor: &dyn TypeDescriptor, obj: &AnyValue) -> Result<(), MapError> {
    if descriptor.accepts(obj) {
        Ok(())
    } else {
        Err(type_mismatch(descriptor, obj))
    }
}

fn copy_slots(
    descriptor: PairDescriptor,
    key: &AnyValue,
    value: &AnyValue,
) -> Result<Slots, MapError> {
    let key = descriptor.key().init_copy(key)?;
    match descriptor.value().init_copy(value) {
        Ok(value) => Ok(Slots { key, value }),
        Err(e) => {
            descriptor.key().deinit(key);
            Err(e)
        }
    }
}
