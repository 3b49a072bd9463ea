use crate::any_value::AnyValue;
use crate::error::MapError;
use std::any::{self, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;

/// The operations a [`Map`](crate::Map) needs to manage one opaque type
///
/// A descriptor is published once, usually as a process-wide singleton, and is then
/// shared by reference between every pair and map that stores its type. It must never
/// change after publication.
///
/// Every operation works on [`AnyValue`]s. Implementations should treat values that
/// they do not [`accept`](TypeDescriptor::accepts) as foreign: constructors report
/// [`MapError::TypeMismatch`], `equal` answers `false`, and `compare` still returns a
/// consistent ordering.
pub trait TypeDescriptor: Send + Sync + 'static {
    /// Diagnostic name of the managed type
    fn name(&self) -> &'static str;

    /// The Rust type this descriptor manages
    fn value_type_id(&self) -> TypeId;

    /// Size in bytes of the managed type
    fn size(&self) -> usize;

    fn init_default(&self) -> Result<AnyValue, MapError>;

    fn init_copy(&self, src: &AnyValue) -> Result<AnyValue, MapError>;

    /// Transfer the contents of `src` into a new object, leaving `src` in the type's
    /// moved-from state
    fn init_move(&self, src: &mut AnyValue) -> Result<AnyValue, MapError>;

    fn deinit(&self, obj: AnyValue) {
        drop(obj);
    }

    fn assign_copy(&self, dest: &mut AnyValue, src: &AnyValue) -> Result<(), MapError>;

    fn assign_move(&self, dest: &mut AnyValue, src: &mut AnyValue) -> Result<(), MapError>;

    fn equal(&self, a: &AnyValue, b: &AnyValue) -> bool;

    fn compare(&self, a: &AnyValue, b: &AnyValue) -> Ordering;

    fn swap(&self, a: &mut AnyValue, b: &mut AnyValue);

    /// Whether `obj` is a value of this descriptor's type
    fn accepts(&self, obj: &AnyValue) -> bool {
        obj.value_type_id() == self.value_type_id()
    }
}

/// Identity comparison of two descriptors
///
/// Descriptors are singletons, so two references describe the same type exactly when
/// they point at the same descriptor object.
pub fn same_descriptor(a: &dyn TypeDescriptor, b: &dyn TypeDescriptor) -> bool {
    std::ptr::addr_eq(a, b) && a.value_type_id() == b.value_type_id() && a.name() == b.name()
}

pub(crate) fn type_mismatch(expected: &dyn TypeDescriptor, found: &AnyValue) -> MapError {
    MapError::TypeMismatch {
        expected: expected.name(),
        found: found.type_name(),
    }
}

/// Key and value descriptors of a [`Pair`](crate::Pair)
#[derive(Clone, Copy)]
pub struct PairDescriptor {
    key: &'static dyn TypeDescriptor,
    value: &'static dyn TypeDescriptor,
}

impl PairDescriptor {
    pub const fn new(key: &'static dyn TypeDescriptor, value: &'static dyn TypeDescriptor) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &'static dyn TypeDescriptor {
        self.key
    }

    pub fn value(&self) -> &'static dyn TypeDescriptor {
        self.value
    }
}

impl PartialEq for PairDescriptor {
    fn eq(&self, other: &Self) -> bool {
        same_descriptor(self.key, other.key) && same_descriptor(self.value, other.value)
    }
}

impl Eq for PairDescriptor {}

impl fmt::Debug for PairDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairDescriptor")
            .field("key", &self.key.name())
            .field("value", &self.value.name())
            .finish()
    }
}

/// The descriptor a [`Map`](crate::Map) is configured with
///
/// Maps keep their own copy. Copying is cheap because only the two descriptor
/// references are duplicated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MapDescriptor {
    pair: PairDescriptor,
}

impl MapDescriptor {
    pub const fn new(key: &'static dyn TypeDescriptor, value: &'static dyn TypeDescriptor) -> Self {
        Self {
            pair: PairDescriptor::new(key, value),
        }
    }

    pub const fn from_pair(pair: PairDescriptor) -> Self {
        Self { pair }
    }

    pub fn pair(&self) -> &PairDescriptor {
        &self.pair
    }

    pub fn key(&self) -> &'static dyn TypeDescriptor {
        self.pair.key
    }

    pub fn value(&self) -> &'static dyn TypeDescriptor {
        self.pair.value
    }

    /// Returns whether two map descriptors describe the same key and value types
    pub fn equal(&self, other: &MapDescriptor) -> bool {
        self == other
    }
}

impl fmt::Debug for MapDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapDescriptor")
            .field("key", &self.pair.key.name())
            .field("value", &self.pair.value.name())
            .finish()
    }
}

/// Types that get a descriptor for free
pub trait NativeType: Clone + Default + Ord + Send + Sync + 'static {}

impl<T> NativeType for T where T: Clone + Default + Ord + Send + Sync + 'static {}

/// A descriptor built from a type's own `Clone`, `Default` and `Ord` impls
///
/// Moving out of a value leaves `T::default()` behind.
///
/// # Examples
///
/// ```
/// use sovran_metamap::{AnyValue, NativeDescriptor, TypeDescriptor};
/// use std::cmp::Ordering;
///
/// static WORD: NativeDescriptor<String> = NativeDescriptor::new("word");
///
/// let a = AnyValue::new("apple".to_string());
/// let b = WORD.init_copy(&a).unwrap();
/// assert!(WORD.equal(&a, &b));
/// assert_eq!(WORD.compare(&a, &AnyValue::new("pear".to_string())), Ordering::Less);
/// ```
pub struct NativeDescriptor<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NativeDescriptor<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T: NativeType> NativeDescriptor<T> {
    /// A descriptor named after the Rust type
    pub fn named() -> Self {
        Self::new(any::type_name::<T>())
    }

    fn downcast<'a>(&self, obj: &'a AnyValue) -> Result<&'a T, MapError> {
        obj.downcast_ref::<T>().ok_or_else(|| type_mismatch(self, obj))
    }

    fn downcast_mut<'a>(&self, obj: &'a mut AnyValue) -> Result<&'a mut T, MapError> {
        let found = obj.type_name();
        obj.downcast_mut::<T>().ok_or(MapError::TypeMismatch {
            expected: self.name,
            found,
        })
    }
}

impl<T: NativeType> TypeDescriptor for NativeDescriptor<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn size(&self) -> usize {
        mem::size_of::<T>()
    }

    fn init_default(&self) -> Result<AnyValue, MapError> {
        Ok(AnyValue::new(T::default()))
    }

    fn init_copy(&self, src: &AnyValue) -> Result<AnyValue, MapError> {
        Ok(AnyValue::new(self.downcast(src)?.clone()))
    }

    fn init_move(&self, src: &mut AnyValue) -> Result<AnyValue, MapError> {
        Ok(AnyValue::new(mem::take(self.downcast_mut(src)?)))
    }

    fn assign_copy(&self, dest: &mut AnyValue, src: &AnyValue) -> Result<(), MapError> {
        let src = self.downcast(src)?;
        self.downcast_mut(dest)?.clone_from(src);
        Ok(())
    }

    fn assign_move(&self, dest: &mut AnyValue, src: &mut AnyValue) -> Result<(), MapError> {
        // Check dest first so a rejected assignment leaves src untouched.
        self.downcast_mut(dest)?;
        let taken = mem::take(self.downcast_mut(src)?);
        *self.downcast_mut(dest)? = taken;
        Ok(())
    }

    fn equal(&self, a: &AnyValue, b: &AnyValue) -> bool {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn compare(&self, a: &AnyValue, b: &AnyValue) -> Ordering {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => a.value_type_id().cmp(&b.value_type_id()),
        }
    }

    fn swap(&self, a: &mut AnyValue, b: &mut AnyValue) {
        // Each handle owns its box, so exchanging handles exchanges the values.
        mem::swap(a, b);
    }
}
