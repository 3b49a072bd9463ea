//! Process-wide native descriptors.
//!
//! Every [`NativeType`] gets exactly one [`NativeDescriptor`], built the first time
//! [`descriptor_of`] asks for it and shared by every map afterwards. Construction
//! happens while the registry lock is held: concurrent first callers block until the
//! descriptor is published and then observe the same instance.
use crate::descriptor::{NativeDescriptor, NativeType, TypeDescriptor};
use std::any::{self, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::debug;

type Registry = HashMap<TypeId, &'static dyn TypeDescriptor>;

static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> &'static Mutex<Registry> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the shared native descriptor for `T`
///
/// # Examples
///
/// ```
/// use sovran_metamap::{descriptor_of, same_descriptor};
///
/// let a = descriptor_of::<String>();
/// let b = descriptor_of::<String>();
/// assert!(same_descriptor(a, b));
/// assert!(!same_descriptor(a, descriptor_of::<u64>()));
/// ```
pub fn descriptor_of<T: NativeType>() -> &'static dyn TypeDescriptor {
    // The only mutation below is a single insert, so a poisoned lock still
    // guards a consistent table.
    let mut entries = registry().lock().unwrap_or_else(PoisonError::into_inner);
    *entries.entry(TypeId::of::<T>()).or_insert_with(|| {
        debug!(type_name = any::type_name::<T>(), "registering native descriptor");
        let descriptor: &'static dyn TypeDescriptor =
            Box::leak(Box::new(NativeDescriptor::<T>::named()));
        descriptor
    })
}

/// Number of native descriptors constructed so far
pub fn registered_count() -> usize {
    registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}
