//! # sovran-metamap
//!
//! A sorted, type-erased associative container driven by runtime type descriptors.
//!
//! `sovran-metamap` stores keys and values of types it knows nothing about at compile
//! time. Each map is configured with a [`MapDescriptor`]: a pair of
//! [`TypeDescriptor`]s that know how to construct, copy, move, destroy, compare and
//! swap the opaque [`AnyValue`]s kept in the map.
//!
//! ## Key Features
//!
//! - **Descriptor driven**: all per-element behavior goes through `&'static dyn TypeDescriptor`
//! - **Sorted storage**: pairs live in one array ordered by key, found by binary search
//! - **Explicit ownership**: distinct copy (`try_clone`, `insert_or_assign_copy`) and
//!   move (`take`, `insert_or_assign`) operations
//! - **Failure safe**: allocation and copy failures are reported as [`MapError`] and
//!   leave the map in its previous state
//! - **Typed facade**: [`TypedMap`] gives a statically typed API over the same storage
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError, Pair};
//!
//! fn main() -> Result<(), MapError> {
//!     // Shared descriptors for the key and value types
//!     let descriptor = MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<i32>());
//!     let mut map = Map::new(descriptor)?;
//!
//!     // Insert or replace entries
//!     for (word, n) in [("the", 1), ("quick", 2), ("the", 3)] {
//!         let mut pair = Pair::from_key_value(
//!             *descriptor.pair(),
//!             AnyValue::new(word.to_string()),
//!             AnyValue::new(n),
//!         )?;
//!         map.insert_or_assign(&mut pair)?;
//!     }
//!
//!     assert_eq!(map.len(), 2);
//!     assert_eq!(map.get_as::<String, i32>("the".to_string()), Some(&3));
//!     assert_eq!(map.get_as::<String, i32>("quick".to_string()), Some(&2));
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Emplacing Values In-Place
//!
//! ```rust
//! use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError};
//!
//! fn main() -> Result<(), MapError> {
//!     let mut map = Map::new(MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<u32>()))?;
//!
//!     let key = AnyValue::new("visits".to_string());
//!
//!     // The value descriptor default-constructs the slot, the closure fills it in
//!     assert!(map.emplace_key_copy(&key, |slot| {
//!         slot.set(10u32);
//!         Ok(())
//!     })?);
//!
//!     // A second emplace on the same key does nothing
//!     assert!(!map.emplace_key_copy(&key, |slot| {
//!         slot.set(99u32);
//!         Ok(())
//!     })?);
//!
//!     if let Some(visits) = map.at_mut_as::<u32>(&key) {
//!         *visits += 1;
//!     }
//!     assert_eq!(map.get_as::<String, u32>("visits".to_string()), Some(&11));
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Error Handling
//!
//! ```rust
//! use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError, Pair, PairDescriptor};
//!
//! let descriptor = MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<i32>());
//! let mut map = match Map::new(descriptor) {
//!     Ok(map) => map,
//!     Err(e) => {
//!         eprintln!("Failed to create map: {}", e);
//!         return;
//!     }
//! };
//!
//! // A pair built for another descriptor is rejected
//! let other = PairDescriptor::new(descriptor_of::<String>(), descriptor_of::<i64>());
//! let mut pair = match Pair::from_key_value(other, AnyValue::new("k".to_string()), AnyValue::new(1i64)) {
//!     Ok(pair) => pair,
//!     Err(e) => {
//!         eprintln!("Failed to build pair: {}", e);
//!         return;
//!     }
//! };
//!
//! match map.insert_or_assign(&mut pair) {
//!     Ok(()) => println!("Inserted"),
//!     Err(MapError::DescriptorMismatch) => println!("Pair belongs to another map type"),
//!     Err(MapError::AllocationFailure { requested }) => println!("No room for {} pairs", requested),
//!     Err(e) => println!("Other error: {}", e),
//! }
//!
//! // Missing keys are not errors
//! assert!(map.at(&AnyValue::new("missing".to_string())).is_none());
//! assert!(!map.erase(&AnyValue::new("missing".to_string())));
//! ```

mod any_value;
mod descriptor;
mod error;
mod map;
mod pair;
mod registry;
mod typed;

pub use any_value::AnyValue;
pub use descriptor::{
    same_descriptor, MapDescriptor, NativeDescriptor, NativeType, PairDescriptor, TypeDescriptor,
};
pub use error::MapError;
pub use map::{Map, MapValueDescriptor, MIN_CAPACITY};
pub use pair::Pair;
pub use registry::{descriptor_of, registered_count};
pub use typed::TypedMap;
