use thiserror::Error;

/// Errors that can occur when using a [`Map`](crate::Map) or [`Pair`](crate::Pair)
///
/// A missing key is not an error: lookups return `None` and erase returns `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Growing the pair array failed, either in the allocator or against the map's
    /// capacity limit. The map is left exactly as it was.
    #[error("failed to allocate room for {requested} pairs")]
    AllocationFailure { requested: usize },

    /// The pair was built against a different descriptor than the map's
    #[error("pair descriptor does not match the map descriptor")]
    DescriptorMismatch,

    /// An opaque value does not belong to the descriptor it was handed to
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The pair has been moved from and owns no key or value
    #[error("pair is empty")]
    EmptyPair,

    /// The map has been moved from and has no descriptor
    #[error("map has been moved from")]
    MovedFrom,

    /// A value initializer or descriptor could not construct its object
    #[error("construction failed: {0}")]
    Construction(String),
}
