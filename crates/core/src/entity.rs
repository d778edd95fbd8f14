//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stores key entities by `Id`, which must be the entity's unique constraint
/// (e.g. `(product_id, store_id)` for a stock item). Mutations for the same id
/// are serialized by the store; different ids proceed concurrently.
pub trait Entity {
    /// Strongly-typed entity identifier (the unique key).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Number of committed mutations applied to this entity.
    fn version(&self) -> u64;
}
