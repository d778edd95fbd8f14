//! Workflow orchestrators.
//!
//! Each service owns its stores, serializes mutations per entity key with
//! [`KeyedLocks`](crate::KeyedLocks), and publishes the events its domain
//! operations produce while still holding the key's lock, so events for one
//! entity leave in commit order.

pub mod finance;
pub mod inventory;
pub mod loyalty;
pub mod notifications;
pub mod price;

use destore_core::{DomainError, DomainResult};

/// Turn a missing lookup into `NotFound`.
pub(crate) fn require<T>(
    found: Option<T>,
    entity: &'static str,
    key: impl core::fmt::Display,
) -> DomainResult<T> {
    found.ok_or_else(|| DomainError::not_found(entity, key))
}
