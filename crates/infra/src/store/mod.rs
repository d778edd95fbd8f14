//! Storage abstractions for service-private state.
//!
//! - [`EntityStore`]: entities keyed by their unique constraint
//! - [`LedgerLog`]: append-only, per-key ordered fact log
//! - [`KeyedLocks`]: per-key transactional boundary for read-modify-write

pub mod entity_store;
pub mod keyed_lock;
pub mod ledger;

pub use entity_store::{EntityStore, InMemoryEntityStore};
pub use keyed_lock::KeyedLocks;
pub use ledger::LedgerLog;

use destore_core::DomainError;

pub(crate) fn poisoned(what: &str) -> DomainError {
    DomainError::external("storage", format!("{what} lock poisoned"))
}
