//! `destore-core`: shared building blocks for the retail back-office services.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the error taxonomy and the entity contract used by the
//! per-service stores.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorBody};
pub use id::{generate_reference, ApplicationId, NotificationId, ProductId, PromotionId, StoreId};
pub use money::Money;
