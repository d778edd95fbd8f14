//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// `NotFound`, `Validation` and `IllegalState` surface directly to callers.
/// `ExternalService` is produced by adapters (e.g. the finance decision
/// simulator); workflows convert it into an explicit terminal state instead of
/// letting it escape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No entity exists for the given key.
    #[error("{entity} not found with {key}")]
    NotFound { entity: &'static str, key: String },

    /// Input rejected by a business rule (insufficient stock, duplicate key, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not valid for the entity's current lifecycle state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A collaborating external system failed or timed out.
    #[error("external service '{service}' error: {message}")]
    ExternalService { service: String, message: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Arithmetic on an amount left the representable decimal range.
    pub fn out_of_range() -> Self {
        Self::Validation("amount out of range".to_string())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn external(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::Validation(_) | DomainError::InvalidId(_) => "VALIDATION_ERROR",
            DomainError::IllegalState(_) => "ILLEGAL_STATE",
            DomainError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Structured failure returned at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl From<DomainError> for ErrorBody {
    fn from(value: DomainError) -> Self {
        value.to_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(DomainError::not_found("StockItem", "x").code(), "NOT_FOUND");
        assert_eq!(DomainError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(DomainError::invalid_id("x").code(), "VALIDATION_ERROR");
        assert_eq!(DomainError::out_of_range().code(), "VALIDATION_ERROR");
        assert_eq!(DomainError::illegal_state("x").code(), "ILLEGAL_STATE");
        assert_eq!(DomainError::external("enabling", "x").code(), "EXTERNAL_SERVICE_ERROR");
    }

    #[test]
    fn body_serializes_code_and_message() {
        let body = DomainError::not_found("LoyaltyCard", "cardNumber=LOY-1").to_body();
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "NOT_FOUND");
        assert_eq!(json["message"], "LoyaltyCard not found with cardNumber=LOY-1");
    }
}
