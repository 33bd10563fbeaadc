//! Business logic over the user, client and case stores.
//!
//! Handlers resolve the caller into an [`Identity`] and hand it to the
//! services, which own every authorization and validation rule.

pub mod auth;
pub mod clients;
pub mod validation;

pub use auth::{hash_password, require_role, verify_password, AuthService};
pub use clients::ClientService;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::UserRole;

/// Per-field validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

/// Errors that can occur in service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyRegistered(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Field names carried by a validation error
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            ServiceError::Validation(errors) => errors.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        ServiceError::Internal(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for ServiceError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ServiceError::Internal(format!("Failed to hash password: {}", err))
    }
}

/// Collects validation messages per field before any write happens.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: FieldErrors,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a validator result under `field`
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("age", "must be at least 18");
        errors.add("housing", "must be between 1 and 10");
        errors.add("age", "second message");

        let err = errors.finish().unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["age", "housing"]);
        assert_eq!(err.to_string(), "Validation failed for age, housing");
        match err {
            ServiceError::Validation(map) => assert_eq!(map["age"].len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_builder_passes() {
        let mut errors = ValidationErrors::new();
        errors.check("age", Ok(()));
        assert!(errors.is_empty());
        assert!(errors.finish().is_ok());
    }
}
