//! Result and error types for the core library

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-field validation messages keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field, replacing any earlier one
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidFields(FieldErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a sync error
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Error raised when an in-memory store lock was poisoned by a panic
    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Other(format!("{} lock poisoned", what))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(Error::InvalidFields(fields)) => {
                let context = fields
                    .iter()
                    .map(|(field, message)| (field.to_string(), serde_json::json!(message)))
                    .collect();
                Self {
                    success: false,
                    data: None,
                    error: Some("Please correct the highlighted fields".to_string()),
                    context: Some(context),
                }
            }
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::InvalidCredentials);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Invalid email or password");
    }

    #[test]
    fn test_field_errors_surface_as_context() {
        let mut fields = FieldErrors::new();
        fields.insert("title", "Title is required");
        fields.insert("amount", "Amount is required");

        let err: Result<()> = Err(Error::InvalidFields(fields));
        let result: OperationResult<()> = err.into();
        let context = result.context.unwrap();
        assert_eq!(context["title"], "Title is required");
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_field_errors_display_is_sorted() {
        let mut fields = FieldErrors::new();
        fields.insert("title", "Title is required");
        fields.insert("amount", "Amount is required");
        assert_eq!(
            fields.to_string(),
            "amount: Amount is required; title: Title is required"
        );
    }
}
