//! Facade Errors
//!
//! `TigerStyle`: Explicit error types with context.
//!
//! Every surfaced error carries a descriptive message; the only error that
//! is never surfaced by default is the transient connection failure, which
//! drives the retry loop instead.

use thiserror::Error;

/// Errors from data access operations.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// No mapping table exists yet; `connect` has not completed
    #[error("not connected: connect must be called with a schema for this entity")]
    NotConnected,

    /// Entity type was never registered at connect time
    #[error("model not found: {entity_type}")]
    ModelNotFound {
        /// Entity type name that has no registered model
        entity_type: String,
    },

    /// Backend rejected the initial values for a new entity
    #[error("failed to instantiate entity: {message}")]
    Instantiation {
        /// Reason the backend rejected instantiation
        message: String,
    },

    /// Backend rejected a save/remove/query operation
    #[error("persistence failed: {message}")]
    Persistence {
        /// Reason the backend rejected the operation
        message: String,
    },

    /// Transient connection failure; drives the retry loop and is only
    /// surfaced when a bounded [`RetryPolicy`](crate::connection::RetryPolicy)
    /// runs out of attempts
    #[error("connection failed: {message}")]
    Connection {
        /// Reason the connection attempt failed
        message: String,
    },

    /// No service implementation registered under the requested key
    #[error("unknown service type: {key}")]
    UnknownService {
        /// Registry key that has no factory
        key: String,
    },
}

impl DbError {
    /// Create a model not found error.
    #[must_use]
    pub fn model_not_found(entity_type: impl Into<String>) -> Self {
        Self::ModelNotFound {
            entity_type: entity_type.into(),
        }
    }

    /// Create an instantiation error.
    #[must_use]
    pub fn instantiation(message: impl Into<String>) -> Self {
        Self::Instantiation {
            message: message.into(),
        }
    }

    /// Create a persistence error.
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an unknown service error.
    #[must_use]
    pub fn unknown_service(key: impl Into<String>) -> Self {
        Self::UnknownService { key: key.into() }
    }

    /// Check if this is a transient error (retried by the connect loop).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Result type for data access operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = DbError::model_not_found("book");
        assert!(matches!(err, DbError::ModelNotFound { entity_type } if entity_type == "book"));

        let err = DbError::instantiation("bad values");
        assert!(matches!(err, DbError::Instantiation { message } if message == "bad values"));
    }

    #[test]
    fn test_is_transient() {
        assert!(DbError::connection("refused").is_transient());

        assert!(!DbError::NotConnected.is_transient());
        assert!(!DbError::model_not_found("book").is_transient());
        assert!(!DbError::persistence("write failed").is_transient());
    }

    #[test]
    fn test_messages_are_descriptive() {
        assert_eq!(
            DbError::NotConnected.to_string(),
            "not connected: connect must be called with a schema for this entity"
        );
        assert_eq!(
            DbError::model_not_found("book").to_string(),
            "model not found: book"
        );
    }
}
