//! Error types for the leave engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the work-pattern calendar, the balance ledger, the
//! expiry engine and the contract index can report.

use thiserror::Error;

/// The main error type for the leave engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use leave_engine::error::EngineError;
///
/// let error = EngineError::Validation {
///     field: "label".to_string(),
///     message: "must not be empty".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid value for 'label': must not be empty");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Input was rejected. The offending field is always named.
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        /// The field that failed validation (e.g. `weeks[0].days[2].leave_days`).
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record (e.g. "Work pattern", "Balance change").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Stored ledger data is inconsistent and cannot be processed safely.
    #[error("Data integrity error: {message}")]
    DataIntegrity {
        /// A description of the inconsistency.
        message: String,
    },

    /// The persistence collaborator failed.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the storage failure.
        message: String,
    },
}

impl EngineError {
    /// Builds a [`EngineError::Validation`] for the given field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Builds a [`EngineError::NotFound`] for the given entity and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Builds a [`EngineError::DataIntegrity`] with the given message.
    pub fn integrity(message: impl Into<String>) -> Self {
        EngineError::DataIntegrity {
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/engine.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/engine.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_validation_displays_field_and_message() {
        let error = EngineError::validation("weeks[0].days", "expected 7 days, found 6");
        assert_eq!(
            error.to_string(),
            "Invalid value for 'weeks[0].days': expected 7 days, found 6"
        );
    }

    #[test]
    fn test_not_found_displays_entity_and_id() {
        let error = EngineError::not_found("Work pattern", 42);
        assert_eq!(error.to_string(), "Work pattern not found: 42");
    }

    #[test]
    fn test_data_integrity_displays_message() {
        let error = EngineError::integrity("brought forward entry 7 has a negative amount");
        assert_eq!(
            error.to_string(),
            "Data integrity error: brought forward entry 7 has a negative amount"
        );
    }

    #[test]
    fn test_storage_displays_message() {
        let error = EngineError::Storage {
            message: "lock poisoned".to_string(),
        };
        assert_eq!(error.to_string(), "Storage error: lock poisoned");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::not_found("Balance change", 1))
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(matches!(
            propagates_error(),
            Err(EngineError::NotFound { .. })
        ));
    }
}
