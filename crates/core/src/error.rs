//! Error types for stratified models
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall in two groups:
//! - Data errors: a value or document does not fit the schema. These are
//!   returned to the caller and, during loads, collected rather than aborting.
//! - Wiring errors: a schema or capability composition is wrong. These are
//!   returned from the registration or construction call that caused them.

use crate::limits::LimitError;
use std::io;
use thiserror::Error;

/// Result type alias for stratified operations
pub type Result<T> = std::result::Result<T, TraitError>;

/// Error types for trait schemas, strata and models
#[derive(Debug, Error)]
pub enum TraitError {
    /// A read or write referenced a trait the model's schema does not define
    #[error("Unknown trait '{trait_id}' on model type '{model_type}'")]
    UnknownTrait {
        /// Model type (schema class) that was searched
        model_type: String,
        /// Requested trait id
        trait_id: String,
    },

    /// A value does not have the shape its trait definition requires
    #[error("Schema violation at '{trait_id}': expected {expected}, got {actual}")]
    SchemaViolation {
        /// Trait id, or a path such as `styles[1].color` for nested values
        trait_id: String,
        /// Expected shape
        expected: String,
        /// Actual runtime type (or offending value description)
        actual: String,
    },

    /// Strict load encountered a JSON key with no trait definition
    #[error("Unknown property '{property}' for model type '{model_type}'")]
    UnknownProperty {
        /// Model type (schema class) being loaded
        model_type: String,
        /// Offending JSON key (or nested path)
        property: String,
    },

    /// A capability's required traits are absent from the model's schema
    #[error("Capability {capability} cannot be composed onto '{model_type}': missing {}", missing.join(", "))]
    MixinConstraintUnmet {
        /// Capability name
        capability: &'static str,
        /// Model type being constructed
        model_type: String,
        /// Missing or mistyped trait requirements
        missing: Vec<String>,
    },

    /// An asynchronous capability result arrived after it was cancelled
    #[error("Stale operation: {operation} was superseded")]
    StaleOperation {
        /// Operation description
        operation: String,
    },

    /// A trait was registered on a class whose schema is already frozen
    #[error("Schema for class '{class}' is frozen; cannot register trait '{trait_id}'")]
    SchemaFrozen {
        /// Class name
        class: String,
        /// Trait id that was being registered
        trait_id: String,
    },

    /// A class name is not declared in the schema registry
    #[error("Unknown trait class: {0}")]
    UnknownClass(String),

    /// A `type` discriminator has no registered constructor
    #[error("Unknown model type: {0}")]
    UnknownModelType(String),

    /// A model id is already present in the owning catalog
    #[error("Duplicate model id: {0}")]
    DuplicateModel(String),

    /// A model id is not present in the owning catalog
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Value exceeded a size limit
    #[error("Limit exceeded: {0}")]
    Limit(#[from] LimitError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TraitError {
    /// Create a schema violation error
    pub fn violation(
        trait_id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        TraitError::SchemaViolation {
            trait_id: trait_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unknown trait error
    pub fn unknown_trait(model_type: impl Into<String>, trait_id: impl Into<String>) -> Self {
        TraitError::UnknownTrait {
            model_type: model_type.into(),
            trait_id: trait_id.into(),
        }
    }

    /// Create a stale operation error
    pub fn stale(operation: impl Into<String>) -> Self {
        TraitError::StaleOperation {
            operation: operation.into(),
        }
    }

    /// True for errors caused by bad data rather than bad wiring
    ///
    /// Data errors are collected during loads; everything else aborts.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            TraitError::SchemaViolation { .. }
                | TraitError::UnknownProperty { .. }
                | TraitError::UnknownTrait { .. }
                | TraitError::UnknownModelType(_)
                | TraitError::Limit(_)
        )
    }

    /// True for a cancelled operation whose result must be discarded
    pub fn is_stale(&self) -> bool {
        matches!(self, TraitError::StaleOperation { .. })
    }
}

impl From<serde_json::Error> for TraitError {
    fn from(e: serde_json::Error) -> Self {
        TraitError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema_violation() {
        let err = TraitError::violation("opacity", "number", "string");
        let msg = err.to_string();
        assert!(msg.contains("opacity"));
        assert!(msg.contains("expected number"));
        assert!(msg.contains("got string"));
    }

    #[test]
    fn test_error_display_unknown_trait() {
        let err = TraitError::unknown_trait("wms", "colour");
        let msg = err.to_string();
        assert!(msg.contains("Unknown trait 'colour'"));
        assert!(msg.contains("wms"));
    }

    #[test]
    fn test_error_display_mixin_constraint() {
        let err = TraitError::MixinConstraintUnmet {
            capability: "Mappable",
            model_type: "plain".to_string(),
            missing: vec!["show".to_string(), "opacity".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Mappable"));
        assert!(msg.contains("show, opacity"));
    }

    #[test]
    fn test_error_from_limit() {
        let err: TraitError = LimitError::NestingTooDeep { depth: 9, max: 8 }.into();
        assert!(matches!(err, TraitError::Limit(_)));
        assert!(err.is_data_error());
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: TraitError = parse.unwrap_err().into();
        assert!(matches!(err, TraitError::Serialization(_)));
    }

    #[test]
    fn test_data_errors_vs_wiring_errors() {
        assert!(TraitError::violation("a", "b", "c").is_data_error());
        assert!(!TraitError::SchemaFrozen {
            class: "x".to_string(),
            trait_id: "y".to_string()
        }
        .is_data_error());
        assert!(TraitError::stale("search").is_stale());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<i32> {
            Err(TraitError::InvalidOperation("test".to_string()))
        }
        assert!(returns_error().is_err());
    }
}
