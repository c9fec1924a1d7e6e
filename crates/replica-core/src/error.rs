//! Clone and object model error types

use thiserror::Error;

/// Errors raised by the object model and the clone engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloneError {
    /// A collaborator-facing entry point received a null root
    #[error("NullArgument: `{0}` must not be null")]
    NullArgument(String),

    /// Field discovery or duplication hit a type shape the engine cannot handle
    #[error("IntrospectionFailure: {type_name}: {reason}")]
    IntrospectionFailure {
        /// Name (or id) of the offending type
        type_name: String,
        /// What went wrong
        reason: String,
    },

    /// A type declaration was rejected by the registry
    #[error("InvalidDefinition: {0}")]
    InvalidDefinition(String),

    /// Named field lookup failed
    #[error("FieldNotFound: {type_name} has no field `{field}`")]
    FieldNotFound {
        /// Type searched
        type_name: String,
        /// Requested field name
        field: String,
    },

    /// A value does not fit the slot or Rust type it was meant for
    #[error("TypeMismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual value kind
        found: String,
    },
}

impl CloneError {
    /// Create a null argument error
    pub fn null_argument(name: impl Into<String>) -> Self {
        Self::NullArgument(name.into())
    }

    /// Create an introspection failure
    pub fn introspection(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IntrospectionFailure {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid definition error
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    /// Create a field lookup error
    pub fn field_not_found(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type for clone and object model operations
pub type CloneResult<T> = std::result::Result<T, CloneError>;
