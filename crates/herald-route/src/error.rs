//! Error types for the herald-route crate.

use thiserror::Error;

/// Errors that can occur while normalizing and routing a payload.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No registered parser produced a message for the payload.
    #[error("unrecognized format")]
    UnrecognizedFormat,

    /// A parser decoded the payload but could not work with its shape.
    #[error("{parser} parse failed: {reason}")]
    UnexpectedShape {
        /// The parser that rejected the payload.
        parser: String,
        /// What was wrong with the payload.
        reason: String,
    },

    /// Group with the given identifier was not found.
    #[error("group not found: {identifier}")]
    GroupNotFound {
        /// The machine identifier that was looked up.
        identifier: String,
    },

    /// The group exists but is switched off.
    #[error("group is inactive: {identifier}")]
    GroupInactive {
        /// The machine identifier of the inactive group.
        identifier: String,
    },

    /// Invalid template definition.
    #[error("invalid template: {reason}")]
    InvalidTemplate {
        /// The reason the template is invalid.
        reason: String,
    },

    /// Invalid rule definition.
    #[error("invalid rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouteError {
    /// Shorthand for [`RouteError::UnexpectedShape`].
    pub fn unexpected_shape(parser: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            parser: parser.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, RouteError>;
