//! Error types for the rule engine

use crate::ObjectId;
use thiserror::Error;

/// Result type for rule engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running transition rules
#[derive(Error, Debug)]
pub enum Error {
    /// Rule declared without any usable filters
    #[error("Malformed rule '{rule}': {reason}")]
    MalformedRule { rule: String, reason: String },

    /// A pose required by a transition could not be derived
    #[error("Degenerate geometry in rule '{rule}' for object {object}: {reason}")]
    DegenerateGeometry {
        rule: String,
        object: ObjectId,
        reason: String,
    },

    /// Two rules in one engine share a name
    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    /// Object handle does not refer to a live object
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Spawn request is missing a field the registry needs
    #[error("Spawn request is missing {0}")]
    MissingAttribute(&'static str),

    /// Transaction was already applied to the world
    #[error("Transaction already committed")]
    AlreadyCommitted,

    /// Rule set configuration could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// Rule set configuration could not be written
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] ron::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(
        rule: impl Into<String>,
        object: ObjectId,
        reason: impl Into<String>,
    ) -> Self {
        Error::DegenerateGeometry {
            rule: rule.into(),
            object,
            reason: reason.into(),
        }
    }
}
