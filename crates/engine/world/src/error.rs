//! Error types for scene construction

use logic::ObjectId;
use thiserror::Error;

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or editing a scene
#[derive(Error, Debug)]
pub enum Error {
    /// Object names must be unique within a scene
    #[error("Duplicate object name: {0}")]
    DuplicateName(String),

    /// A contact or lookup named an object that is not in the scene
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Object has no contact region to touch with
    #[error("Object {0} has no contact region")]
    NoContactRegion(ObjectId),

    /// Error raised by the rule engine
    #[error("Rule engine error: {0}")]
    Logic(#[from] logic::Error),

    /// Scene configuration could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
