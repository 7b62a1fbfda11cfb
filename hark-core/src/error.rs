//! Error taxonomy shared by every hark crate.
//!
//! Library crates return [`HarkError`] so that the procedure engine can match on
//! the handful of kinds it knows how to recover from and propagate the rest.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarkError {
    /// A record with the same key field values already exists.
    #[error("A {model} with the same field values already exists: {fields}")]
    DuplicateModel { model: &'static str, fields: String },

    #[error("Invalid query constraint: {0}")]
    InvalidQueryConstraint(String),

    #[error("{model} invalid: {reason}")]
    ModelInvalid { model: &'static str, reason: String },

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Unknown guest: {0}")]
    UnknownGuest(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unrecognised machine state: {0}")]
    UnrecognisedMachineState(String),

    #[error("Machine status is '{current}', expected one of: {allowed}")]
    InvalidStatus { current: String, allowed: String },

    #[error("Command '{command}' had exit_status {exit_status} and stderr: '{stderr}'")]
    CommandFailed {
        command: String,
        exit_status: i32,
        stderr: String,
    },

    #[error("Machine not found: {0}")]
    MachineNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Invalid image path: {0}")]
    InvalidImagePath(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad hark environment: {0}")]
    BadEnvironment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_yaml_ng::Error> for HarkError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        HarkError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarkError>;
