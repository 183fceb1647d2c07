//! Common error types for Contrail

use thiserror::Error;

/// Common result type for Contrail operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the store and the tube engine.
///
/// None of these are recovered from internally: silent coercion or
/// fallback values would corrupt downstream statistics, so every failure
/// is surfaced to the immediate caller with enough context to diagnose.
#[derive(Error, Debug)]
pub enum Error {
    /// The container resource could not be opened or created
    #[error("store unavailable at '{location}': {reason}")]
    StoreUnavailable { location: String, reason: String },

    /// Lookup miss on a signal id
    #[error("signal not found: '{0}'")]
    SignalNotFound(String),

    /// The table's variable set is incompatible with the store's declared schema
    #[error("schema rejected for signal '{id}': store declares {expected:?}, table has {actual:?}")]
    SchemaRejected {
        id: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A required variable is absent from a signal or score series
    #[error("variable '{variable}' missing from {context}")]
    VariableMissing { context: String, variable: String },

    /// Tube fitting was asked to run over an empty reference population
    #[error("cannot fit a confidence tube from an empty reference population")]
    InsufficientReferenceSignals,

    /// A table violates the structural invariants (sorted positions,
    /// equal column lengths, at least one row)
    #[error("invalid signal table: {0}")]
    InvalidTable(String),

    /// A fit or score parameter is outside its documented range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (wraps serde_json::Error)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
