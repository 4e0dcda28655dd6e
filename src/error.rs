//! Error types for seqtensor.

use thiserror::Error;

/// seqtensor error types.
#[derive(Error, Debug)]
pub enum SeqTensorError {
    /// Declared column type is not one of continuous, count, categorical, ordinal
    #[error("Unsupported column type: {0}")]
    UnsupportedColumnType(String),

    /// Value has no assigned dimension in a categorical/ordinal layout
    #[error("Unknown category {value} in column {column}")]
    UnknownCategory { column: usize, value: String },

    /// Tensor does not have the shape the layout requires
    #[error("Malformed tensor shape: {0}")]
    MalformedTensorShape(String),

    /// Number of columns does not match the layout or the declared types
    #[error("Column count mismatch: expected {expected}, got {got}")]
    ColumnCountMismatch { expected: usize, got: usize },

    /// Columns of one sequence have different lengths
    #[error("Ragged sequence: column {column} has {got} steps, expected {expected}")]
    RaggedSequence {
        column: usize,
        expected: usize,
        got: usize,
    },

    /// Sequence has more steps than the tensor can hold
    #[error("Sequence too long: {length} steps exceeds maximum of {max}")]
    SequenceTooLong { length: usize, max: usize },

    /// Column has no observed values to fit statistics from
    #[error("Column {0} has no observed values")]
    EmptyColumn(usize),

    /// Infinite value in a numeric column
    #[error("Non-finite value {value} in column {column}")]
    NonFiniteValue { column: usize, value: f64 },

    /// String value in a numeric column
    #[error("Non-numeric value {value} in numeric column {column}")]
    NonNumericValue { column: usize, value: String },

    /// Empty input where non-empty was required
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Context values differ between rows of the same entity
    #[error("Context column {column} is not constant within entity {entity}")]
    InconsistentContext { entity: String, column: usize },

    /// Column index does not exist in the input rows
    #[error("Column index {index} out of range for rows of width {width}")]
    ColumnOutOfRange { index: usize, width: usize },

    /// Persisted layout violates the index assignment invariant
    #[error("Malformed layout: {0}")]
    MalformedLayout(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while saving or loading a codec
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for seqtensor operations.
pub type Result<T> = std::result::Result<T, SeqTensorError>;
