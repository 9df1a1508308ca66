//! Error types for dynorm-core.
//!
//! Compile-time problems (schema, expression, spec validation) are raised
//! before any round trip. Store errors pass through unchanged.

use dynorm_model::StoreError;

use crate::expression::ExpressionError;
use crate::schema::SchemaError;

/// Umbrella error for every public operation.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// Schema registration failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An expression could not be compiled.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Strong consistency was requested against a global secondary index.
    #[error("index '{index}' does not support strongly consistent reads")]
    IncompatibleConsistency {
        /// The global index named by the spec.
        index: String,
    },

    /// The spec names an index the schema does not declare.
    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    /// A non-nullable field was absent or null on write, or a key attribute
    /// was missing.
    #[error("missing required attribute '{0}'")]
    MissingAttribute(String),

    /// A collection was built over a schema without a discriminator field.
    #[error("schema for table '{0}' declares no discriminator field")]
    MissingDiscriminator(String),

    /// A versioned write was requested on a schema without a version field.
    #[error("schema for table '{0}' declares no version field")]
    NoVersionField(String),

    /// The stored version cannot be incremented.
    #[error("version attribute '{field}' overflows at {current}")]
    VersionOverflow {
        /// Logical name of the version field.
        field: String,
        /// The version last read.
        current: i64,
    },

    /// Parallel scan segment out of range.
    #[error("invalid scan segment {segment} of {total_segments}")]
    InvalidSegment {
        /// Requested segment.
        segment: u32,
        /// Requested segment count.
        total_segments: u32,
    },

    /// Page size must be at least one.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// The caller's decoder rejected a record.
    #[error("failed to decode record: {0}")]
    Decode(#[source] anyhow::Error),

    /// Error reported by the storage gateway.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience result type.
pub type OrmResult<T> = Result<T, OrmError>;
