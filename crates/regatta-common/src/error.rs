use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the interchange layer.
///
/// Every conversion is all-or-nothing: an error means no caller-visible state
/// was mutated and no partial table or column list was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid metadata shape: {0}")]
    InvalidMetadataShape(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Nulls not allowed: {0}")]
    NullsNotAllowed(String),

    #[error("Invalid tensor shape: {0}")]
    InvalidTensorShape(String),

    #[error("Invalid capsule: {0}")]
    InvalidCapsule(String),

    #[error("Capsule already consumed")]
    CapsuleAlreadyConsumed,

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Index {index} out of bounds (len: {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_metadata_shape(msg: impl Into<String>) -> Self {
        Error::InvalidMetadataShape(msg.into())
    }

    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Error::UnsupportedType(msg.into())
    }

    pub fn nulls_not_allowed(msg: impl Into<String>) -> Self {
        Error::NullsNotAllowed(msg.into())
    }

    pub fn invalid_tensor_shape(msg: impl Into<String>) -> Self {
        Error::InvalidTensorShape(msg.into())
    }

    pub fn invalid_capsule(msg: impl Into<String>) -> Self {
        Error::InvalidCapsule(msg.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Error::SchemaMismatch(msg.into())
    }

    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Error::OutOfBounds { index, len }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
