//! Error type shared by every container in the crate.

use thiserror::Error;

/// Failure reported by a container operation.
///
/// Variants map onto four classes: out-of-range access, invalid arguments,
/// length overflow and allocation failure. See [`CollectionError::category`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    /// Bounds-checked index access past the live length.
    #[error("index {index} is out of range for length {len}")]
    OutOfRange {
        /// The rejected index
        index: usize,
        /// Length at the time of the access
        len: usize,
    },

    /// Checked key access for a key that is not stored.
    #[error("key is not present in the table")]
    KeyNotFound,

    /// An argument outside its documented domain.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// A requested capacity or bucket count above the representable maximum.
    #[error("requested size {requested} exceeds the maximum of {max}")]
    LengthError {
        /// The size that was asked for
        requested: usize,
        /// The largest size the allocator can hand out
        max: usize,
    },

    /// The allocator could not satisfy a request.
    #[error("allocation of {size} bytes failed")]
    AllocationFailure {
        /// Size of the failed request in bytes
        size: usize,
    },
}

impl CollectionError {
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn length_error(requested: usize, max: usize) -> Self {
        Self::LengthError { requested, max }
    }

    pub fn allocation_failure(size: usize) -> Self {
        Self::AllocationFailure { size }
    }

    /// Error class name. `KeyNotFound` belongs to the out-of-range class.
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } | Self::KeyNotFound => "out_of_range",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::LengthError { .. } => "length_error",
            Self::AllocationFailure { .. } => "allocation_failure",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CollectionError>;
