//! The error taxonomy shared by every fallible operation in the crate.

/// Everything that can go wrong while building, converting, resizing,
/// loading or saving an image.
///
/// Every fallible function in this crate returns `Result<_, Error>`; nothing
/// is retried internally and resource releases on error paths are as
/// reliable as on success paths (buffers are returned to the pool by their
/// `Drop` implementation regardless of which path is taken).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An out-of-range index/row/channel, a non-positive dimension, a
    /// threshold outside `[0, 1]`, or a quality outside `[1, 100]`.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human readable description of the violated precondition.
        message: String,
    },
    /// A construction slice's length did not equal `width * height * channels`.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// The length the slice was required to have.
        expected: usize,
        /// The length the slice actually had.
        actual: usize,
    },
    /// An unknown `(layout, element)` tuple, an unrecognised encoder type
    /// tag, or a save attempted from a source format with no mapping.
    #[error("unsupported format: {message}")]
    UnsupportedFormat {
        /// Human readable description of the unsupported combination.
        message: String,
    },
    /// An empty or too-short header, no codec matched, or a codec reported
    /// corrupt data.
    #[error("invalid data: {message}")]
    InvalidData {
        /// Human readable description of the malformed data.
        message: String,
    },
    /// The underlying stream failed to read or write.
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),
    /// The operation was attempted on an image that was already released.
    #[error("operation attempted after release")]
    Disposed,
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
