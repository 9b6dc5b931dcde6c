//! Error types for bit array operations

/// Errors that can occur during bit array operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitArrayError {
    /// Capacity must be a positive number of bits
    InvalidCapacity,
    /// Backing file path is empty or names a directory
    InvalidPath,
    /// Bucket geometry cannot be laid out in whole words
    InvalidGeometry,
    /// Configuration document could not be interpreted
    InvalidConfig,
    /// Bit index beyond the configured capacity
    IndexOutOfBounds { index: usize, bit_size: usize },
    /// Merge operand or input bytes have the wrong length
    LengthMismatch { expected: usize, actual: usize },
    /// Operation is not supported by this backend
    Unsupported(&'static str),
    /// The array was closed and no longer owns its storage
    Closed,
    /// Underlying read, write, seek or map failure
    #[cfg(feature = "std")]
    Io {
        context: &'static str,
        kind: std::io::ErrorKind,
    },
}

/// Broad classification of [`BitArrayError`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller passed an unusable argument
    Argument,
    /// Index outside `[0, bit_size)`
    Bounds,
    /// Storage-level failure
    Io,
    /// Backend gap
    Unsupported,
    /// Use of an instance in the wrong lifecycle state
    State,
}

impl BitArrayError {
    /// Classify this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            BitArrayError::InvalidCapacity
            | BitArrayError::InvalidPath
            | BitArrayError::InvalidGeometry
            | BitArrayError::InvalidConfig
            | BitArrayError::LengthMismatch { .. } => ErrorCategory::Argument,
            BitArrayError::IndexOutOfBounds { .. } => ErrorCategory::Bounds,
            BitArrayError::Unsupported(_) => ErrorCategory::Unsupported,
            BitArrayError::Closed => ErrorCategory::State,
            #[cfg(feature = "std")]
            BitArrayError::Io { .. } => ErrorCategory::Io,
        }
    }

    /// Wrap an I/O error with a short description of the failed step
    #[cfg(feature = "std")]
    pub fn io(context: &'static str, err: &std::io::Error) -> Self {
        BitArrayError::Io {
            context,
            kind: err.kind(),
        }
    }
}

impl core::fmt::Display for BitArrayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BitArrayError::InvalidCapacity => {
                write!(f, "Capacity must be a positive number of bits")
            }
            BitArrayError::InvalidPath => write!(f, "Backing path is empty or not a file"),
            BitArrayError::InvalidGeometry => {
                write!(f, "Bits per bucket must be a positive multiple of 64")
            }
            BitArrayError::InvalidConfig => write!(f, "Invalid bit array configuration"),
            BitArrayError::IndexOutOfBounds { index, bit_size } => {
                write!(f, "Bit index {index} out of bounds for {bit_size} bits")
            }
            BitArrayError::LengthMismatch { expected, actual } => {
                write!(f, "Expected {expected} bytes, got {actual}")
            }
            BitArrayError::Unsupported(what) => write!(f, "Unsupported operation: {what}"),
            BitArrayError::Closed => write!(f, "Bit array is closed"),
            #[cfg(feature = "std")]
            BitArrayError::Io { context, kind } => write!(f, "{context}: {kind}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BitArrayError {}

/// Result type for bit array operations
pub type Result<T> = core::result::Result<T, BitArrayError>;
