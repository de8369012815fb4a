use std::fmt;

/// Errors returned by [`crate::update_checksums`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumError {
    /// The buffer is shorter than the `0x101000`-byte window the kernel
    /// reads over.
    BufferTooSmall,
}

impl fmt::Display for ChecksumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumError::BufferTooSmall => {
                write!(f, "buffer too small for checksum window (need 0x101000 bytes)")
            }
        }
    }
}

impl std::error::Error for ChecksumError {}

/// Errors returned by [`crate::extend`] and [`crate::pack`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelocError {
    /// More than the soft ceiling of references were discovered; the table
    /// refused to grow further.
    CapacityExceeded,
    /// The output buffer is not large enough to hold the relocated image.
    OutputTooSmall,
}

impl fmt::Display for RelocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocError::CapacityExceeded => write!(f, "reference table capacity exceeded"),
            RelocError::OutputTooSmall => write!(f, "output buffer too small for relocated image"),
        }
    }
}

impl std::error::Error for RelocError {}
