//! Buffer-level errors.

use core::fmt;

/// Errors raised while creating buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    /// The backing allocator has no gap large enough for the request.
    OutOfMemory {
        /// Bytes that were requested.
        requested: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "No free gap of {} bytes in allocator region", requested)
            }
        }
    }
}

impl core::error::Error for BufferError {}
