//! Errors shared by every medium built on this crate.
//!
//! Device failures arrive wrapped in [`MediaError::Device`]; the remaining
//! variants are caller mistakes detected before the device is touched.

use core::fmt;

/// Errors raised by media adapters and the block I/O engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaError<E> {
    /// The byte range does not fit inside the medium.
    OutOfBounds {
        /// First byte of the requested range.
        offset: u64,
        /// Length of the requested range.
        len: usize,
        /// Size of the medium in bytes.
        capacity: u64,
    },

    /// The byte range ends past the largest addressable block.
    AddressOverflow,

    /// A block-sized buffer had the wrong length.
    BlockSizeMismatch {
        /// The device's block size.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// A block size of zero (or otherwise unusable) was requested.
    InvalidBlockSize(usize),

    /// Error from the underlying device.
    Device(E),
}

impl<E> MediaError<E> {
    /// Convert the device error, keeping every other variant.
    pub fn map_device<F>(self, op: impl FnOnce(E) -> F) -> MediaError<F> {
        match self {
            Self::OutOfBounds {
                offset,
                len,
                capacity,
            } => MediaError::OutOfBounds {
                offset,
                len,
                capacity,
            },
            Self::AddressOverflow => MediaError::AddressOverflow,
            Self::BlockSizeMismatch { expected, actual } => {
                MediaError::BlockSizeMismatch { expected, actual }
            }
            Self::InvalidBlockSize(size) => MediaError::InvalidBlockSize(size),
            Self::Device(e) => MediaError::Device(op(e)),
        }
    }
}

impl<E: fmt::Display> fmt::Display for MediaError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                offset,
                len,
                capacity,
            } => write!(
                f,
                "Range of {} bytes at offset {} exceeds medium of {} bytes",
                len, offset, capacity
            ),
            Self::AddressOverflow => write!(f, "Byte range exceeds addressable blocks"),
            Self::BlockSizeMismatch { expected, actual } => write!(
                f,
                "Buffer of {} bytes does not match block size {}",
                actual, expected
            ),
            Self::InvalidBlockSize(size) => write!(f, "Invalid block size: {}", size),
            Self::Device(e) => write!(f, "Device error: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> core::error::Error for MediaError<E> {}
