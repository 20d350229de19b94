//! SD card driver errors.

use core::fmt::{self, Debug};

use media_adapters::MediaError;

use super::response::R1;
use super::state::CardState;

/// Errors from [`SdCard`](super::SdCard).
///
/// `S` is the SPI bus error, `P` the chip-select pin error.
#[derive(Debug)]
#[non_exhaustive]
pub enum SdCardError<S, P> {
    /// The SPI transfer failed.
    Spi(S),
    /// Chip-select could not be driven.
    ChipSelect(P),
    /// No R1 response within the poll limit.
    ResponseTimeout {
        /// Index of the unanswered command.
        command: u8,
    },
    /// The card answered with error flags, or never became ready.
    Rejected {
        /// Index of the rejected command.
        command: u8,
        /// The last response.
        response: R1,
    },
    /// No data start token within the poll limit.
    DataTokenTimeout,
    /// The card sent a data error token instead of data.
    DataError(u8),
    /// No data response token within the poll limit.
    DataResponseTimeout,
    /// The card refused a data block (CRC or write error).
    WriteRejected(u8),
    /// The card stayed busy past the poll limit.
    BusyTimeout,
    /// A block buffer did not match the block size; nothing was sent.
    BlockSizeMismatch {
        /// The negotiated block size.
        expected: usize,
        /// The buffer length.
        actual: usize,
    },
    /// Block size of zero or too large for the card.
    InvalidBlockSize(usize),
    /// Block I/O before initialisation completed.
    NotInitialized,
    /// Initialisation gave up in the given phase.
    InitializationFailed {
        /// The phase whose retry budget ran out.
        stage: CardState,
    },
    /// The block number does not fit the command argument.
    AddressOverflow,
}

impl<S, P> SdCardError<S, P> {
    /// `true` for failures of the bus or pin themselves.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Spi(_) | Self::ChipSelect(_))
    }

    pub(crate) fn from_media(err: MediaError<Self>) -> Self {
        match err {
            MediaError::Device(e) => e,
            MediaError::BlockSizeMismatch { expected, actual } => {
                Self::BlockSizeMismatch { expected, actual }
            }
            MediaError::InvalidBlockSize(size) => Self::InvalidBlockSize(size),
            _ => Self::AddressOverflow,
        }
    }
}

impl<S: Debug, P: Debug> fmt::Display for SdCardError<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {:?}", e),
            Self::ChipSelect(e) => write!(f, "Chip-select error: {:?}", e),
            Self::ResponseTimeout { command } => {
                write!(f, "No response to CMD{}", command)
            }
            Self::Rejected { command, response } => {
                write!(f, "CMD{} rejected with R1 {:#04x}", command, response.bits())
            }
            Self::DataTokenTimeout => write!(f, "Timed out waiting for data token"),
            Self::DataError(token) => write!(f, "Data error token {:#04x}", token),
            Self::DataResponseTimeout => write!(f, "Timed out waiting for data response"),
            Self::WriteRejected(token) => write!(f, "Write rejected with {:#04x}", token),
            Self::BusyTimeout => write!(f, "Card stayed busy"),
            Self::BlockSizeMismatch { expected, actual } => write!(
                f,
                "Buffer of {} bytes does not match block size {}",
                actual, expected
            ),
            Self::InvalidBlockSize(size) => write!(f, "Invalid block size: {}", size),
            Self::NotInitialized => write!(f, "Card is not initialized"),
            Self::InitializationFailed { stage } => {
                write!(f, "Initialization failed during {}", stage)
            }
            Self::AddressOverflow => write!(f, "Block address out of range"),
        }
    }
}

impl<S: Debug, P: Debug> core::error::Error for SdCardError<S, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    type Error = SdCardError<Infallible, Infallible>;

    #[test]
    fn test_display() {
        let error = Error::Rejected {
            command: 17,
            response: R1::ADDRESS_ERROR,
        };
        assert_eq!(format!("{}", error), "CMD17 rejected with R1 0x20");

        let error = Error::InitializationFailed {
            stage: CardState::PowerUpPolling,
        };
        assert!(format!("{}", error).contains("power-up polling"));
    }

    #[test]
    fn test_from_media() {
        assert!(matches!(
            Error::from_media(MediaError::Device(Error::BusyTimeout)),
            Error::BusyTimeout
        ));
        assert!(matches!(
            Error::from_media(MediaError::AddressOverflow),
            Error::AddressOverflow
        ));
    }
}
