//! R1 responses and the OCR register.

use bitflags::bitflags;

bitflags! {
    /// The R1 status byte returned after every command.
    ///
    /// An empty set is the only fully successful response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct R1: u8 {
        /// The card is in the idle state running its initialisation.
        const IDLE = 0x01;
        /// An erase sequence was cleared before executing.
        const ERASE_RESET = 0x02;
        /// The command index is not supported.
        const ILLEGAL_COMMAND = 0x04;
        /// The command CRC check failed.
        const CRC_ERROR = 0x08;
        /// Error in the sequence of erase commands.
        const ERASE_SEQUENCE_ERROR = 0x10;
        /// Misaligned address.
        const ADDRESS_ERROR = 0x20;
        /// The argument was outside the allowed range.
        const PARAMETER_ERROR = 0x40;
    }
}

impl R1 {
    /// Decode a response byte. Bit 7 is always zero on the wire.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }

    /// `true` if no flag is set.
    #[inline]
    pub const fn is_ready(&self) -> bool {
        self.is_empty()
    }

    /// `true` if any error flag is set (idle and erase reset are states,
    /// not errors).
    #[inline]
    pub const fn has_error(&self) -> bool {
        self.intersects(
            Self::ILLEGAL_COMMAND
                .union(Self::CRC_ERROR)
                .union(Self::ERASE_SEQUENCE_ERROR)
                .union(Self::ADDRESS_ERROR)
                .union(Self::PARAMETER_ERROR),
        )
    }
}

/// The operation conditions register, read with CMD58.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ocr(u32);

impl Ocr {
    const POWER_UP_DONE: u32 = 1 << 31;
    const CARD_CAPACITY_STATUS: u32 = 1 << 30;

    /// Register from the four bytes following the R1 response.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    /// The raw register value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// `true` once the card finished its power-up routine.
    #[inline]
    pub const fn is_powered_up(&self) -> bool {
        self.0 & Self::POWER_UP_DONE != 0
    }

    /// `true` for SDHC/SDXC cards, which are block addressed.
    #[inline]
    pub const fn is_high_capacity(&self) -> bool {
        self.0 & Self::CARD_CAPACITY_STATUS != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r1_decoding() {
        assert!(R1::from_byte(0x00).is_ready());
        assert!(!R1::from_byte(0x01).is_ready());
        assert!(!R1::from_byte(0x01).has_error());
        assert!(R1::from_byte(0x05).contains(R1::IDLE | R1::ILLEGAL_COMMAND));
        assert!(R1::from_byte(0x05).has_error());
        assert!(R1::from_byte(0x40).contains(R1::PARAMETER_ERROR));
        assert_eq!(R1::from_byte(0x80), R1::empty());
    }

    #[test]
    fn test_ocr_capacity_bit() {
        assert!(Ocr::from_bytes([0xC0, 0xFF, 0x80, 0x00]).is_high_capacity());
        assert!(!Ocr::from_bytes([0x80, 0xFF, 0x80, 0x00]).is_high_capacity());
        assert!(Ocr::from_bytes([0x80, 0, 0, 0]).is_powered_up());
    }
}
