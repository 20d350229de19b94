//! SD commands and their SPI-mode framing.
//!
//! Every command is six bytes on the wire:
//!
//! ```text
//! | 01 index(6) | argument (32, big-endian) | crc7(7) 1 |
//! ```
//!
//! Cards in SPI mode only check the CRC of CMD0 and CMD8 by default, but the
//! CRC is computed for every command anyway.

use crc::{CRC_7_MMC, CRC_16_XMODEM, Crc};

/// GO_IDLE_STATE: software reset.
pub const CMD0: u8 = 0;
/// SEND_OP_COND: legacy (MMC / version 1) initialisation.
pub const CMD1: u8 = 1;
/// SEND_IF_COND: interface condition, identifies version 2 cards.
pub const CMD8: u8 = 8;
/// SET_BLOCKLEN.
pub const CMD16: u8 = 16;
/// READ_SINGLE_BLOCK.
pub const CMD17: u8 = 17;
/// WRITE_BLOCK.
pub const CMD24: u8 = 24;
/// WRITE_MULTIPLE_BLOCK.
pub const CMD25: u8 = 25;
/// SD_SEND_OP_COND (application command, follows CMD55).
pub const ACMD41: u8 = 41;
/// APP_CMD: the next command is an application command.
pub const CMD55: u8 = 55;
/// READ_OCR.
pub const CMD58: u8 = 58;

/// CMD8 argument: 2.7-3.6 V supply and check pattern `0xAA`.
pub const IF_COND_ARGUMENT: u32 = 0x0000_01AA;
/// ACMD41 argument: host supports high capacity cards.
pub const HCS_ARGUMENT: u32 = 0x4000_0000;

/// Start token for single block reads and writes.
pub const DATA_START_BLOCK: u8 = 0xFE;
/// Start token for each block of a multiple block write.
pub const WRITE_MULTIPLE_TOKEN: u8 = 0xFC;
/// Ends a multiple block write.
pub const STOP_TRAN_TOKEN: u8 = 0xFD;
/// Data response: accepted (low five bits).
pub const DATA_RES_ACCEPTED: u8 = 0x05;
/// Mask of the meaningful data response bits.
pub const DATA_RES_MASK: u8 = 0x1F;

const COMMAND_CRC: Crc<u8> = Crc::<u8>::new(&CRC_7_MMC);
const DATA_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// A command ready to be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    index: u8,
    argument: u32,
}

impl Command {
    /// Command `index` (0-63) with `argument`.
    #[inline]
    pub const fn new(index: u8, argument: u32) -> Self {
        Self {
            index: index & 0x3F,
            argument,
        }
    }

    /// The command index.
    #[inline]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// The 32-bit argument.
    #[inline]
    pub const fn argument(&self) -> u32 {
        self.argument
    }

    /// The six bytes sent on the bus.
    ///
    /// ```
    /// use media_platform::sdspi::command::{CMD0, CMD8, Command, IF_COND_ARGUMENT};
    ///
    /// assert_eq!(Command::new(CMD0, 0).frame(), [0x40, 0, 0, 0, 0, 0x95]);
    /// assert_eq!(Command::new(CMD8, IF_COND_ARGUMENT).frame()[5], 0x87);
    /// ```
    pub fn frame(&self) -> [u8; 6] {
        let [a, b, c, d] = self.argument.to_be_bytes();
        let mut frame = [0x40 | self.index, a, b, c, d, 0];
        frame[5] = (COMMAND_CRC.checksum(&frame[..5]) << 1) | 1;
        frame
    }
}

/// CRC-16 trailing every data block.
#[inline]
pub fn data_crc(data: &[u8]) -> u16 {
    DATA_CRC.checksum(data)
}
