//! Card bring-up state and what initialisation learns about the card.

use core::fmt;

/// Progress of the initialisation sequence.
///
/// ```text
/// Uninitialized → Reset → VersionProbe → PowerUpPolling
///               → AddressingModeKnown → Ready
/// ```
///
/// Any phase that exhausts its retry budget ends in `InitFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardState {
    /// Nothing sent yet.
    Uninitialized,
    /// Clocking the card and issuing the software reset (CMD0).
    Reset,
    /// Probing the interface condition (CMD8).
    VersionProbe,
    /// Waiting for the card to leave the idle state (ACMD41 / CMD1).
    PowerUpPolling,
    /// The OCR was read; the addressing mode is known.
    AddressingModeKnown,
    /// Block length set; ready for block I/O.
    Ready,
    /// A phase ran out of retries.
    InitFailed,
}

impl CardState {
    /// `true` only in [`CardState::Ready`].
    #[inline]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Reset => "reset",
            Self::VersionProbe => "version probe",
            Self::PowerUpPolling => "power-up polling",
            Self::AddressingModeKnown => "addressing mode known",
            Self::Ready => "ready",
            Self::InitFailed => "init failed",
        };
        f.write_str(name)
    }
}

/// Physical layer version reported by CMD8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardVersion {
    /// Version 1.x (or MMC): CMD8 rejected.
    V1,
    /// Version 2.00 or later: CMD8 echoed the check pattern.
    V2,
    /// CMD8 was accepted but never echoed the pattern correctly.
    Unknown,
}

/// How a card interprets the address argument of data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Addressing {
    /// Standard capacity: addresses are byte offsets.
    Byte,
    /// High capacity: addresses are block numbers.
    Block,
}

impl Addressing {
    /// Factor turning a block number into a command argument.
    #[inline]
    pub const fn multiplier(self, block_size: usize) -> u32 {
        match self {
            Self::Byte => block_size as u32,
            Self::Block => 1,
        }
    }
}
