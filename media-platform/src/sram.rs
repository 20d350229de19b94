//! 23K256 SPI SRAM.
//!
//! 32 KiB of volatile memory in byte mode: every byte is its own
//! transaction of instruction, 16-bit address and data, bracketed by
//! chip-select.

use core::fmt::{self, Debug};

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use media_adapters::{MediaError, SharedBuffer, StorageMedia};

/// Capacity in bytes.
pub const SRAM_SIZE: usize = 32 * 1024;

/// Read data from memory.
pub const READ: u8 = 0x03;
/// Write data to memory.
pub const WRITE: u8 = 0x02;

/// Bus errors from [`Sram23k256`].
#[derive(Debug)]
pub enum SramError<S, P> {
    /// The SPI transfer failed.
    Spi(S),
    /// Chip-select could not be driven.
    ChipSelect(P),
}

impl<S: Debug, P: Debug> fmt::Display for SramError<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {:?}", e),
            Self::ChipSelect(e) => write!(f, "Chip-select error: {:?}", e),
        }
    }
}

impl<S: Debug, P: Debug> core::error::Error for SramError<S, P> {}

type Error<SPI, CS> = MediaError<
    SramError<
        <SPI as embedded_hal::spi::ErrorType>::Error,
        <CS as embedded_hal::digital::ErrorType>::Error,
    >,
>;

/// A 23K256 SRAM.
#[derive(Debug)]
pub struct Sram23k256<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI: SpiBus<u8>, CS: OutputPin> Sram23k256<SPI, CS> {
    /// SRAM on `spi` selected by `cs`.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Give back the bus and the chip-select pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Write one byte.
    pub fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Error<SPI, CS>> {
        let [hi, lo] = address.to_be_bytes();
        let mut frame = [WRITE, hi, lo, value];
        self.transfer(&mut frame)
    }

    /// Read one byte.
    pub fn read_byte(&mut self, address: u16) -> Result<u8, Error<SPI, CS>> {
        let [hi, lo] = address.to_be_bytes();
        let mut frame = [READ, hi, lo, 0x00];
        self.transfer(&mut frame)?;
        Ok(frame[3])
    }

    fn transfer(&mut self, frame: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        self.cs
            .set_low()
            .map_err(|e| MediaError::Device(SramError::ChipSelect(e)))?;
        let result = self
            .spi
            .transfer_in_place(frame)
            .and_then(|()| self.spi.flush())
            .map_err(|e| MediaError::Device(SramError::Spi(e)));
        self.cs
            .set_high()
            .map_err(|e| MediaError::Device(SramError::ChipSelect(e)))?;
        result
    }

    fn check_range(offset: u64, len: usize) -> Result<u16, Error<SPI, CS>> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= SRAM_SIZE as u64 => Ok(offset as u16),
            _ => Err(MediaError::OutOfBounds {
                offset,
                len,
                capacity: SRAM_SIZE as u64,
            }),
        }
    }
}

impl<SPI: SpiBus<u8>, CS: OutputPin> StorageMedia for Sram23k256<SPI, CS> {
    type Error = Error<SPI, CS>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        let start = Self::check_range(offset, buffer.len())?;
        for (i, value) in buffer.iter().enumerate() {
            self.write_byte(start + i as u16, value)?;
        }
        Ok(())
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        let start = Self::check_range(offset, buffer.len())?;
        for i in 0..buffer.len() {
            buffer.set(i, self.read_byte(start + i as u16)?);
        }
        Ok(())
    }
}
