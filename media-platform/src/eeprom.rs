//! CAT24C64 I2C EEPROM.
//!
//! An 8 KiB EEPROM with 32-byte write pages and a 13-bit memory address.
//! [`Cat24c64`] drives one chip; [`Cat24c64Array`] presents up to eight
//! chips sharing one bus as a single contiguous medium.

use alloc::vec::Vec;
use core::cell::Cell;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use media_adapters::media_buffer::{copy_from_cells, copy_into_cells};
use media_adapters::{MediaError, SharedBuffer, StorageMedia};

/// Capacity of one chip in bytes.
pub const EEPROM_SIZE: usize = 8192;
/// Bytes the chip latches in one write cycle.
pub const PAGE_SIZE: usize = 32;
/// Default internal write cycle time (tWR) in milliseconds.
pub const DEFAULT_WRITE_CYCLE_MS: u32 = 5;

const BASE_ADDRESS: u8 = 0b101_0000;
const ADDRESS_MASK: u16 = 0x1FFF;
const READ_CHUNK: usize = 64;

/// Levels of the A0..A2 address pins, selecting one of eight chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressPins {
    /// A0 tied high.
    pub a0: bool,
    /// A1 tied high.
    pub a1: bool,
    /// A2 tied high.
    pub a2: bool,
}

impl AddressPins {
    /// Pins from the low three bits of `index`.
    pub const fn from_index(index: u8) -> Self {
        Self {
            a0: index & 0b001 != 0,
            a1: index & 0b010 != 0,
            a2: index & 0b100 != 0,
        }
    }

    /// The 7-bit I2C address `0b1010_A2A1A0`.
    ///
    /// ```
    /// use media_platform::eeprom::AddressPins;
    ///
    /// assert_eq!(AddressPins::default().address(), 0x50);
    /// assert_eq!(AddressPins { a0: true, a1: false, a2: true }.address(), 0x55);
    /// ```
    pub const fn address(&self) -> u8 {
        BASE_ADDRESS | (self.a2 as u8) << 2 | (self.a1 as u8) << 1 | self.a0 as u8
    }
}

/// Write `data` at chip-local `offset`, one page-bounded chunk at a time.
fn write_chip<I: I2c, D: DelayNs>(
    i2c: &mut I,
    delay: &mut D,
    address: u8,
    write_cycle_ms: u32,
    offset: usize,
    data: &[Cell<u8>],
) -> Result<(), I::Error> {
    let mut frame = [0u8; 2 + PAGE_SIZE];
    let mut done = 0;
    while done < data.len() {
        let at = offset + done;
        let len = (PAGE_SIZE - at % PAGE_SIZE).min(data.len() - done);
        let [hi, lo] = (at as u16 & ADDRESS_MASK).to_be_bytes();
        frame[0] = hi;
        frame[1] = lo;
        copy_from_cells(&mut frame[2..2 + len], &data[done..done + len]);
        i2c.write(address, &frame[..2 + len])?;
        delay.delay_ms(write_cycle_ms);
        done += len;
    }
    Ok(())
}

/// Sequential read from chip-local `offset` into `data`.
fn read_chip<I: I2c>(
    i2c: &mut I,
    address: u8,
    offset: usize,
    data: &[Cell<u8>],
) -> Result<(), I::Error> {
    let mut chunk = [0u8; READ_CHUNK];
    for (i, window) in data.chunks(READ_CHUNK).enumerate() {
        let at = offset + i * READ_CHUNK;
        let dest = &mut chunk[..window.len()];
        i2c.write_read(address, &(at as u16 & ADDRESS_MASK).to_be_bytes(), dest)?;
        copy_into_cells(window, dest);
    }
    Ok(())
}

fn check_range<E>(offset: u64, len: usize, capacity: usize) -> Result<usize, MediaError<E>> {
    let capacity = capacity as u64;
    match offset.checked_add(len as u64) {
        Some(end) if end <= capacity => Ok(offset as usize),
        _ => Err(MediaError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// One CAT24C64 EEPROM.
///
/// # Examples
///
/// ```ignore
/// use media_platform::eeprom::{AddressPins, Cat24c64};
/// use media_platform::{SharedBuffer, StorageMedia};
///
/// let mut eeprom = Cat24c64::new(i2c, delay, AddressPins::default());
/// eeprom.write(&SharedBuffer::from_slice(b"settings"), 0)?;
/// ```
#[derive(Debug)]
pub struct Cat24c64<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    write_cycle_ms: u32,
}

impl<I2C: I2c, D: DelayNs> Cat24c64<I2C, D> {
    /// Chip strapped with `pins`.
    pub fn new(i2c: I2C, delay: D, pins: AddressPins) -> Self {
        Self {
            i2c,
            delay,
            address: pins.address(),
            write_cycle_ms: DEFAULT_WRITE_CYCLE_MS,
        }
    }

    /// Use a different write cycle time.
    pub fn with_write_cycle_ms(mut self, write_cycle_ms: u32) -> Self {
        self.write_cycle_ms = write_cycle_ms;
        self
    }

    /// The 7-bit bus address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> StorageMedia for Cat24c64<I2C, D> {
    type Error = MediaError<I2C::Error>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        let offset = check_range(offset, buffer.len(), EEPROM_SIZE)?;
        write_chip(
            &mut self.i2c,
            &mut self.delay,
            self.address,
            self.write_cycle_ms,
            offset,
            buffer.cells(),
        )
        .map_err(MediaError::Device)
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        let offset = check_range(offset, buffer.len(), EEPROM_SIZE)?;
        read_chip(&mut self.i2c, self.address, offset, buffer.cells()).map_err(MediaError::Device)
    }
}

/// Several CAT24C64 on one bus, addressed as one medium.
///
/// Chip `n` in the list covers bytes `n * 8192 .. (n + 1) * 8192`. Ranges
/// crossing a chip boundary are split between the chips.
#[derive(Debug)]
pub struct Cat24c64Array<I2C, D> {
    i2c: I2C,
    delay: D,
    addresses: Vec<u8>,
    write_cycle_ms: u32,
}

impl<I2C: I2c, D: DelayNs> Cat24c64Array<I2C, D> {
    /// Array of chips strapped with `pins`, in address order.
    ///
    /// # Panics
    ///
    /// Panics if `pins` is empty.
    pub fn new(i2c: I2C, delay: D, pins: &[AddressPins]) -> Self {
        assert!(!pins.is_empty(), "an EEPROM array needs at least one chip");
        Self {
            i2c,
            delay,
            addresses: pins.iter().map(AddressPins::address).collect(),
            write_cycle_ms: DEFAULT_WRITE_CYCLE_MS,
        }
    }

    /// Use a different write cycle time.
    pub fn with_write_cycle_ms(mut self, write_cycle_ms: u32) -> Self {
        self.write_cycle_ms = write_cycle_ms;
        self
    }

    /// Number of chips.
    pub fn chip_count(&self) -> usize {
        self.addresses.len()
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.addresses.len() * EEPROM_SIZE
    }

    /// Give back the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Split a checked range into `(chip address, chip offset, buffer range)`.
    fn pieces(
        &self,
        offset: usize,
        len: usize,
    ) -> impl Iterator<Item = (u8, usize, core::ops::Range<usize>)> + '_ {
        let mut done = 0;
        core::iter::from_fn(move || {
            if done == len {
                return None;
            }
            let at = offset + done;
            let chip = at / EEPROM_SIZE;
            let local = at % EEPROM_SIZE;
            let n = (EEPROM_SIZE - local).min(len - done);
            let range = done..done + n;
            done += n;
            Some((self.addresses[chip], local, range))
        })
    }
}

impl<I2C: I2c, D: DelayNs> StorageMedia for Cat24c64Array<I2C, D> {
    type Error = MediaError<I2C::Error>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        let offset = check_range(offset, buffer.len(), self.capacity())?;
        let cells = buffer.cells();
        let pieces: Vec<_> = self.pieces(offset, cells.len()).collect();
        for (address, local, range) in pieces {
            trace!("EEPROM {}: write {} bytes at {}", address, range.len(), local);
            write_chip(
                &mut self.i2c,
                &mut self.delay,
                address,
                self.write_cycle_ms,
                local,
                &cells[range],
            )
            .map_err(MediaError::Device)?;
        }
        Ok(())
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        let offset = check_range(offset, buffer.len(), self.capacity())?;
        let cells = buffer.cells();
        let pieces: Vec<_> = self.pieces(offset, cells.len()).collect();
        for (address, local, range) in pieces {
            read_chip(&mut self.i2c, address, local, &cells[range]).map_err(MediaError::Device)?;
        }
        Ok(())
    }
}
