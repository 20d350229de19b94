//! StorageMedia port - the contract every medium implements.
//!
//! Application code talks to EEPROMs, SRAMs, SD cards, files and RAM
//! simulators through this one trait, exchanging [`SharedBuffer`]s and
//! addressing the medium by flat byte offset.

use core::fmt::Debug;

use media_buffer::SharedBuffer;

use crate::domain::mbr;

/// A byte-addressed storage medium.
///
/// Offsets and lengths are in bytes. Media with a coarser native granularity
/// (block devices) handle alignment themselves; callers never need to.
///
/// # Bring-up
///
/// Some media need one-time setup before they can be used, such as a file
/// that does not exist yet or a card that has not been reset. The three
/// bring-up methods form a protocol:
///
/// ```ignore
/// if media.needs_initialization() {
///     media.initialize()?;
///     media.after_initialize()?;
/// }
/// ```
///
/// Media without setup keep the default no-op implementations.
///
/// # Examples
///
/// ```
/// use media_adapters::{FakeMedia, SharedBuffer, StorageMedia};
///
/// let mut media = FakeMedia::new(1024);
/// media.write(&SharedBuffer::from_slice(&[1, 2, 3]), 100).unwrap();
///
/// let data = media.read(3, 100).unwrap();
/// assert_eq!(data.to_vec(), vec![1, 2, 3]);
/// ```
pub trait StorageMedia {
    /// Error type for medium operations.
    type Error: Debug;

    /// Write all of `buffer` starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range does not fit the medium or the device
    /// fails. A failed write spanning several blocks may leave some of them
    /// updated.
    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error>;

    /// Read `size` bytes starting at byte `offset` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the range does not fit the medium or the device
    /// fails.
    fn read(&mut self, size: usize, offset: u64) -> Result<SharedBuffer<'static>, Self::Error> {
        let buffer = SharedBuffer::new(size);
        self.read_into(offset, &buffer)?;
        Ok(buffer)
    }

    /// Fill `buffer` from the medium starting at byte `offset`.
    ///
    /// For callers that reuse a buffer (often an
    /// [`unmanaged`](SharedBuffer::unmanaged) one) instead of allocating.
    ///
    /// # Errors
    ///
    /// Returns an error if the range does not fit the medium or the device
    /// fails.
    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error>;

    /// `true` if [`initialize`](Self::initialize) must run before use.
    fn needs_initialization(&self) -> bool {
        false
    }

    /// Perform one-time setup.
    ///
    /// # Errors
    ///
    /// Returns an error if setup fails; the medium stays unusable.
    fn initialize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Return the medium to normal read/write operation after setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be reopened.
    fn after_initialize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `true` if the medium carries an MBR boot signature.
    ///
    /// The default reads the two bytes at [`mbr::SIGNATURE_OFFSET`] and
    /// compares them with [`mbr::BOOT_SIGNATURE`]. Any read failure counts
    /// as "no MBR". Media that know the answer up front may override this
    /// to skip the device read.
    fn has_mbr(&mut self) -> bool {
        mbr::probe(self)
    }
}

impl<T: StorageMedia + ?Sized> StorageMedia for &mut T {
    type Error = T::Error;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        (**self).write(buffer, offset)
    }

    fn read(&mut self, size: usize, offset: u64) -> Result<SharedBuffer<'static>, Self::Error> {
        (**self).read(size, offset)
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        (**self).read_into(offset, buffer)
    }

    fn needs_initialization(&self) -> bool {
        (**self).needs_initialization()
    }

    fn initialize(&mut self) -> Result<(), Self::Error> {
        (**self).initialize()
    }

    fn after_initialize(&mut self) -> Result<(), Self::Error> {
        (**self).after_initialize()
    }

    fn has_mbr(&mut self) -> bool {
        (**self).has_mbr()
    }
}
