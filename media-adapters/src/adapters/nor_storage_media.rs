//! `embedded-storage` devices as media.
//!
//! Wraps anything implementing [`embedded_storage::Storage`] (internal flash
//! with a read-modify-write layer, FRAM, EEPROM drivers from other crates) so
//! it can be used wherever a [`StorageMedia`] is expected.
//!
//! # Example
//!
//! ```ignore
//! use media_adapters::adapters::NorStorageMedia;
//!
//! let flash = esp_storage::FlashStorage::new();
//! let mut media = NorStorageMedia::new(flash);
//! let header = media.read(16, 0)?;
//! ```

use core::fmt::Debug;

use embedded_storage::Storage;
use media_buffer::{SharedBuffer, copy_from_cells, copy_into_cells};

use crate::domain::{MediaError, StorageMedia};

/// Bytes moved per call into the underlying storage.
const CHUNK_SIZE: usize = 64;

/// Medium backed by an [`embedded_storage::Storage`].
#[derive(Debug)]
pub struct NorStorageMedia<S> {
    storage: S,
}

impl<S: Storage> NorStorageMedia<S> {
    /// Wrap `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Consume the adapter and return the underlying storage.
    pub fn into_inner(self) -> S {
        self.storage
    }

    fn check(&self, offset: u64, len: usize) -> Result<u32, MediaError<S::Error>> {
        let capacity = self.storage.capacity() as u64;
        let fits = offset
            .checked_add(len as u64)
            .is_some_and(|end| end <= capacity);
        if !fits {
            return Err(MediaError::OutOfBounds {
                offset,
                len,
                capacity,
            });
        }
        u32::try_from(offset).map_err(|_| MediaError::AddressOverflow)
    }
}

impl<S> StorageMedia for NorStorageMedia<S>
where
    S: Storage,
    S::Error: Debug,
{
    type Error = MediaError<S::Error>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        let mut address = self.check(offset, buffer.len())?;
        let mut chunk = [0u8; CHUNK_SIZE];
        for cells in buffer.cells().chunks(CHUNK_SIZE) {
            let chunk = &mut chunk[..cells.len()];
            copy_from_cells(chunk, cells);
            self.storage
                .write(address, chunk)
                .map_err(MediaError::Device)?;
            address += cells.len() as u32;
        }
        Ok(())
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        let mut address = self.check(offset, buffer.len())?;
        let mut chunk = [0u8; CHUNK_SIZE];
        for cells in buffer.cells().chunks(CHUNK_SIZE) {
            let chunk = &mut chunk[..cells.len()];
            self.storage
                .read(address, chunk)
                .map_err(MediaError::Device)?;
            copy_into_cells(cells, chunk);
            address += cells.len() as u32;
        }
        Ok(())
    }
}
