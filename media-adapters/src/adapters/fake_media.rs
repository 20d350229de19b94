//! RAM-backed stand-in for a byte-addressed medium.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use media_buffer::{SharedBuffer, copy_from_cells, copy_into_cells};

use crate::domain::{MediaError, StorageMedia, mbr};

/// Byte-addressed medium simulated in RAM.
///
/// Accesses outside the medium are rejected with
/// [`MediaError::OutOfBounds`] and leave the contents unchanged.
///
/// By default [`has_mbr`](StorageMedia::has_mbr) probes the contents like any
/// other medium; [`report_mbr`](Self::report_mbr) fixes the answer instead.
#[derive(Debug, Clone)]
pub struct FakeMedia {
    data: Vec<u8>,
    mbr: Option<bool>,
}

impl FakeMedia {
    /// A zeroed medium of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::from_bytes(vec![0; capacity])
    }

    /// A medium holding `data`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, mbr: None }
    }

    /// Answer every MBR check with `present` without reading.
    pub fn report_mbr(mut self, present: bool) -> Self {
        self.mbr = Some(present);
        self
    }

    /// Size in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The whole medium as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(
        &self,
        offset: u64,
        len: usize,
    ) -> Result<core::ops::Range<usize>, MediaError<Infallible>> {
        let out_of_bounds = MediaError::OutOfBounds {
            offset,
            len,
            capacity: self.data.len() as u64,
        };
        let start = usize::try_from(offset).map_err(|_| out_of_bounds.clone())?;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(out_of_bounds),
        }
    }
}

impl StorageMedia for FakeMedia {
    type Error = MediaError<Infallible>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        let range = self.range(offset, buffer.len())?;
        copy_from_cells(&mut self.data[range], buffer.cells());
        Ok(())
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        let range = self.range(offset, buffer.len())?;
        copy_into_cells(buffer.cells(), &self.data[range]);
        Ok(())
    }

    fn has_mbr(&mut self) -> bool {
        match self.mbr {
            Some(present) => present,
            None => mbr::probe(self),
        }
    }
}
