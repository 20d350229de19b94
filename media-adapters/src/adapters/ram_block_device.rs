//! RAM-backed block device with an access log.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::domain::{BlockAddress, BlockDevice, BlockGeometry};

/// One block transfer recorded by [`RamBlockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAccess {
    /// A block was read.
    Read(BlockAddress),
    /// A block was written.
    Write(BlockAddress),
}

/// Errors from [`RamBlockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamBlockError {
    /// The block lies past the end of the device.
    OutOfRange(BlockAddress),
    /// The buffer is not exactly one block long.
    WrongLength(usize),
}

impl fmt::Display for RamBlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(block) => write!(f, "{} is past the end of the device", block),
            Self::WrongLength(len) => write!(f, "Buffer of {} bytes is not one block", len),
        }
    }
}

impl core::error::Error for RamBlockError {}

/// Block device simulated in RAM.
///
/// Every transfer is appended to an access log, so tests can check exactly
/// which blocks a higher layer read and wrote.
pub struct RamBlockDevice {
    data: Vec<u8>,
    geometry: BlockGeometry,
    accesses: Vec<BlockAccess>,
}

impl RamBlockDevice {
    /// A zeroed device of `blocks` blocks of `block_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    pub fn new(block_size: usize, blocks: u32) -> Self {
        assert!(block_size > 0, "block_size must be non-zero");
        Self {
            data: vec![0; block_size * blocks as usize],
            geometry: BlockGeometry::new(block_size).unwrap_or_default(),
            accesses: Vec::new(),
        }
    }

    /// Number of blocks.
    pub fn block_count(&self) -> u32 {
        (self.data.len() / self.geometry.block_size()) as u32
    }

    /// Contents of block `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the device.
    pub fn block(&self, index: u32) -> &[u8] {
        let size = self.geometry.block_size();
        let start = index as usize * size;
        &self.data[start..start + size]
    }

    /// Set every byte of block `index` to `value`, bypassing the log.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the device.
    pub fn fill_block(&mut self, index: u32, value: u8) {
        let size = self.geometry.block_size();
        let start = index as usize * size;
        self.data[start..start + size].fill(value);
    }

    /// Every transfer since creation or the last [`clear_log`](Self::clear_log).
    pub fn accesses(&self) -> &[BlockAccess] {
        &self.accesses
    }

    /// Number of logged reads.
    pub fn reads(&self) -> usize {
        self.count(|access| matches!(access, BlockAccess::Read(_)))
    }

    /// Number of logged writes.
    pub fn writes(&self) -> usize {
        self.count(|access| matches!(access, BlockAccess::Write(_)))
    }

    /// Forget all logged transfers.
    pub fn clear_log(&mut self) {
        self.accesses.clear();
    }

    /// The whole device as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn count(&self, filter: impl Fn(&BlockAccess) -> bool) -> usize {
        self.accesses.iter().filter(|access| filter(access)).count()
    }

    fn range(
        &self,
        block: BlockAddress,
        len: usize,
    ) -> Result<core::ops::Range<usize>, RamBlockError> {
        let size = self.geometry.block_size();
        if len != size {
            return Err(RamBlockError::WrongLength(len));
        }
        if block.value() >= self.block_count() {
            return Err(RamBlockError::OutOfRange(block));
        }
        let start = block.start(size) as usize;
        Ok(start..start + size)
    }
}

impl BlockDevice for RamBlockDevice {
    type Error = RamBlockError;

    fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    fn read_block(&mut self, block: BlockAddress, dest: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(block, dest.len())?;
        dest.copy_from_slice(&self.data[range]);
        self.accesses.push(BlockAccess::Read(block));
        Ok(())
    }

    fn write_block(&mut self, block: BlockAddress, src: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(block, src.len())?;
        self.data[range].copy_from_slice(src);
        self.accesses.push(BlockAccess::Write(block));
        Ok(())
    }
}

impl fmt::Debug for RamBlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamBlockDevice")
            .field("block_size", &self.geometry.block_size())
            .field("blocks", &self.block_count())
            .field("accesses", &self.accesses.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_round_trip() {
        let mut device = RamBlockDevice::new(8, 2);
        device.write_block(BlockAddress::new(1), &[9; 8]).unwrap();

        let mut out = [0u8; 8];
        device.read_block(BlockAddress::new(1), &mut out).unwrap();
        assert_eq!(out, [9; 8]);
        assert_eq!(
            device.accesses(),
            &[
                BlockAccess::Write(BlockAddress::new(1)),
                BlockAccess::Read(BlockAddress::new(1))
            ]
        );
    }

    #[test]
    fn test_rejects_bad_requests() {
        let mut device = RamBlockDevice::new(8, 2);
        assert_eq!(
            device.write_block(BlockAddress::new(2), &[0; 8]),
            Err(RamBlockError::OutOfRange(BlockAddress::new(2)))
        );
        assert_eq!(
            device.read_block(BlockAddress::new(0), &mut [0; 4]),
            Err(RamBlockError::WrongLength(4))
        );
        assert!(device.accesses().is_empty());
    }
}
