//! BlockDevice port - fixed-size block I/O.
//!
//! The read-modify-write engine in [`block_io`](crate::domain::block_io)
//! drives this trait to give block-addressed hardware byte granularity.

use core::fmt::Debug;

use crate::domain::value_objects::{BlockAddress, BlockGeometry};

/// A device that reads and writes whole blocks.
pub trait BlockDevice {
    /// Error type for block operations.
    type Error: Debug;

    /// Current block layout.
    fn geometry(&self) -> BlockGeometry;

    /// Read one block into `dest`.
    ///
    /// `dest` is exactly one block long.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails or `dest` has the wrong length.
    fn read_block(&mut self, block: BlockAddress, dest: &mut [u8]) -> Result<(), Self::Error>;

    /// Write one block from `src`.
    ///
    /// `src` is exactly one block long.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails or `src` has the wrong length.
    fn write_block(&mut self, block: BlockAddress, src: &[u8]) -> Result<(), Self::Error>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    type Error = T::Error;

    fn geometry(&self) -> BlockGeometry {
        (**self).geometry()
    }

    fn read_block(&mut self, block: BlockAddress, dest: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read_block(block, dest)
    }

    fn write_block(&mut self, block: BlockAddress, src: &[u8]) -> Result<(), Self::Error> {
        (**self).write_block(block, src)
    }
}
