//! Mapping byte ranges onto fixed-size blocks.

use core::ops::Range;

use super::BlockAddress;
use crate::domain::error::MediaError;

/// Block size used by SD cards and most other block devices.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Block layout of a block-addressed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockGeometry {
    block_size: usize,
}

impl BlockGeometry {
    /// Geometry with blocks of `block_size` bytes, or `None` for zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_adapters::domain::BlockGeometry;
    ///
    /// assert!(BlockGeometry::new(0).is_none());
    /// assert_eq!(BlockGeometry::new(512).unwrap().block_size(), 512);
    /// ```
    #[inline]
    pub const fn new(block_size: usize) -> Option<Self> {
        if block_size == 0 {
            None
        } else {
            Some(Self { block_size })
        }
    }

    /// Size of one block in bytes.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Plan access to `len` bytes starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::AddressOverflow`] if the range ends past the
    /// last block a `u32` block number can address.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_adapters::domain::{BlockAddress, BlockGeometry};
    ///
    /// let geometry = BlockGeometry::default();
    /// let span = geometry.span::<()>(510, 4).unwrap();
    /// assert_eq!(span.first_block(), Some(BlockAddress::new(0)));
    /// assert_eq!(span.last_block(), Some(BlockAddress::new(1)));
    /// assert_eq!(span.segments().count(), 2);
    /// ```
    pub fn span<E>(&self, offset: u64, len: usize) -> Result<BlockSpan, MediaError<E>> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(MediaError::AddressOverflow)?;
        if len > 0 && BlockAddress::containing(end - 1, self.block_size).is_none() {
            return Err(MediaError::AddressOverflow);
        }

        Ok(BlockSpan {
            offset,
            len,
            block_size: self.block_size,
        })
    }
}

impl Default for BlockGeometry {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// The blocks touched by a byte range, first to last inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    offset: u64,
    len: usize,
    block_size: usize,
}

impl BlockSpan {
    /// First touched block; `None` for an empty range.
    pub fn first_block(&self) -> Option<BlockAddress> {
        (self.len > 0).then(|| self.block_of(self.offset))
    }

    /// Last touched block; `None` for an empty range.
    pub fn last_block(&self) -> Option<BlockAddress> {
        (self.len > 0).then(|| self.block_of(self.offset + self.len as u64 - 1))
    }

    /// Number of touched blocks.
    pub fn block_count(&self) -> u32 {
        match (self.first_block(), self.last_block()) {
            (Some(first), Some(last)) => last.value() - first.value() + 1,
            _ => 0,
        }
    }

    /// `true` if the range is exactly one whole, aligned block.
    pub fn is_single_aligned_block(&self) -> bool {
        self.len == self.block_size && self.offset % self.block_size as u64 == 0
    }

    /// Per-block pieces of the range, in address order.
    pub fn segments(&self) -> Segments {
        Segments {
            position: self.offset,
            remaining: self.len,
            buffer_offset: 0,
            block_size: self.block_size,
        }
    }

    fn block_of(&self, byte: u64) -> BlockAddress {
        // `BlockGeometry::span` rejected ranges past the last block number.
        BlockAddress::containing(byte, self.block_size).unwrap_or(BlockAddress::new(u32::MAX))
    }
}

/// The part of a byte range that falls into one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSegment {
    /// The block.
    pub block: BlockAddress,
    /// First touched byte within the block.
    pub offset_in_block: usize,
    /// Number of touched bytes.
    pub len: usize,
    /// Position of the first touched byte within the caller's buffer.
    pub buffer_offset: usize,
    block_size: usize,
}

impl BlockSegment {
    /// `true` if the segment covers the whole block.
    #[inline]
    pub fn is_full_block(&self) -> bool {
        self.offset_in_block == 0 && self.len == self.block_size
    }

    /// Touched bytes as a range within the block.
    #[inline]
    pub fn block_range(&self) -> Range<usize> {
        self.offset_in_block..self.offset_in_block + self.len
    }

    /// Touched bytes as a range within the caller's buffer.
    #[inline]
    pub fn buffer_range(&self) -> Range<usize> {
        self.buffer_offset..self.buffer_offset + self.len
    }
}

/// Iterator over the [`BlockSegment`]s of a [`BlockSpan`].
#[derive(Debug, Clone)]
pub struct Segments {
    position: u64,
    remaining: usize,
    buffer_offset: usize,
    block_size: usize,
}

impl Iterator for Segments {
    type Item = BlockSegment;

    fn next(&mut self) -> Option<BlockSegment> {
        if self.remaining == 0 {
            return None;
        }

        let block_size = self.block_size as u64;
        let offset_in_block = (self.position % block_size) as usize;
        let len = (self.block_size - offset_in_block).min(self.remaining);
        let segment = BlockSegment {
            block: BlockAddress::containing(self.position, self.block_size)
                .unwrap_or(BlockAddress::new(u32::MAX)),
            offset_in_block,
            len,
            buffer_offset: self.buffer_offset,
            block_size: self.block_size,
        };

        self.position += len as u64;
        self.remaining -= len;
        self.buffer_offset += len;
        Some(segment)
    }
}
