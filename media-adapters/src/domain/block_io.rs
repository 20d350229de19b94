//! Byte-granular access to block devices.
//!
//! Block devices can only transfer whole blocks. These functions split a byte
//! range into per-block [`BlockSegment`](crate::domain::BlockSegment)s and
//! handle each one:
//!
//! - a segment covering its whole block is written directly, with no read
//!   first (one aligned block is the common fast path);
//! - a partial segment is read-modify-written: the block is read, the
//!   touched bytes are patched from the caller's buffer, and the block is
//!   written back.
//!
//! Reads always fetch whole blocks and copy out the requested window.
//!
//! There is no atomicity across blocks: if a device error interrupts a
//! multi-block write, earlier blocks stay written.

use alloc::vec;
use core::cell::Cell;

use media_buffer::{copy_from_cells, copy_into_cells};

use crate::domain::error::MediaError;
use crate::domain::ports::BlockDevice;

/// Write `data` to `device` starting at byte `offset`.
///
/// An empty `data` does nothing. A single aligned block is one block write.
/// Inside longer ranges, blocks the range covers completely are also written
/// without reading them first; only the partial blocks at either end cost a
/// read.
///
/// # Errors
///
/// Returns [`MediaError::AddressOverflow`] if the range cannot be addressed,
/// or [`MediaError::Device`] if a block transfer fails.
///
/// # Examples
///
/// ```
/// use media_adapters::adapters::RamBlockDevice;
/// use media_adapters::domain::block_io;
/// use media_adapters::SharedBuffer;
///
/// let mut device = RamBlockDevice::new(512, 4);
/// let data = SharedBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
/// block_io::write_bytes(&mut device, 2, data.cells()).unwrap();
///
/// // One read to fetch the block, one write to store it back.
/// assert_eq!(device.reads(), 1);
/// assert_eq!(device.writes(), 1);
/// ```
pub fn write_bytes<D: BlockDevice>(
    device: &mut D,
    offset: u64,
    data: &[Cell<u8>],
) -> Result<(), MediaError<D::Error>> {
    if data.is_empty() {
        return Ok(());
    }

    let geometry = device.geometry();
    let span = geometry.span(offset, data.len())?;
    let mut block = vec![0u8; geometry.block_size()];

    if span.is_single_aligned_block() {
        if let Some(first) = span.first_block() {
            trace!("aligned write of block {}", first.value());
            copy_from_cells(&mut block, data);
            return device.write_block(first, &block).map_err(MediaError::Device);
        }
    }

    for segment in span.segments() {
        let window = &data[segment.buffer_range()];
        if segment.is_full_block() {
            trace!("full block write of {}", segment.block.value());
            copy_from_cells(&mut block, window);
        } else {
            trace!(
                "read-modify-write of {} bytes {}..{}",
                segment.block.value(),
                segment.offset_in_block,
                segment.offset_in_block + segment.len
            );
            device
                .read_block(segment.block, &mut block)
                .map_err(MediaError::Device)?;
            copy_from_cells(&mut block[segment.block_range()], window);
        }
        device
            .write_block(segment.block, &block)
            .map_err(MediaError::Device)?;
    }

    Ok(())
}

/// Fill `data` from `device` starting at byte `offset`.
///
/// An empty `data` does nothing.
///
/// # Errors
///
/// Returns [`MediaError::AddressOverflow`] if the range cannot be addressed,
/// or [`MediaError::Device`] if a block transfer fails.
pub fn read_bytes<D: BlockDevice>(
    device: &mut D,
    offset: u64,
    data: &[Cell<u8>],
) -> Result<(), MediaError<D::Error>> {
    if data.is_empty() {
        return Ok(());
    }

    let geometry = device.geometry();
    let span = geometry.span(offset, data.len())?;
    let mut block = vec![0u8; geometry.block_size()];

    for segment in span.segments() {
        device
            .read_block(segment.block, &mut block)
            .map_err(MediaError::Device)?;
        copy_into_cells(&data[segment.buffer_range()], &block[segment.block_range()]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{BlockAccess, RamBlockDevice};
    use crate::domain::BlockAddress;
    use media_buffer::SharedBuffer;

    #[test]
    fn test_aligned_block_skips_read() {
        let mut device = RamBlockDevice::new(512, 4);
        let data = SharedBuffer::from_slice(&[0xA5; 512]);

        write_bytes(&mut device, 512, data.cells()).unwrap();

        assert_eq!(device.reads(), 0);
        assert_eq!(device.writes(), 1);
        assert_eq!(device.block(1), &[0xA5; 512][..]);
    }

    #[test]
    fn test_covered_blocks_of_longer_range_skip_read() {
        let mut device = RamBlockDevice::new(16, 4);
        let data = SharedBuffer::from_slice(&[0x5A; 32]);

        write_bytes(&mut device, 16, data.cells()).unwrap();

        assert_eq!(
            device.accesses(),
            &[
                BlockAccess::Write(BlockAddress::new(1)),
                BlockAccess::Write(BlockAddress::new(2)),
            ]
        );
    }

    #[test]
    fn test_partial_block_read_modify_write() {
        let mut device = RamBlockDevice::new(512, 2);
        device.fill_block(0, 0x11);
        let data = SharedBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        write_bytes(&mut device, 2, data.cells()).unwrap();

        assert_eq!(device.reads(), 1);
        assert_eq!(device.writes(), 1);
        let block = device.block(0);
        assert_eq!(&block[..2], &[0x11, 0x11]);
        assert_eq!(&block[2..6], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(block[6..].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_unaligned_multi_block_write() {
        let mut device = RamBlockDevice::new(16, 4);
        let data = SharedBuffer::from_slice(&(0u8..36).collect::<Vec<_>>());

        write_bytes(&mut device, 8, data.cells()).unwrap();

        // Blocks 0 and 2 are partial, block 1 is fully covered.
        assert_eq!(device.reads(), 2);
        assert_eq!(device.writes(), 3);
        assert_eq!(
            device.accesses(),
            &[
                BlockAccess::Read(BlockAddress::new(0)),
                BlockAccess::Write(BlockAddress::new(0)),
                BlockAccess::Write(BlockAddress::new(1)),
                BlockAccess::Read(BlockAddress::new(2)),
                BlockAccess::Write(BlockAddress::new(2)),
            ]
        );
        assert_eq!(&device.block(0)[8..], &(0u8..8).collect::<Vec<_>>()[..]);
        assert_eq!(device.block(1), &(8u8..24).collect::<Vec<_>>()[..]);
        assert_eq!(&device.block(2)[..12], &(24u8..36).collect::<Vec<_>>()[..]);
        assert!(device.block(2)[12..].iter().all(|&b| b == 0));
        assert!(device.block(3).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_window() {
        let mut device = RamBlockDevice::new(16, 2);
        device.fill_block(0, 1);
        device.fill_block(1, 2);
        let data = SharedBuffer::<u8>::new(6);

        read_bytes(&mut device, 13, data.cells()).unwrap();

        assert_eq!(data.to_vec(), vec![1, 1, 1, 2, 2, 2]);
        assert_eq!(device.reads(), 2);
        assert_eq!(device.writes(), 0);
    }

    #[test]
    fn test_empty_ranges_touch_nothing() {
        let mut device = RamBlockDevice::new(512, 1);
        write_bytes(&mut device, 100, &[]).unwrap();
        read_bytes(&mut device, 100, &[]).unwrap();
        assert_eq!(device.reads() + device.writes(), 0);
    }

    #[test]
    fn test_device_error_propagates() {
        let mut device = RamBlockDevice::new(512, 1);
        let data = SharedBuffer::<u8>::new(4);
        let result = write_bytes(&mut device, 512, data.cells());
        assert!(matches!(result, Err(MediaError::Device(_))));
    }
}
