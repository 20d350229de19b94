//! Any [`BlockDevice`] as a [`StorageMedia`].

use media_buffer::SharedBuffer;

use crate::domain::{BlockDevice, MediaError, StorageMedia, block_io};

/// Byte-addressed medium on top of a block device.
///
/// Unaligned writes go through the read-modify-write engine in
/// [`block_io`].
///
/// # Examples
///
/// ```
/// use media_adapters::adapters::{BlockMedia, RamBlockDevice};
/// use media_adapters::{SharedBuffer, StorageMedia};
///
/// let mut media = BlockMedia::new(RamBlockDevice::new(512, 2));
/// media.write(&SharedBuffer::from_slice(&[0x55, 0xAA]), 0x1FE).unwrap();
/// assert!(media.has_mbr());
/// ```
#[derive(Debug)]
pub struct BlockMedia<D> {
    device: D,
}

impl<D: BlockDevice> BlockMedia<D> {
    /// Wrap `device`.
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// The wrapped device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The wrapped device, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Unwrap the device.
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: BlockDevice> StorageMedia for BlockMedia<D> {
    type Error = MediaError<D::Error>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        block_io::write_bytes(&mut self.device, offset, buffer.cells())
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        block_io::read_bytes(&mut self.device, offset, buffer.cells())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RamBlockDevice;

    #[test]
    fn test_write_then_read_unaligned() {
        let mut media = BlockMedia::new(RamBlockDevice::new(64, 4));
        let data = SharedBuffer::from_slice(&(1u8..=100).collect::<Vec<_>>());

        media.write(&data, 30).unwrap();
        let back = media.read(100, 30).unwrap();

        assert_eq!(back.to_vec(), data.to_vec());
        assert!(media.device().as_bytes()[..30].iter().all(|&b| b == 0));
        assert!(media.device().as_bytes()[130..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_into_unmanaged_buffer() {
        let mut media = BlockMedia::new(RamBlockDevice::new(16, 2));
        media.device_mut().fill_block(1, 0x42);

        let mut scratch = [0u8; 4];
        media
            .read_into(14, &SharedBuffer::unmanaged(&mut scratch))
            .unwrap();
        assert_eq!(scratch, [0, 0, 0x42, 0x42]);
    }

    #[test]
    fn test_has_mbr_false_on_short_device() {
        let mut media = BlockMedia::new(RamBlockDevice::new(256, 1));
        assert!(!media.has_mbr());
    }
}
