//! Scenarios for byte-addressed access to block devices.

use media_adapters::adapters::{BlockAccess, BlockMedia, RamBlockDevice};
use media_adapters::{BlockAddress, FakeMedia, SharedBuffer, StorageMedia};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_patch_inside_zeroed_block() -> anyhow::Result<()> {
    init_logger();
    let mut media = BlockMedia::new(RamBlockDevice::new(512, 1));

    let patch = SharedBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    media.write(&patch, 2)?;
    let block = media.read(512, 0)?;

    let bytes = block.to_vec();
    assert_eq!(&bytes[2..6], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert!(bytes[..2].iter().all(|&b| b == 0));
    assert!(bytes[6..].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn test_aligned_block_takes_fast_path() -> anyhow::Result<()> {
    init_logger();
    let mut media = BlockMedia::new(RamBlockDevice::new(512, 4));

    media.write(&SharedBuffer::from_slice(&[7; 512]), 1024)?;

    assert_eq!(
        media.device().accesses(),
        &[BlockAccess::Write(BlockAddress::new(2))]
    );
    Ok(())
}

#[test]
fn test_small_unaligned_write_is_one_cycle() -> anyhow::Result<()> {
    init_logger();
    let mut device = RamBlockDevice::new(512, 2);
    device.fill_block(1, 0x33);
    let mut media = BlockMedia::new(device);

    media.write(&SharedBuffer::from_slice(&[1, 2, 3]), 512 + 100)?;

    assert_eq!(
        media.device().accesses(),
        &[
            BlockAccess::Read(BlockAddress::new(1)),
            BlockAccess::Write(BlockAddress::new(1)),
        ]
    );
    let block = media.device().block(1);
    assert_eq!(&block[100..103], &[1, 2, 3]);
    assert_eq!(block.iter().filter(|&&b| b == 0x33).count(), 509);
    Ok(())
}

#[test]
fn test_block_and_byte_media_agree() -> anyhow::Result<()> {
    init_logger();
    let mut blocks = BlockMedia::new(RamBlockDevice::new(32, 8));
    let mut bytes = FakeMedia::new(256);

    let writes: [(u64, usize, u8); 5] = [
        (0, 10, 1),
        (30, 40, 2),
        (64, 32, 3),
        (100, 1, 4),
        (5, 200, 5),
    ];
    for (offset, len, value) in writes {
        let buffer = SharedBuffer::from_slice(&vec![value; len]);
        blocks.write(&buffer, offset)?;
        bytes.write(&buffer, offset)?;
    }

    assert_eq!(blocks.device().as_bytes(), bytes.as_bytes());
    assert_eq!(blocks.read(77, 123)?.to_vec(), bytes.read(77, 123)?.to_vec());
    Ok(())
}

#[test]
fn test_generic_over_media() -> anyhow::Result<()> {
    fn stamp<M: StorageMedia>(media: &mut M) -> Result<bool, M::Error> {
        media.write(&SharedBuffer::from_slice(&[0x55, 0xAA]), 0x1FE)?;
        Ok(media.has_mbr())
    }

    let mut blocks = BlockMedia::new(RamBlockDevice::new(512, 1));
    let mut bytes = FakeMedia::new(512);
    assert!(stamp(&mut blocks).map_err(|e| anyhow::anyhow!("{:?}", e))?);
    assert!(stamp(&mut bytes).map_err(|e| anyhow::anyhow!("{:?}", e))?);
    Ok(())
}
