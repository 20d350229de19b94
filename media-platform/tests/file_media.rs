//! Host file medium lifecycle.

use media_platform::file::FileMedia;
use media_platform::{SharedBuffer, StorageMedia};

#[test]
fn test_missing_file_is_created_by_initialization() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("disk.img");

    let mut media = FileMedia::open(&path)?;
    assert!(media.needs_initialization());
    assert!(!path.exists());

    media.initialize()?;
    media.after_initialize()?;
    assert!(!media.needs_initialization());
    assert!(path.exists());

    media.write(&SharedBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]), 2)?;
    assert_eq!(media.read(6, 0)?.to_vec(), vec![0, 0, 0xDE, 0xAD, 0xBE, 0xEF]);
    Ok(())
}

#[test]
fn test_existing_file_is_used_as_is() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("disk.img");
    let mut image = vec![0u8; 1024];
    image[0x1FE] = 0x55;
    image[0x1FF] = 0xAA;
    std::fs::write(&path, &image)?;

    let mut media = FileMedia::open(&path)?;
    assert!(!media.needs_initialization());
    assert!(media.has_mbr());

    media.write(&SharedBuffer::from_slice(&[0]), 0x1FF)?;
    assert!(!media.has_mbr());
    Ok(())
}

#[test]
fn test_contents_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("disk.img");

    {
        let mut media = FileMedia::open(&path)?;
        media.initialize()?;
        media.after_initialize()?;
        media.write(&SharedBuffer::from_slice(b"persist"), 100)?;
    }

    let mut media = FileMedia::open(&path)?;
    assert!(!media.needs_initialization());
    assert_eq!(media.read(7, 100)?.to_vec(), b"persist");
    assert_eq!(media.path(), path.as_path());
    Ok(())
}
