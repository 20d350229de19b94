//! Master boot record signature.

use media_buffer::SharedBuffer;

use crate::domain::ports::StorageMedia;

/// Byte offset of the boot signature within the first sector.
pub const SIGNATURE_OFFSET: u64 = 0x1FE;

/// The boot signature bytes, in on-disk order.
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// `true` if `bytes` is the boot signature.
#[inline]
pub const fn is_boot_signature(bytes: [u8; 2]) -> bool {
    bytes[0] == BOOT_SIGNATURE[0] && bytes[1] == BOOT_SIGNATURE[1]
}

/// `true` if `sector` is long enough and ends its first 512 bytes with the
/// boot signature.
///
/// ```
/// use media_adapters::domain::mbr;
///
/// let mut sector = [0u8; 512];
/// assert!(!mbr::has_boot_signature(&sector));
/// sector[510..].copy_from_slice(&mbr::BOOT_SIGNATURE);
/// assert!(mbr::has_boot_signature(&sector));
/// ```
pub fn has_boot_signature(sector: &[u8]) -> bool {
    let start = SIGNATURE_OFFSET as usize;
    match sector.get(start..start + 2) {
        Some(&[a, b]) => is_boot_signature([a, b]),
        _ => false,
    }
}

/// Read the two signature bytes from `media` and check them.
///
/// A failed read counts as "no signature". This is the default
/// [`StorageMedia::has_mbr`].
pub fn probe<M: StorageMedia + ?Sized>(media: &mut M) -> bool {
    let mut signature = [0u8; 2];
    let buffer = SharedBuffer::unmanaged(&mut signature);
    if media.read_into(SIGNATURE_OFFSET, &buffer).is_err() {
        return false;
    }
    drop(buffer);
    is_boot_signature(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sector_has_no_signature() {
        assert!(!has_boot_signature(&[0x55; 511]));
    }

    #[test]
    fn test_only_exact_pair_matches() {
        assert!(is_boot_signature([0x55, 0xAA]));
        assert!(!is_boot_signature([0xAA, 0x55]));
        assert!(!is_boot_signature([0x55, 0xAB]));
    }
}
