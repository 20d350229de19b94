//! Block numbers.

use core::fmt;

/// Index of a block on a block-addressed device.
///
/// Kept distinct from byte offsets, which the read-modify-write engine
/// juggles side by side with block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockAddress(u32);

impl BlockAddress {
    /// Block number `index`.
    ///
    /// ```
    /// use media_adapters::domain::BlockAddress;
    ///
    /// assert_eq!(BlockAddress::new(3).value(), 3);
    /// ```
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The block holding byte `offset`, or `None` when its number does not
    /// fit in 32 bits.
    ///
    /// `block_size` must be non-zero.
    pub fn containing(offset: u64, block_size: usize) -> Option<Self> {
        u32::try_from(offset / block_size as u64).ok().map(Self)
    }

    /// The block number.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Offset of the block's first byte.
    #[inline]
    pub const fn start(self, block_size: usize) -> u64 {
        self.0 as u64 * block_size as u64
    }
}

impl fmt::Display for BlockAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block #{}", self.0)
    }
}
