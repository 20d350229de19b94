//! First-fit allocator over a single fixed memory region.
//!
//! The allocator never touches the global heap for the memory it hands out.
//! It keeps an address-ordered set of used-block descriptors, bracketed by two
//! zero-length sentinels at the start and the end of the region, and places a
//! new block directly after the first used block whose trailing gap is large
//! enough.
//!
//! ```text
//!  offset 0                                                      capacity
//!  |S|  A  |   gap   |    B    | gap |          gap             |S|
//!   ^                                                            ^
//!   start sentinel (len 0)                  end sentinel (len 0) |
//! ```
//!
//! Freed blocks are simply removed from the set. There is no coalescing and
//! no splitting beyond the requested size: the freed space becomes part of a
//! gap that the next scan will find.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ops::Range;

/// A used-block descriptor.
///
/// Ordering is by start offset, then by length, so a zero-length sentinel
/// always sorts before a real block sharing its start offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct UsedBlock {
    start: usize,
    len: usize,
}

impl UsedBlock {
    const fn sentinel(start: usize) -> Self {
        Self { start, len: 0 }
    }

    #[inline]
    const fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    const fn is_sentinel(&self) -> bool {
        self.len == 0
    }
}

/// Handle to a block handed out by a [`FirstFitAllocator`].
///
/// Handles are deliberately not `Clone`: giving one back through
/// [`FirstFitAllocator::free`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Allocation {
    offset: usize,
    len: usize,
}

impl Allocation {
    /// Offset of the block from the start of the region.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the block in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; the allocator never hands out empty blocks.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte range of the block inside the region.
    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// First-fit allocator managing a caller-supplied region.
///
/// Interior mutability lets buffers that hold a shared reference to the
/// allocator give their block back when they are dropped. The allocator is
/// therefore `!Sync`; callers serialise access externally, like every other
/// resource in this crate.
///
/// # Examples
///
/// ```
/// use media_buffer::FirstFitAllocator;
///
/// let mut memory = [0u8; 64];
/// let allocator = FirstFitAllocator::new(&mut memory);
///
/// let a = allocator.allocate(16).unwrap();
/// let b = allocator.allocate(16).unwrap();
/// assert_eq!(a.offset(), 0);
/// assert_eq!(b.offset(), 16);
///
/// assert!(allocator.free(a));
/// // The hole left by `a` is reused first.
/// let c = allocator.allocate(8).unwrap();
/// assert_eq!(c.offset(), 0);
/// ```
pub struct FirstFitAllocator<'r> {
    region: &'r [Cell<u8>],
    used: RefCell<BTreeSet<UsedBlock>>,
}

impl<'r> FirstFitAllocator<'r> {
    /// Take over `region` as the allocator's backing memory.
    pub fn new(region: &'r mut [u8]) -> Self {
        let capacity = region.len();
        let region = Cell::from_mut(region).as_slice_of_cells();

        let mut used = BTreeSet::new();
        used.insert(UsedBlock::sentinel(0));
        used.insert(UsedBlock::sentinel(capacity));

        Self {
            region,
            used: RefCell::new(used),
        }
    }

    /// Size of the managed region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Reserve `size` bytes in the first gap that fits.
    ///
    /// Returns `None` when `size` is zero or when no gap is large enough.
    /// Running out of room is an expected condition under memory pressure
    /// and is left to the caller to handle.
    pub fn allocate(&self, size: usize) -> Option<Allocation> {
        if size == 0 {
            return None;
        }

        let mut used = self.used.borrow_mut();
        let start = used
            .iter()
            .zip(used.iter().skip(1))
            .find_map(|(block, next)| {
                let gap = next.start.saturating_sub(block.end());
                (gap >= size).then_some(block.end())
            })?;

        used.insert(UsedBlock { start, len: size });
        Some(Allocation { offset: start, len: size })
    }

    /// Give a block back.
    ///
    /// Returns `false` (and changes nothing) if the handle does not describe
    /// a block currently in use by this allocator.
    pub fn free(&self, allocation: Allocation) -> bool {
        if allocation.is_empty() {
            return false;
        }
        self.used.borrow_mut().remove(&UsedBlock {
            start: allocation.offset,
            len: allocation.len,
        })
    }

    /// Release the block starting exactly at `offset`.
    ///
    /// The two boundary sentinels are never removed. Offsets that do not
    /// start a used block are rejected with `false`.
    pub fn free_at(&self, offset: usize) -> bool {
        let mut used = self.used.borrow_mut();
        let found = used
            .range(UsedBlock { start: offset, len: 1 }..)
            .next()
            .copied()
            .filter(|block| block.start == offset && !block.is_sentinel());

        match found {
            Some(block) => used.remove(&block),
            None => false,
        }
    }

    /// The bytes backing `allocation`.
    ///
    /// Returns `None` if the handle lies outside this allocator's region.
    pub fn bytes(&self, allocation: &Allocation) -> Option<&'r [Cell<u8>]> {
        self.region.get(allocation.range())
    }

    /// `(offset, len)` of every block in use, in address order.
    pub fn used_blocks(&self) -> Vec<(usize, usize)> {
        self.used
            .borrow()
            .iter()
            .filter(|block| !block.is_sentinel())
            .map(|block| (block.start, block.len))
            .collect()
    }

    /// Total bytes currently handed out.
    pub fn bytes_in_use(&self) -> usize {
        self.used.borrow().iter().map(|block| block.len).sum()
    }

    /// Size of the largest request that would currently succeed.
    pub fn largest_gap(&self) -> usize {
        let used = self.used.borrow();
        used.iter()
            .zip(used.iter().skip(1))
            .map(|(block, next)| next.start.saturating_sub(block.end()))
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Debug for FirstFitAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstFitAllocator")
            .field("capacity", &self.capacity())
            .field("used_blocks", &self.used_blocks())
            .finish()
    }
}
