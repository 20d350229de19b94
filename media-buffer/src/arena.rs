//! Statically sized, aligned backing store for a [`FirstFitAllocator`].

use aligned::{A8, Aligned};

use crate::allocator::FirstFitAllocator;

/// `N` bytes of 8-byte aligned memory meant to be handed to a
/// [`FirstFitAllocator`].
///
/// The alignment keeps blocks starting at multiples of 8 suitable for DMA
/// transfers on the usual SPI peripherals.
///
/// ```
/// use media_buffer::{Arena, SharedBuffer};
///
/// let mut arena = Arena::<256>::new();
/// let allocator = arena.allocator();
/// let block = SharedBuffer::in_arena(128, &allocator, None).unwrap();
/// assert_eq!(block.len(), 128);
/// ```
pub struct Arena<const N: usize> {
    memory: Aligned<A8, [u8; N]>,
}

impl<const N: usize> Arena<N> {
    /// A zeroed arena.
    pub const fn new() -> Self {
        Self {
            memory: Aligned([0; N]),
        }
    }

    /// Size of the arena in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Start managing the arena.
    ///
    /// The arena stays mutably borrowed for as long as the allocator lives.
    pub fn allocator(&mut self) -> FirstFitAllocator<'_> {
        FirstFitAllocator::new(&mut *self.memory)
    }
}

impl<const N: usize> Default for Arena<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_is_aligned() {
        let arena = Arena::<64>::new();
        assert_eq!(arena.memory.as_ptr() as usize % 8, 0);
        assert_eq!(arena.capacity(), 64);
    }

    #[test]
    fn test_allocator_spans_arena() {
        let mut arena = Arena::<128>::new();
        let allocator = arena.allocator();
        assert_eq!(allocator.capacity(), 128);
        assert_eq!(allocator.largest_gap(), 128);
    }
}
