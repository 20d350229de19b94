//! Reference-counted buffers shared across media calls.
//!
//! A [`SharedBuffer`] is the data-exchange type of the storage layer. Copies
//! share one allocation and one counter; the allocation goes back to where it
//! came from (global heap or a [`FirstFitAllocator`]) exactly once, when the
//! last copy is dropped. Buffers built over caller memory with
//! [`SharedBuffer::unmanaged`] never release anything.
//!
//! Elements are stored as [`Cell`]s, so a write through any copy is visible
//! through every other copy without `unsafe` or runtime borrow tracking.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use core::mem::size_of;
use core::ops::Index;

use crate::allocator::{Allocation, FirstFitAllocator};
use crate::error::BufferError;
use crate::stats::AllocationStats;

/// Shared, reference-counted array of `T`.
///
/// # Examples
///
/// ```
/// use media_buffer::SharedBuffer;
///
/// let buffer = SharedBuffer::<u8>::new(4);
/// let copy = buffer.clone();
/// copy[1].set(0xAA);
///
/// assert_eq!(buffer.get(1), 0xAA);
/// assert_eq!(buffer.ref_count(), 2);
/// ```
pub struct SharedBuffer<'a, T: Copy = u8> {
    repr: Repr<'a, T>,
}

enum Repr<'a, T: Copy> {
    Null,
    Heap(Rc<HeapBlock<'a, T>>),
    Arena(Rc<ArenaBlock<'a, T>>),
    Unmanaged(&'a [Cell<T>]),
}

struct HeapBlock<'a, T> {
    cells: Box<[Cell<T>]>,
    stats: Option<&'a AllocationStats>,
}

impl<T> Drop for HeapBlock<'_, T> {
    fn drop(&mut self) {
        if let Some(stats) = self.stats {
            stats.record_release(self.cells.len() * size_of::<T>());
        }
    }
}

struct ArenaBlock<'a, T> {
    cells: &'a [Cell<T>],
    allocation: Option<Allocation>,
    allocator: &'a FirstFitAllocator<'a>,
    stats: Option<&'a AllocationStats>,
}

impl<T> Drop for ArenaBlock<'_, T> {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.allocator.free(allocation);
        }
        if let Some(stats) = self.stats {
            stats.record_release(self.cells.len() * size_of::<T>());
        }
    }
}

impl<'a, T: Copy> SharedBuffer<'a, T> {
    /// Allocate `len` default-initialised elements on the global heap.
    pub fn new(len: usize) -> Self
    where
        T: Default,
    {
        Self::from_cells(default_cells(len), None)
    }

    /// Like [`new`](Self::new), but accounted in `stats`.
    pub fn tracked(len: usize, stats: &'a AllocationStats) -> Self
    where
        T: Default,
    {
        Self::from_cells(default_cells(len), Some(stats))
    }

    /// A zero-length buffer without an allocation.
    ///
    /// Used as an explicit "nothing here" value.
    #[inline]
    pub const fn null() -> Self {
        Self { repr: Repr::Null }
    }

    /// Wrap caller-owned memory without taking ownership of it.
    ///
    /// Dropping every copy leaves `memory` untouched; this exists for callers
    /// that reuse a static array instead of allocating per request.
    pub fn unmanaged(memory: &'a mut [T]) -> Self {
        Self {
            repr: Repr::Unmanaged(Cell::from_mut(memory).as_slice_of_cells()),
        }
    }

    /// Copy `data` into a new heap allocation.
    pub fn from_slice(data: &[T]) -> Self {
        Self::from_cells(data.iter().copied().map(Cell::new).collect(), None)
    }

    /// Copy the inclusive index range `start..=end` of `source` into a new
    /// owned buffer.
    ///
    /// The indices may be given in either order. Equal indices, or any index
    /// past the end of `source`, yield [`null`](Self::null). The copy is
    /// accounted in the same [`AllocationStats`] as `source`, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_buffer::SharedBuffer;
    ///
    /// let source = SharedBuffer::from_slice(&[1u8, 2, 3, 4, 5]);
    /// let part = SharedBuffer::from_range(&source, 3, 1);
    /// assert_eq!(part.to_vec(), vec![2, 3, 4]);
    ///
    /// assert!(SharedBuffer::from_range(&source, 2, 2).is_null());
    /// assert!(SharedBuffer::from_range(&source, 0, 5).is_null());
    /// ```
    pub fn from_range(source: &Self, start: usize, end: usize) -> Self {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        if start == end || end >= source.len() {
            return Self::null();
        }

        let cells = source.cells()[start..=end]
            .iter()
            .map(|cell| Cell::new(cell.get()))
            .collect();
        Self::from_cells(cells, source.stats())
    }

    fn from_cells(cells: Box<[Cell<T>]>, stats: Option<&'a AllocationStats>) -> Self {
        if let Some(stats) = stats {
            stats.record_allocation(cells.len() * size_of::<T>());
        }
        Self {
            repr: Repr::Heap(Rc::new(HeapBlock { cells, stats })),
        }
    }

    fn stats(&self) -> Option<&'a AllocationStats> {
        match &self.repr {
            Repr::Heap(block) => block.stats,
            Repr::Arena(block) => block.stats,
            Repr::Null | Repr::Unmanaged(_) => None,
        }
    }

    /// The elements as cells.
    #[inline]
    pub fn cells(&self) -> &[Cell<T>] {
        match &self.repr {
            Repr::Null => &[],
            Repr::Heap(block) => &block.cells,
            Repr::Arena(block) => block.cells,
            Repr::Unmanaged(cells) => cells,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells().len()
    }

    /// `true` if the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` for buffers made by [`null`](Self::null).
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.repr, Repr::Null)
    }

    /// `true` if dropping the last copy releases memory.
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self.repr, Repr::Heap(_) | Repr::Arena(_))
    }

    /// Size of the contents in bytes.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len() * size_of::<T>()
    }

    /// Read element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.cells()[index].get()
    }

    /// Read element `index`, or `None` past the end.
    #[inline]
    pub fn try_get(&self, index: usize) -> Option<T> {
        self.cells().get(index).map(Cell::get)
    }

    /// Overwrite element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn set(&self, index: usize, value: T) {
        self.cells()[index].set(value);
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: T) {
        self.cells().iter().for_each(|cell| cell.set(value));
    }

    /// Overwrite the whole buffer from `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src.len() != self.len()`.
    pub fn copy_from_slice(&self, src: &[T]) {
        assert_eq!(src.len(), self.len(), "source length must match buffer length");
        copy_into_cells(self.cells(), src);
    }

    /// Copy the whole buffer into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst.len() != self.len()`.
    pub fn copy_to_slice(&self, dst: &mut [T]) {
        assert_eq!(dst.len(), self.len(), "destination length must match buffer length");
        copy_from_cells(dst, self.cells());
    }

    /// Iterate over element values.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.cells().iter().map(Cell::get)
    }

    /// Copy the contents into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Number of live copies sharing this allocation.
    ///
    /// Always `0` for null and unmanaged buffers, which have nothing to
    /// release.
    pub fn ref_count(&self) -> usize {
        match &self.repr {
            Repr::Heap(block) => Rc::strong_count(block),
            Repr::Arena(block) => Rc::strong_count(block),
            Repr::Null | Repr::Unmanaged(_) => 0,
        }
    }

    /// `true` if both buffers view the same allocation or caller memory.
    pub fn shares_allocation_with(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Heap(a), Repr::Heap(b)) => Rc::ptr_eq(a, b),
            (Repr::Arena(a), Repr::Arena(b)) => Rc::ptr_eq(a, b),
            (Repr::Unmanaged(a), Repr::Unmanaged(b)) => {
                core::ptr::eq(a.as_ptr(), b.as_ptr()) && a.len() == b.len()
            }
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self.repr {
            Repr::Null => "null",
            Repr::Heap(_) => "heap",
            Repr::Arena(_) => "arena",
            Repr::Unmanaged(_) => "unmanaged",
        }
    }
}

impl<'a> SharedBuffer<'a, u8> {
    /// Allocate `len` zeroed bytes from `allocator` instead of the heap.
    ///
    /// The block is handed back to `allocator` when the last copy is dropped.
    /// A zero-length request yields [`null`](Self::null).
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::OutOfMemory`] if no gap in the allocator's region
    /// can hold `len` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_buffer::{FirstFitAllocator, SharedBuffer};
    ///
    /// let mut memory = [0u8; 32];
    /// let allocator = FirstFitAllocator::new(&mut memory);
    ///
    /// let buffer = SharedBuffer::in_arena(16, &allocator, None).unwrap();
    /// assert_eq!(allocator.bytes_in_use(), 16);
    /// drop(buffer);
    /// assert_eq!(allocator.bytes_in_use(), 0);
    /// ```
    pub fn in_arena(
        len: usize,
        allocator: &'a FirstFitAllocator<'a>,
        stats: Option<&'a AllocationStats>,
    ) -> Result<Self, BufferError> {
        if len == 0 {
            return Ok(Self::null());
        }

        let allocation = allocator
            .allocate(len)
            .ok_or(BufferError::OutOfMemory { requested: len })?;
        let Some(cells) = allocator.bytes(&allocation) else {
            allocator.free(allocation);
            return Err(BufferError::OutOfMemory { requested: len });
        };
        cells.iter().for_each(|cell| cell.set(0));

        if let Some(stats) = stats {
            stats.record_allocation(len);
        }

        Ok(Self {
            repr: Repr::Arena(Rc::new(ArenaBlock {
                cells,
                allocation: Some(allocation),
                allocator,
                stats,
            })),
        })
    }
}

impl<T: Copy> Clone for SharedBuffer<'_, T> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Null => Repr::Null,
            Repr::Heap(block) => Repr::Heap(Rc::clone(block)),
            Repr::Arena(block) => Repr::Arena(Rc::clone(block)),
            Repr::Unmanaged(cells) => Repr::Unmanaged(cells),
        };
        Self { repr }
    }

    /// Assignment: reassigning a buffer to its own allocation changes
    /// nothing; otherwise the old allocation loses one reference and the new
    /// one gains one.
    fn clone_from(&mut self, source: &Self) {
        if self.shares_allocation_with(source) {
            return;
        }
        *self = source.clone();
    }
}

impl<T: Copy> Default for SharedBuffer<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: Copy> Index<usize> for SharedBuffer<'_, T> {
    type Output = Cell<T>;

    #[inline]
    fn index(&self, index: usize) -> &Cell<T> {
        &self.cells()[index]
    }
}

impl<T: Copy> From<Vec<T>> for SharedBuffer<'static, T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_cells(data.into_iter().map(Cell::new).collect(), None)
    }
}

impl<T: Copy> fmt::Debug for SharedBuffer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

fn default_cells<T: Copy + Default>(len: usize) -> Box<[Cell<T>]> {
    (0..len).map(|_| Cell::new(T::default())).collect()
}

/// Copy `src` into a cell slice of the same length.
///
/// # Panics
///
/// Panics if the lengths differ.
pub fn copy_into_cells<T: Copy>(dst: &[Cell<T>], src: &[T]) {
    assert_eq!(dst.len(), src.len(), "cell and slice lengths must match");
    dst.iter().zip(src).for_each(|(cell, value)| cell.set(*value));
}

/// Copy a cell slice into `dst` of the same length.
///
/// # Panics
///
/// Panics if the lengths differ.
pub fn copy_from_cells<T: Copy>(dst: &mut [T], src: &[Cell<T>]) {
    assert_eq!(dst.len(), src.len(), "cell and slice lengths must match");
    dst.iter_mut().zip(src).for_each(|(value, cell)| *value = cell.get());
}
