//! Allocation accounting for owned buffers.

use core::cell::Cell;

/// Diagnostic counters for buffer allocations.
///
/// Owned [`SharedBuffer`](crate::SharedBuffer)s created with a reference to a
/// `AllocationStats` add their size here when allocated and subtract it when
/// the last copy is dropped. The counters are plain state owned by whoever
/// cares about them, so independent components (and tests) never observe
/// each other's allocations.
///
/// # Examples
///
/// ```
/// use media_buffer::{AllocationStats, SharedBuffer};
///
/// let stats = AllocationStats::new();
/// {
///     let buffer = SharedBuffer::<u8>::tracked(64, &stats);
///     let copy = buffer.clone();
///     assert_eq!(stats.outstanding_bytes(), 64);
///     drop(copy);
/// }
/// assert_eq!(stats.outstanding_bytes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct AllocationStats {
    outstanding_bytes: Cell<usize>,
    live: Cell<usize>,
    allocations: Cell<usize>,
    releases: Cell<usize>,
}

impl AllocationStats {
    /// Create a zeroed set of counters.
    pub const fn new() -> Self {
        Self {
            outstanding_bytes: Cell::new(0),
            live: Cell::new(0),
            allocations: Cell::new(0),
            releases: Cell::new(0),
        }
    }

    /// Bytes held by tracked allocations that have not been released yet.
    #[inline]
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding_bytes.get()
    }

    /// Number of tracked allocations currently alive.
    #[inline]
    pub fn live_allocations(&self) -> usize {
        self.live.get()
    }

    /// Total number of tracked allocations ever made.
    #[inline]
    pub fn total_allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Total number of tracked allocations ever released.
    #[inline]
    pub fn total_releases(&self) -> usize {
        self.releases.get()
    }

    pub(crate) fn record_allocation(&self, bytes: usize) {
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_add(bytes));
        self.live.set(self.live.get() + 1);
        self.allocations.set(self.allocations.get() + 1);
    }

    pub(crate) fn record_release(&self, bytes: usize) {
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_sub(bytes));
        self.live.set(self.live.get().saturating_sub(1));
        self.releases.set(self.releases.get() + 1);
    }
}
