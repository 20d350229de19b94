//! Shared buffers and a first-fit allocator for storage media.
//!
//! This crate provides the memory side of the media stack:
//!
//! - [`SharedBuffer`]: a reference-counted array that every storage driver
//!   accepts and returns. Copies share data; the last copy releases it.
//! - [`FirstFitAllocator`]: a deterministic allocator over one fixed region,
//!   for targets that must not touch the global heap on hot paths.
//! - [`Arena`]: an aligned, statically sized region for the allocator.
//! - [`AllocationStats`]: opt-in accounting of outstanding bytes.
//!
//! Everything here is single-threaded. Buffers and allocators use interior
//! mutability without locking and are `!Send`/`!Sync`.
//!
//! # Example
//!
//! ```
//! use media_buffer::{FirstFitAllocator, SharedBuffer};
//!
//! let mut memory = [0u8; 1024];
//! let allocator = FirstFitAllocator::new(&mut memory);
//!
//! let sector = SharedBuffer::in_arena(512, &allocator, None)?;
//! sector.fill(0xFF);
//! let view = sector.clone();
//! assert_eq!(view.get(511), 0xFF);
//! # Ok::<(), media_buffer::BufferError>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod allocator;
mod arena;
mod error;
mod shared;
mod stats;

pub use allocator::{Allocation, FirstFitAllocator};
pub use arena::Arena;
pub use error::BufferError;
pub use shared::{SharedBuffer, copy_from_cells, copy_into_cells};
pub use stats::AllocationStats;
