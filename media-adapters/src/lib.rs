//! Storage media contract and hardware-independent adapters.
//!
//! Every medium (I2C EEPROM, SPI SRAM, SD card, host file, RAM simulator)
//! implements [`StorageMedia`]: byte-addressed reads and writes that exchange
//! reference-counted [`SharedBuffer`]s, a three-phase bring-up protocol and
//! MBR detection.
//!
//! # Architecture
//!
//! ## Domain Layer (`domain`)
//! - **Value Objects**: `BlockAddress`, `BlockGeometry`, `BlockSpan`
//! - **Ports**: `StorageMedia`, `BlockDevice`
//! - **Services**: `block_io` (read-modify-write engine), `mbr`
//!
//! ## Adapter Layer (`adapters`)
//! - **`BlockMedia`**: implements `StorageMedia` for any `BlockDevice`
//! - **`FakeMedia`**: RAM-backed byte medium for tests and host tools
//! - **`RamBlockDevice`**: RAM-backed block device with an access log
//! - **`NorStorageMedia`**: `embedded-storage` devices (feature
//!   `embedded-storage`)
//!
//! # Quick Start
//!
//! ```
//! use media_adapters::adapters::{BlockMedia, RamBlockDevice};
//! use media_adapters::{SharedBuffer, StorageMedia};
//!
//! let mut media = BlockMedia::new(RamBlockDevice::new(512, 8));
//! media.write(&SharedBuffer::from_slice(b"hello"), 1000)?;
//! assert_eq!(media.read(5, 1000)?.to_vec(), b"hello");
//! # Ok::<(), media_adapters::MediaError<media_adapters::adapters::RamBlockError>>(())
//! ```
//!
//! # Features
//!
//! - `log` (default): log through the `log` facade
//! - `defmt`: log through `defmt`
//! - `embedded-storage`: enable `NorStorageMedia`
//! - `std`: standard library support

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// Must come first so the macros are visible to the other modules.
mod fmt;

pub mod adapters;
pub mod domain;

pub use adapters::{BlockMedia, FakeMedia};
pub use domain::{
    BlockAddress, BlockDevice, BlockGeometry, DEFAULT_BLOCK_SIZE, MediaError, StorageMedia,
    block_io, mbr,
};

#[cfg(feature = "embedded-storage")]
pub use adapters::NorStorageMedia;

// Re-export the buffer crate so users need only one dependency.
pub use media_buffer::{self, AllocationStats, FirstFitAllocator, SharedBuffer};
