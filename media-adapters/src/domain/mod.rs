//! Domain layer - the storage contract and hardware-independent logic.
//!
//! - **Value objects**: `BlockAddress`, `BlockGeometry` and the span/segment
//!   types that map byte ranges onto blocks
//! - **Ports**: `StorageMedia` (what applications use) and `BlockDevice`
//!   (what block hardware provides)
//! - **Services**: the `block_io` read-modify-write engine and the `mbr` probe
//! - **Errors**: `MediaError`
//!
//! ```text
//!     application
//!          │ StorageMedia
//!          ▼
//!  ┌───────────────┐     ┌──────────────┐
//!  │  BlockMedia   │────►│   block_io   │
//!  └───────────────┘     └──────┬───────┘
//!                               │ BlockDevice
//!                               ▼
//!                    SD card, RAM disk, ...
//! ```

pub mod block_io;
pub mod error;
pub mod mbr;
pub mod ports;
pub mod value_objects;

pub use error::MediaError;
pub use ports::{BlockDevice, StorageMedia};
pub use value_objects::{
    BlockAddress, BlockGeometry, BlockSegment, BlockSpan, DEFAULT_BLOCK_SIZE, Segments,
};
