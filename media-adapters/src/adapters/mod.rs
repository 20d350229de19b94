//! Adapters: concrete media built on the domain ports.
//!
//! - [`BlockMedia`]: any `BlockDevice` as a byte-addressed medium
//! - [`FakeMedia`]: byte-addressed RAM simulator
//! - [`RamBlockDevice`]: block device in RAM with an access log
//! - [`NorStorageMedia`]: `embedded-storage` devices (feature
//!   `embedded-storage`)

pub mod block_media;
mod fake_media;
#[cfg(feature = "embedded-storage")]
mod nor_storage_media;
mod ram_block_device;

pub use block_media::BlockMedia;
pub use fake_media::FakeMedia;
#[cfg(feature = "embedded-storage")]
pub use nor_storage_media::NorStorageMedia;
pub use ram_block_device::{BlockAccess, RamBlockDevice, RamBlockError};
