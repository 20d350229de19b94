//! Ports: the interfaces between media and the code that uses them.

mod block_device;
mod storage_media;

pub use block_device::BlockDevice;
pub use storage_media::StorageMedia;
