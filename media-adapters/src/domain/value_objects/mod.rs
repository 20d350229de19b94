//! Value objects for block addressing.

mod block_address;
mod block_geometry;

pub use block_address::BlockAddress;
pub use block_geometry::{
    BlockGeometry, BlockSegment, BlockSpan, DEFAULT_BLOCK_SIZE, Segments,
};
