//! Hardware storage media over `embedded-hal` 1.0.
//!
//! Every medium here implements [`StorageMedia`] from `media-adapters`, so
//! application code can swap an SD card for an EEPROM, an SRAM or a host
//! file without changes.
//!
//! | Medium | Bus | Feature |
//! |--------|-----|---------|
//! | [`sdspi::SdCard`] | SPI + chip-select | `sdspi` |
//! | [`eeprom::Cat24c64`], [`eeprom::Cat24c64Array`] | I2C | `eeprom` |
//! | [`sram::Sram23k256`] | SPI + chip-select | `sram` |
//! | [`file::FileMedia`] | host filesystem | `std` |
//!
//! Drivers are blocking: each call runs to completion or to a bounded
//! retry failure. Callers sharing a medium between contexts must serialise
//! access themselves.
//!
//! # Features
//!
//! - `sdspi`, `eeprom`, `sram` (default): the drivers above
//! - `std` (default): `FileMedia`
//! - `log` (default): log through the `log` facade
//! - `defmt`: log through `defmt`

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// Must come first so the macros are visible to the other modules.
mod fmt;

#[cfg(feature = "eeprom")]
pub mod eeprom;
#[cfg(feature = "std")]
pub mod file;
#[cfg(feature = "sdspi")]
pub mod sdspi;
#[cfg(feature = "sram")]
pub mod sram;

pub use media_adapters::{self, MediaError, SharedBuffer, StorageMedia};
