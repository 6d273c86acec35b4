//! Bronze layer: immutable, partitioned landing of raw API payloads.
//!
//! - [`lander`] - [`RawLander`] writes the compressed record plus checksum and
//!   manifest sidecars.
//! - [`storage`] - [`StorageBackend`] variants for local paths and mounted volumes.

pub mod lander;
pub mod storage;

pub use lander::{LandRequest, RawLander};
pub use storage::{LocalFs, MountedVolume, StorageBackend};
