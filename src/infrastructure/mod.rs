//! Adapters for the domain ports.

pub mod clock;
pub mod in_memory;
pub mod notification;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scheduler;
pub mod verifier;
