//! Adapters implementing the domain ports.

pub mod auth;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
