//! # Storage Adapters
//!
//! [`crate::InMemoryKVStore`] lives beside the port it implements; the
//! persistent backend is compiled in with the `rocksdb` feature.

#[cfg(feature = "rocksdb")]
pub mod rocksdb;
