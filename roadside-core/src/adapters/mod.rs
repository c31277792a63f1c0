//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - JSON file (and in-memory map) for the StorageBackend port
//! - Local-store mock backend for AuthProvider and RequestRepository
//! - Hosted HTTP client for AuthProvider and RequestRepository
//! - Nominatim client for address lookup, behind the mock-mode network guard

pub mod file_store;
pub mod geocoding;
pub mod hosted;
pub mod memory_store;
pub mod mock;
pub mod network;
pub mod rows;

#[cfg(test)]
pub mod hosted_mock;
