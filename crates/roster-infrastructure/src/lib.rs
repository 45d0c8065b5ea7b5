//! Local capability implementations.
//!
//! This crate provides the implementations that run entirely on the local
//! machine: the file-backed profile cache and the in-memory auth/document
//! store backends used for local mode and tests.

pub mod memory;
pub mod toml_profile_cache;

pub use memory::{MemoryAuthGateway, MemoryDocumentStore, MemoryProfileCache};
pub use toml_profile_cache::TomlProfileCache;
