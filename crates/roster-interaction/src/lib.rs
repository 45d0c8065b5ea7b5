//! Remote backend adapters.
//!
//! This crate implements the capability traits against an Identity-Toolkit
//! compatible auth endpoint and a Firestore-compatible document endpoint
//! over plain REST. The document listener polls; everything upstream only
//! sees the snapshot-channel contract.

pub mod config;
pub mod rest_auth;
pub mod rest_store;

pub use config::BackendConfig;
pub use rest_auth::RestAuthGateway;
pub use rest_store::RestDocumentStore;
