//! Object storage for generated media.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait the pipeline uploads and downloads through
//! - A Cloudflare R2 implementation on the S3 API
//! - An in-process implementation for local runs and tests
//! - The object key layout for assets and rendered output

pub mod client;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryObjectStore;
pub use store::ObjectStore;
