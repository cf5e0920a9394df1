//! Storage abstractions for the shortfall workflow.
//!
//! This crate defines the persistence contract used by the workflow engine
//! and service surfaces:
//! - shortage request records (system of record for the pipeline)
//! - operator accounts
//! - the product master
//!
//! Design stance:
//! - writes are confirmed before anything is served back; a record becomes
//!   visible in views only after its `put` returns
//! - backends hold whole documents and stay order-agnostic; sorting and
//!   filtering belong to the engine, so adapters remain trivially swappable

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{ProductStore, RequestStore, ShortfallStorage, UserStore};
