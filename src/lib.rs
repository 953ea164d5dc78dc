//! Data cleaning engine for the data-governance backend.
//!
//! This crate mutates records living in externally configured relational
//! stores by generating and executing statements against tables whose
//! structure is only known at runtime:
//! - deduplication through a staging-table rewrite
//! - conditional row filtering with safe column quoting
//! - per-column missing-value fill strategies
//!
//! The engine is invoked as a library call from the surrounding service
//! layer. It exposes no network protocol or file format of its own; dataset
//! and field-metadata CRUD, connection pooling and endpoint shaping live in
//! the collaborators behind the `catalog` and `store` seams.

pub mod catalog;
pub mod cleaning;
pub mod config;
pub mod store;

pub use cleaning::errors::CleaningError;
pub use cleaning::CleaningEngine;
