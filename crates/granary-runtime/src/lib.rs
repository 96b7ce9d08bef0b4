//! Granary Runtime
//!
//! This crate provides the execution runtime for the Granary warehouse
//! pipeline:
//!
//! - PostgreSQL adapters for the source and warehouse seams, acquiring and
//!   releasing a connection per call
//! - The pipeline engine that sequences the dimension and fact loads in
//!   dependency order, fail-fast
//!
//! # Usage
//!
//! ```rust,ignore
//! use granary_runtime::Pipeline;
//!
//! let pipeline = Pipeline::for_config(config);
//! let summary = pipeline.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod db;
pub mod engine;
pub mod error;

pub use engine::{Pipeline, RunSummary};
pub use error::{Error, Result};
