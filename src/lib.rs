//! Compression gate for picked or captured images
//!
//! Decides whether an image exceeds the caller's size or resolution limits,
//! runs it through a callback-driven compression engine when it does, and
//! hands the final file location back to the caller.

pub mod decision;
pub mod engine;
pub mod error;
pub mod handoff;
pub mod metadata;
pub mod models;
pub mod options;
pub mod orchestrator;
pub mod provider;

pub use error::{Error, Result};
