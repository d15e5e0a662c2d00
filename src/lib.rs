//! Cinefeed - movie catalog and discussion ingestion pipeline
//!
//! This library crate exposes the core functionality for integration testing.

pub mod broker;
pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod forum;
pub mod pipeline;
pub mod server;

pub use error::{Error, Result};
