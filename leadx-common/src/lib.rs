//! # leadx Common Library
//!
//! Shared code for the leadx enrichment tools:
//! - Error type used across crates
//! - TOML configuration loading and atomic write-back
//! - Logging configuration

pub mod config;
pub mod error;

pub use error::{Error, Result};
