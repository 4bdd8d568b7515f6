//! # Rootstore Library
//!
//! This library exposes the rootstore app modules for testing and
//! integration.
//!
//! The binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod deployments;

// Re-export rootstore_core for convenience
pub use rootstore_core;
