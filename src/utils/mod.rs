//! Utility functions and helpers for the offline worker.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and log-safe URL rendering.

pub mod logging;
