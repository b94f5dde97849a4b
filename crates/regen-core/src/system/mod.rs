//! # System Module
//!
//! Read-only reporting over a session's store.

mod metrics;

pub use metrics::*;
