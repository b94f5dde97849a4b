//! # Formats
//!
//! Byte-level encodings of a generation plan. File I/O stays in the app.

mod persistence;

pub use persistence::*;
