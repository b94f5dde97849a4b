//! # regen
//!
//! Command line front end of the regen planner: configuration, registry
//! loading and plan output. All planning happens in `regen-core`.

pub mod cli;
pub mod config;

pub use config::RegenConfig;
