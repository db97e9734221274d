//! tmc-core — shared input types and configuration for TMC placement.

pub mod config;
pub mod types;

pub use config::TmcConfig;
pub use types::*;
