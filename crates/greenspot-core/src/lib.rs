//! greenspot-core: Core types for the greenspot placement engine
//!
//! This crate provides the fundamental types used throughout greenspot:
//! - Offers, zone and region snapshots, decisions and plans
//! - The candidate catalog (regions, zones, GPU SKUs, grid profiles)
//! - Configuration types
//! - Error handling
//! - Deterministic jitter used for per-zone variation

pub mod catalog;
pub mod config;
pub mod error;
pub mod jitter;
pub mod model;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use jitter::*;
pub use model::*;
