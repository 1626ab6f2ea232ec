//! greenspot-api: HTTP API server for greenspot
//!
//! This crate exposes the decision engine over JSON:
//! - Placement decisions and running-job optimization
//! - Time-shift planning
//! - Eviction and checkpoint simulation
//! - Dashboard statistics

pub mod rest;

pub use rest::create_router;
