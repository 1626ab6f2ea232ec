//! greenspot-scheduler: Placement decision engine
//!
//! This crate provides the decision logic for placing GPU jobs on spot capacity:
//! - Multi-objective scoring over price, carbon, availability, cooling and wind
//! - Placement selection with a fallback candidate
//! - Deadline-bounded time-shift planning
//! - Eviction and checkpoint recovery simulation
//! - Decision aggregation and running totals

pub mod engine;
pub mod eviction;
pub mod placement;
pub mod report;
pub mod scoring;
pub mod stats;
pub mod timeshift;

pub use engine::DecisionEngine;
pub use eviction::{EvictionRequest, EvictionSimulator};
pub use placement::{PlacementStrategy, ScoredPlacementStrategy, Selection};
pub use scoring::{ScoreBreakdown, Scorer, ZoneSignals};
pub use stats::RunningStats;
pub use timeshift::TimeShiftPlanner;
