//! greenspot-signals: Signal snapshot assembly
//!
//! This crate gathers the per-region signals the scoring engine needs:
//! - Spot and on-demand price lists
//! - Current and hourly weather
//! - Grid carbon intensity, live or estimated from wind and solar output
//!
//! Every collaborator call is bounded by a timeout and falls back to a
//! documented default, so a snapshot can always be built.

pub mod carbon;
pub mod error;
pub mod prices;
pub mod snapshot;
pub mod traits;
pub mod weather;

pub use carbon::{CarbonModel, ModelOnlyCarbon, UkGridCarbon};
pub use error::SignalError;
pub use prices::{CatalogPriceSource, HttpPriceSource};
pub use snapshot::SnapshotAssembler;
pub use traits::{
    CarbonReading, CarbonSource, PriceQuote, PriceSource, WeatherForecast, WeatherSample,
    WeatherSource,
};
pub use weather::{OpenMeteoWeather, StaticWeather};
