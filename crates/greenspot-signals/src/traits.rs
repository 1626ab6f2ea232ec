//! Signal collaborator trait definitions

use async_trait::async_trait;
use greenspot_core::{CarbonIndex, RegionInfo, Tier};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// One entry of a region's price list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub sku: String,
    pub gpu_name: String,
    pub gpu_count: u32,
    pub vcpus: u32,
    pub ram_gb: f64,
    pub tier: Tier,
    pub spot_usd_hr: f64,
    pub on_demand_usd_hr: f64,
}

/// Weather at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub temperature_c: f64,
    pub wind_kmh: f64,
    /// Shortwave irradiance in W/m²
    pub solar_wm2: f64,
}

impl Default for WeatherSample {
    fn default() -> Self {
        Self {
            temperature_c: 15.0,
            wind_kmh: 10.0,
            solar_wm2: 0.0,
        }
    }
}

/// Current weather plus one sample per hour of the day (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub current: WeatherSample,
    /// 24 samples indexed by UTC hour of day
    pub hourly: Vec<WeatherSample>,
    pub source: String,
}

impl WeatherForecast {
    /// Flat forecast of default samples
    pub fn fallback(source: &str) -> Self {
        Self {
            current: WeatherSample::default(),
            hourly: vec![WeatherSample::default(); 24],
            source: source.to_string(),
        }
    }
}

/// Grid carbon intensity reported by a live feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonReading {
    pub intensity_g_per_kwh: f64,
    pub index: CarbonIndex,
    pub source: String,
}

/// Spot and on-demand price list provider, keyed by region
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the price list for a region
    async fn quotes(&self, region: &RegionInfo) -> Result<Vec<PriceQuote>, SignalError>;

    /// Source label reported in snapshots
    fn name(&self) -> &'static str;
}

/// Hourly weather forecast provider, keyed by region coordinates
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current weather and the 24-hour series for a region
    async fn forecast(&self, region: &RegionInfo) -> Result<WeatherForecast, SignalError>;
}

/// Grid carbon intensity provider
#[async_trait]
pub trait CarbonSource: Send + Sync {
    /// Live intensity for the region, or `None` when the region has no live feed
    async fn intensity(&self, region: &RegionInfo) -> Result<Option<CarbonReading>, SignalError>;
}
