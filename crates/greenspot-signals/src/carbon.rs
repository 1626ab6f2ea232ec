//! Grid carbon intensity: live feed and wind/solar estimation model

use async_trait::async_trait;
use greenspot_core::{CarbonIndex, GridProfile, RegionInfo};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::SignalError;
use crate::traits::{CarbonReading, CarbonSource, WeatherSample};

const WIND_CUT_IN_MS: f64 = 3.0;
const WIND_RATED_MS: f64 = 12.0;
const WIND_CUT_OUT_MS: f64 = 25.0;
const SOLAR_RATED_WM2: f64 = 1000.0;
const MAX_CLEAN_FRACTION: f64 = 0.95;

/// Capacity-factor model estimating grid intensity from weather
///
/// Wind output follows a cubic power curve between cut-in and rated speed
/// and drops to zero above cut-out. Solar output is linear in irradiance.
/// The clean fraction of supply is the firm low-carbon share plus the
/// weather-dependent wind and solar contributions; the remainder is priced
/// at the region's fossil intensity.
#[derive(Debug, Clone, Copy)]
pub struct CarbonModel {
    grid: GridProfile,
}

impl CarbonModel {
    /// Create a model for a region's grid
    pub fn new(grid: GridProfile) -> Self {
        Self { grid }
    }

    /// Wind capacity factor in `[0, 1]` for a 10 m wind speed in km/h
    pub fn wind_capacity_factor(wind_kmh: f64) -> f64 {
        let ms = wind_kmh / 3.6;
        if !(WIND_CUT_IN_MS..WIND_CUT_OUT_MS).contains(&ms) {
            0.0
        } else if ms >= WIND_RATED_MS {
            1.0
        } else {
            (ms.powi(3) - WIND_CUT_IN_MS.powi(3)) / (WIND_RATED_MS.powi(3) - WIND_CUT_IN_MS.powi(3))
        }
    }

    /// Solar capacity factor in `[0, 1]` for shortwave irradiance in W/m²
    pub fn solar_capacity_factor(solar_wm2: f64) -> f64 {
        (solar_wm2 / SOLAR_RATED_WM2).clamp(0.0, 1.0)
    }

    /// Estimated intensity in gCO2/kWh under the given weather
    pub fn estimate(&self, weather: &WeatherSample) -> f64 {
        let clean = self.grid.firm_clean_share
            + self.grid.wind_share * Self::wind_capacity_factor(weather.wind_kmh)
            + self.grid.solar_share * Self::solar_capacity_factor(weather.solar_wm2);
        self.grid.fossil_intensity * (1.0 - clean.clamp(0.0, MAX_CLEAN_FRACTION))
    }

    /// Estimated intensity for each hourly sample
    pub fn curve(&self, hourly: &[WeatherSample]) -> Vec<f64> {
        hourly.iter().map(|w| self.estimate(w)).collect()
    }
}

/// Carbon source without any live feed; every region is estimated
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOnlyCarbon;

#[async_trait]
impl CarbonSource for ModelOnlyCarbon {
    async fn intensity(&self, _region: &RegionInfo) -> Result<Option<CarbonReading>, SignalError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct GridIntensityResponse {
    data: Vec<GridIntensityPeriod>,
}

#[derive(Debug, Deserialize)]
struct GridIntensityPeriod {
    intensity: GridIntensityValue,
}

#[derive(Debug, Deserialize)]
struct GridIntensityValue {
    forecast: Option<f64>,
    actual: Option<f64>,
    index: Option<String>,
}

fn parse_index(label: &str) -> Option<CarbonIndex> {
    match label.to_ascii_lowercase().as_str() {
        "very low" => Some(CarbonIndex::VeryLow),
        "low" => Some(CarbonIndex::Low),
        "moderate" => Some(CarbonIndex::Moderate),
        "high" => Some(CarbonIndex::High),
        "very high" => Some(CarbonIndex::VeryHigh),
        _ => None,
    }
}

impl GridIntensityResponse {
    fn into_reading(self) -> Result<CarbonReading, SignalError> {
        let period = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| SignalError::Decode("no intensity periods".to_string()))?;

        let value = period
            .intensity
            .actual
            .or(period.intensity.forecast)
            .ok_or_else(|| SignalError::Decode("no actual or forecast intensity".to_string()))?;

        let index = period
            .intensity
            .index
            .as_deref()
            .and_then(parse_index)
            .unwrap_or_else(|| CarbonIndex::from_intensity(value));

        Ok(CarbonReading {
            intensity_g_per_kwh: value,
            index,
            source: "uk-grid".to_string(),
        })
    }
}

/// Live GB grid intensity feed, serving a single region
pub struct UkGridCarbon {
    client: reqwest::Client,
    url: String,
    live_region: String,
}

impl UkGridCarbon {
    /// Create a new client; only `live_region` is served live
    pub fn new(url: &str, live_region: &str, timeout: Duration) -> Result<Self, SignalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignalError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            live_region: live_region.to_string(),
        })
    }
}

#[async_trait]
impl CarbonSource for UkGridCarbon {
    async fn intensity(&self, region: &RegionInfo) -> Result<Option<CarbonReading>, SignalError> {
        if region.id != self.live_region {
            return Ok(None);
        }

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body: GridIntensityResponse = response.json().await?;
        let reading = body.into_reading()?;

        debug!(
            region = region.id,
            intensity = reading.intensity_g_per_kwh,
            "Fetched live carbon intensity"
        );
        Ok(Some(reading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenspot_core::find_region;

    fn sample(wind_kmh: f64, solar_wm2: f64) -> WeatherSample {
        WeatherSample {
            temperature_c: 12.0,
            wind_kmh,
            solar_wm2,
        }
    }

    #[test]
    fn test_wind_capacity_factor() {
        assert_eq!(CarbonModel::wind_capacity_factor(5.0), 0.0);
        assert_eq!(CarbonModel::wind_capacity_factor(50.0), 1.0);
        assert_eq!(CarbonModel::wind_capacity_factor(100.0), 0.0);
        let mid = CarbonModel::wind_capacity_factor(27.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_solar_capacity_factor() {
        assert_eq!(CarbonModel::solar_capacity_factor(-5.0), 0.0);
        assert_eq!(CarbonModel::solar_capacity_factor(500.0), 0.5);
        assert_eq!(CarbonModel::solar_capacity_factor(1400.0), 1.0);
    }

    #[test]
    fn test_windy_hours_are_cleaner() {
        let ireland = find_region("eu-west-1").unwrap();
        let model = CarbonModel::new(ireland.grid);
        let calm = model.estimate(&sample(0.0, 0.0));
        let windy = model.estimate(&sample(45.0, 0.0));
        assert!((calm - 456.0).abs() < 1e-9);
        assert!(windy < calm);
    }

    #[test]
    fn test_clean_fraction_is_capped() {
        let grid = GridProfile {
            fossil_intensity: 400.0,
            firm_clean_share: 0.9,
            wind_share: 0.5,
            solar_share: 0.5,
        };
        let model = CarbonModel::new(grid);
        assert!((model.estimate(&sample(45.0, 1000.0)) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_curve_length() {
        let model = CarbonModel::new(find_region("eu-north-1").unwrap().grid);
        assert_eq!(model.curve(&vec![sample(10.0, 0.0); 24]).len(), 24);
    }

    #[test]
    fn test_grid_response_decode() {
        let json = r#"{"data":[{"from":"2026-10-19T12:00Z","to":"2026-10-19T12:30Z",
            "intensity":{"forecast":182,"actual":null,"index":"moderate"}}]}"#;
        let body: GridIntensityResponse = serde_json::from_str(json).unwrap();
        let reading = body.into_reading().unwrap();
        assert_eq!(reading.intensity_g_per_kwh, 182.0);
        assert_eq!(reading.index, CarbonIndex::Moderate);
    }

    #[tokio::test]
    async fn test_uk_grid_skips_other_regions() {
        let source =
            UkGridCarbon::new("http://127.0.0.1:9/intensity", "eu-west-2", Duration::from_secs(1))
                .unwrap();
        let region = find_region("us-east-1").unwrap();
        assert!(source.intensity(region).await.unwrap().is_none());
    }
}
