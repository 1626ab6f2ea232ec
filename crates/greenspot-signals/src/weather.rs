//! Weather forecast sources

use async_trait::async_trait;
use greenspot_core::RegionInfo;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::SignalError;
use crate::traits::{WeatherForecast, WeatherSample, WeatherSource};

/// Fixed forecast, no network access
#[derive(Debug, Clone)]
pub struct StaticWeather {
    forecast: WeatherForecast,
}

impl StaticWeather {
    /// Serve the given forecast for every region
    pub fn new(forecast: WeatherForecast) -> Self {
        Self { forecast }
    }
}

impl Default for StaticWeather {
    fn default() -> Self {
        Self::new(WeatherForecast::fallback("static"))
    }
}

#[async_trait]
impl WeatherSource for StaticWeather {
    async fn forecast(&self, _region: &RegionInfo) -> Result<WeatherForecast, SignalError> {
        Ok(self.forecast.clone())
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: OpenMeteoCurrent,
    hourly: OpenMeteoHourly,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    wind_speed_10m: f64,
    #[serde(default)]
    shortwave_radiation: f64,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    temperature_2m: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    shortwave_radiation: Vec<Option<f64>>,
}

impl OpenMeteoResponse {
    fn into_forecast(self) -> Result<WeatherForecast, SignalError> {
        let series = &self.hourly;
        let len = series
            .temperature_2m
            .len()
            .min(series.wind_speed_10m.len())
            .min(series.shortwave_radiation.len());
        if len < 24 {
            return Err(SignalError::Decode(format!(
                "expected at least 24 hourly samples, got {}",
                len
            )));
        }

        let current = WeatherSample {
            temperature_c: self.current.temperature_2m,
            wind_kmh: self.current.wind_speed_10m,
            solar_wm2: self.current.shortwave_radiation,
        };

        // Series start at 00:00 UTC, so index == hour of day
        let hourly = (0..24)
            .map(|h| WeatherSample {
                temperature_c: series.temperature_2m[h].unwrap_or(current.temperature_c),
                wind_kmh: series.wind_speed_10m[h].unwrap_or(current.wind_kmh),
                solar_wm2: series.shortwave_radiation[h].unwrap_or(0.0),
            })
            .collect();

        Ok(WeatherForecast {
            current,
            hourly,
            source: "open-meteo".to_string(),
        })
    }
}

/// Open-Meteo hourly forecast client
pub struct OpenMeteoWeather {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoWeather {
    /// Create a new client for the given forecast endpoint
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SignalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignalError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoWeather {
    async fn forecast(&self, region: &RegionInfo) -> Result<WeatherForecast, SignalError> {
        let variables = "temperature_2m,wind_speed_10m,shortwave_radiation";
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", region.latitude.to_string()),
                ("longitude", region.longitude.to_string()),
                ("current", variables.to_string()),
                ("hourly", variables.to_string()),
                ("forecast_days", "1".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: OpenMeteoResponse = response.json().await?;
        let forecast = body.into_forecast()?;

        debug!(
            region = region.id,
            temperature_c = forecast.current.temperature_c,
            wind_kmh = forecast.current.wind_kmh,
            "Fetched weather forecast"
        );
        Ok(forecast)
    }
}
