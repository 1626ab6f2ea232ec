//! Configuration types for greenspot

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// API server configuration
    pub api: ApiConfig,
    /// Scoring weights and normalisation ceilings
    pub scoring: ScoringConfig,
    /// External signal collaborators
    pub signals: SignalsConfig,
    /// Time-shift policy
    pub timeshift: TimeShiftConfig,
    /// Eviction simulation parameters
    pub checkpoint: CheckpointConfig,
    /// Savings and emissions reporting constants
    pub economics: EconomicsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::GreenspotError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::GreenspotError::Config(format!("Failed to read config file: {}", e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::GreenspotError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), crate::GreenspotError> {
        self.scoring.validate()?;
        if !positive(self.checkpoint.upload_bandwidth_gbps) {
            return Err(crate::GreenspotError::Config(
                "checkpoint.upload_bandwidth_gbps must be positive".to_string(),
            ));
        }
        if !positive(self.checkpoint.checkpoint_ratio) {
            return Err(crate::GreenspotError::Config(
                "checkpoint.checkpoint_ratio must be positive".to_string(),
            ));
        }
        if self.signals.timeout_ms == 0 {
            return Err(crate::GreenspotError::Config(
                "signals.timeout_ms must be non-zero".to_string(),
            ));
        }
        if crate::find_region(&self.economics.default_region).is_none() {
            return Err(crate::GreenspotError::Config(format!(
                "economics.default_region '{}' is not a known region",
                self.economics.default_region
            )));
        }
        Ok(())
    }
}

/// Finite and strictly greater than zero
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the REST API server
    pub rest_address: String,
    /// Port for the REST API server
    pub rest_port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_address: "0.0.0.0".to_string(),
            rest_port: 8787,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Weights and ceilings of the multi-objective score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub price_weight: f64,
    pub carbon_weight: f64,
    pub availability_weight: f64,
    pub cooling_weight: f64,
    pub renewable_weight: f64,
    /// Spot price (USD/h) at which the price term saturates
    pub price_ceiling_usd_hr: f64,
    /// Carbon intensity (gCO2/kWh) at which the carbon term saturates
    pub carbon_ceiling_g_per_kwh: f64,
    /// Ambient temperature (°C) at which the cooling term saturates
    pub temp_ceiling_c: f64,
    /// Wind speed (km/h) at which the renewable penalty reaches zero
    pub wind_ceiling_kmh: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            price_weight: 0.50,
            carbon_weight: 0.20,
            availability_weight: 0.15,
            cooling_weight: 0.10,
            renewable_weight: 0.05,
            price_ceiling_usd_hr: 4.0,
            carbon_ceiling_g_per_kwh: 600.0,
            temp_ceiling_c: 40.0,
            wind_ceiling_kmh: 50.0,
        }
    }
}

impl ScoringConfig {
    /// Weights must be non-negative and sum to one; ceilings must be positive
    pub fn validate(&self) -> Result<(), crate::GreenspotError> {
        let weights = [
            self.price_weight,
            self.carbon_weight,
            self.availability_weight,
            self.cooling_weight,
            self.renewable_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(crate::GreenspotError::Config(
                "scoring weights must be non-negative".to_string(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(crate::GreenspotError::Config(format!(
                "scoring weights must sum to 1, got {:.6}",
                sum
            )));
        }
        let ceilings = [
            self.price_ceiling_usd_hr,
            self.carbon_ceiling_g_per_kwh,
            self.temp_ceiling_c,
            self.wind_ceiling_kmh,
        ];
        if !ceilings.iter().all(|c| positive(*c)) {
            return Err(crate::GreenspotError::Config(
                "scoring ceilings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Price collaborator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSourceKind {
    /// Built-in reference prices
    Catalog,
    /// Remote price list service
    Http,
}

/// Weather collaborator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherSourceKind {
    /// Open-Meteo hourly forecast API
    OpenMeteo,
    /// Fixed default weather, no network
    Static,
}

/// Carbon collaborator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarbonSourceKind {
    /// Live GB grid intensity for the live region, model elsewhere
    UkGrid,
    /// Estimation model everywhere
    Model,
}

/// External signal collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub price_source: PriceSourceKind,
    /// Base URL of the price list service (used with `price_source = "http"`)
    pub price_url: String,
    pub weather_source: WeatherSourceKind,
    pub weather_url: String,
    pub carbon_source: CarbonSourceKind,
    pub carbon_url: String,
    /// Region served by the live carbon feed
    pub live_carbon_region: String,
    /// Bound on every collaborator call
    pub timeout_ms: u64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            price_source: PriceSourceKind::Catalog,
            price_url: "http://localhost:8900/prices".to_string(),
            weather_source: WeatherSourceKind::OpenMeteo,
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            carbon_source: CarbonSourceKind::UkGrid,
            carbon_url: "https://api.carbonintensity.org.uk/intensity".to_string(),
            live_carbon_region: "eu-west-2".to_string(),
            timeout_ms: 2500,
        }
    }
}

/// Time-shift policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeShiftConfig {
    /// Minimum price reduction (percent) before a delayed start is recommended
    pub min_price_reduction_pct: f64,
}

impl Default for TimeShiftConfig {
    fn default() -> Self {
        Self {
            min_price_reduction_pct: 5.0,
        }
    }
}

/// Eviction simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Checkpoint upload bandwidth in Gbps
    pub upload_bandwidth_gbps: f64,
    /// Checkpoint size relative to model size
    pub checkpoint_ratio: f64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            upload_bandwidth_gbps: 1.2,
            checkpoint_ratio: 0.8,
        }
    }
}

/// Savings and emissions reporting constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    /// Currency savings are additionally reported in
    pub secondary_currency: String,
    /// Fixed USD to secondary currency exchange rate
    pub usd_to_secondary: f64,
    /// Assumed intensity of the dirtiest region, for "saved vs worst" reporting
    pub worst_case_intensity_g_per_kwh: f64,
    /// Datacenter overhead multiplier on instance energy
    pub datacenter_overhead: f64,
    /// Savings (percent) required before a running job should move
    pub switch_threshold_pct: f64,
    /// Region planned for when a time-shift request names none
    pub default_region: String,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            secondary_currency: "EUR".to_string(),
            usd_to_secondary: 0.92,
            worst_case_intensity_g_per_kwh: 700.0,
            datacenter_overhead: 1.2,
            switch_threshold_pct: 10.0,
            default_region: "eu-north-1".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or text)
    pub format: String,
    /// Log file path (if any)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.api.rest_port, 8787);
        assert_eq!(config.timeshift.min_price_reduction_pct, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_weights() {
        let scoring = ScoringConfig {
            price_weight: 0.9,
            ..ScoringConfig::default()
        };
        assert!(scoring.validate().is_err());

        let scoring = ScoringConfig {
            price_weight: 0.7,
            carbon_weight: -0.2,
            availability_weight: 0.3,
            ..ScoringConfig::default()
        };
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn test_partial_toml_parse() {
        let toml_str = r#"
[api]
rest_port = 9000

[scoring]
price_weight = 0.4
carbon_weight = 0.3

[signals]
price_source = "http"
weather_source = "static"
carbon_source = "model"
timeout_ms = 500
"#;
        let config: OrchestratorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.rest_port, 9000);
        assert_eq!(config.api.rest_address, "0.0.0.0");
        assert_eq!(config.signals.price_source, PriceSourceKind::Http);
        assert_eq!(config.signals.weather_source, WeatherSourceKind::Static);
        assert_eq!(config.signals.carbon_source, CarbonSourceKind::Model);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_nan_scoring_values() {
        let scoring = ScoringConfig {
            cooling_weight: f64::NAN,
            ..ScoringConfig::default()
        };
        assert!(scoring.validate().is_err());

        let scoring = ScoringConfig {
            temp_ceiling_c: f64::NAN,
            ..ScoringConfig::default()
        };
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_checkpoint_settings() {
        let mut config = OrchestratorConfig::default();
        config.checkpoint.checkpoint_ratio = -1.0;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.checkpoint.checkpoint_ratio = 0.0;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.checkpoint.upload_bandwidth_gbps = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_default_region() {
        let mut config = OrchestratorConfig::default();
        config.economics.default_region = "mars-1".to_string();
        assert!(config.validate().is_err());
    }
}
