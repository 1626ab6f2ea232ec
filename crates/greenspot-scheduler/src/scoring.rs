//! Multi-objective offer scoring
//!
//! Lower scores are better. Every term is normalised into `[0, 1]` before
//! weighting, so with weights summing to one the score is also in `[0, 1]`.

use greenspot_core::{CandidateOffer, ScoringConfig, ZoneSnapshot};
use serde::{Deserialize, Serialize};

/// Zone-level signals that affect an offer's score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSignals {
    pub carbon_intensity: f64,
    pub temperature_c: f64,
    pub wind_kmh: f64,
}

impl From<&ZoneSnapshot> for ZoneSignals {
    fn from(zone: &ZoneSnapshot) -> Self {
        Self {
            carbon_intensity: zone.carbon_intensity,
            temperature_c: zone.temperature_c,
            wind_kmh: zone.wind_kmh,
        }
    }
}

/// Normalised terms and the weighted total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price_norm: f64,
    pub carbon_norm: f64,
    pub availability_penalty: f64,
    /// Hotter sites need more cooling energy
    pub cooling_norm: f64,
    /// Calmer sites have less wind generation
    pub renewable_penalty: f64,
    pub total: f64,
}

/// Stateless scorer over a fixed weight configuration
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    /// Create a scorer; the configuration is expected to be validated
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score an offer with every term exposed
    pub fn breakdown(&self, offer: &CandidateOffer, signals: &ZoneSignals) -> ScoreBreakdown {
        let c = &self.config;

        let price_norm = (offer.spot_price_per_hour / c.price_ceiling_usd_hr).clamp(0.0, 1.0);
        let carbon_norm = (signals.carbon_intensity / c.carbon_ceiling_g_per_kwh).clamp(0.0, 1.0);
        let availability_penalty = 1.0 - offer.availability.score();
        let cooling_norm = (signals.temperature_c.max(0.0) / c.temp_ceiling_c).min(1.0);
        let renewable_penalty = 1.0 - (signals.wind_kmh.max(0.0) / c.wind_ceiling_kmh).min(1.0);

        let total = c.price_weight * price_norm
            + c.carbon_weight * carbon_norm
            + c.availability_weight * availability_penalty
            + c.cooling_weight * cooling_norm
            + c.renewable_weight * renewable_penalty;

        ScoreBreakdown {
            price_norm,
            carbon_norm,
            availability_penalty,
            cooling_norm,
            renewable_penalty,
            total,
        }
    }

    /// Score an offer, lower is better
    pub fn score(&self, offer: &CandidateOffer, signals: &ZoneSignals) -> f64 {
        self.breakdown(offer, signals).total
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
