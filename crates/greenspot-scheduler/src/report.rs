//! Composed responses returned by the decision engine

use greenspot_core::{
    Availability, CarbonIndex, Fallback, PlacementDecision, SignalSources, TimeShiftPlan,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::ScoreBreakdown;

/// Recommended checkpoint cadence for the chosen offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointPlan {
    pub interval_min: u32,
    pub estimated_size_gb: f64,
    pub expected_checkpoints: u32,
    pub reason: String,
}

/// Spot versus on-demand cost over the job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsReport {
    pub on_demand_cost_usd: f64,
    pub spot_cost_usd: f64,
    pub spot_savings_usd: f64,
    /// Extra saving from a recommended delayed start
    pub time_shift_savings_usd: f64,
    pub total_saved_usd: f64,
    pub savings_pct: f64,
    pub secondary_currency: String,
    pub total_saved_secondary: f64,
    pub exchange_rate: f64,
}

/// Energy and emissions estimate for the chosen placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreenImpact {
    pub energy_kwh: f64,
    pub carbon_intensity_g_per_kwh: f64,
    pub carbon_index: CarbonIndex,
    pub co2_kg: f64,
    pub worst_case_co2_kg: f64,
    pub co2_saved_vs_worst_kg: f64,
}

/// Interruption exposure of the chosen offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: String,
    pub availability: Availability,
    pub eviction_probability_per_hour: f64,
    pub expected_interruptions: f64,
    pub fallback_ready: bool,
    pub fallback_zone: Option<String>,
}

impl RiskAssessment {
    /// Hourly interruption probability by availability bucket
    pub fn eviction_probability(availability: Availability) -> f64 {
        match availability {
            Availability::High => 0.02,
            Availability::Medium => 0.05,
            Availability::Low => 0.12,
            Availability::VeryLow => 0.25,
        }
    }

    pub fn level_for(availability: Availability) -> &'static str {
        match availability {
            Availability::High => "low",
            Availability::Medium => "moderate",
            Availability::Low => "high",
            Availability::VeryLow => "severe",
        }
    }
}

/// Full answer to a placement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReport {
    pub job_id: Uuid,
    pub decision: PlacementDecision,
    pub fallback: Option<Fallback>,
    pub checkpointing: CheckpointPlan,
    pub savings: SavingsReport,
    pub green_impact: GreenImpact,
    /// Hops from the orchestrator down to the instance type
    pub server_path: Vec<String>,
    pub risk_assessment: RiskAssessment,
    pub time_shift: TimeShiftPlan,
    pub score_breakdown: ScoreBreakdown,
    pub candidates_evaluated: usize,
    pub signal_sources: SignalSources,
}

/// Where a job currently runs
#[derive(Debug, Clone, Default)]
pub struct CurrentPlacement {
    pub region: Option<String>,
    pub zone: Option<String>,
    /// Defaults to the recommended instance's on-demand price
    pub price_usd_hr: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialAnalysis {
    pub current_price_usd_hr: f64,
    pub recommended_price_usd_hr: f64,
    pub hourly_savings_usd: f64,
    pub total_savings_usd: f64,
    pub savings_pct: f64,
    pub secondary_currency: String,
    pub total_savings_secondary: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub current_intensity_g_per_kwh: f64,
    pub recommended_intensity_g_per_kwh: f64,
    pub current_co2_kg: f64,
    pub recommended_co2_kg: f64,
    pub co2_saved_kg: f64,
}

/// Answer to a "should this running job move" request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub recommendation: PlacementDecision,
    pub financial_analysis: FinancialAnalysis,
    pub environmental_impact: EnvironmentalImpact,
    pub reason: String,
    pub should_switch: bool,
    pub switch_reason: String,
}
