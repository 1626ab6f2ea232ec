//! Offer, snapshot, decision and simulation type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spot capacity availability bucket for an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    High,
    Medium,
    Low,
    VeryLow,
}

impl Availability {
    /// Availability score in `[0, 1]`, higher is better
    pub fn score(&self) -> f64 {
        match self {
            Availability::High => 1.0,
            Availability::Medium => 0.7,
            Availability::Low => 0.4,
            Availability::VeryLow => 0.1,
        }
    }

    /// One bucket worse, saturating at `VeryLow`
    pub fn degrade(&self) -> Self {
        match self {
            Availability::High => Availability::Medium,
            Availability::Medium => Availability::Low,
            Availability::Low | Availability::VeryLow => Availability::VeryLow,
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::High => write!(f, "high"),
            Availability::Medium => write!(f, "medium"),
            Availability::Low => write!(f, "low"),
            Availability::VeryLow => write!(f, "very_low"),
        }
    }
}

/// Instance size tier, used for power draw estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Mid,
    High,
    Premium,
}

impl Tier {
    /// Average electrical draw of the instance in kWh per hour
    pub fn power_kwh_per_hour(&self) -> f64 {
        match self {
            Tier::Low => 0.30,
            Tier::Mid => 0.45,
            Tier::High => 1.20,
            Tier::Premium => 3.20,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Low => write!(f, "low"),
            Tier::Mid => write!(f, "mid"),
            Tier::High => write!(f, "high"),
            Tier::Premium => write!(f, "premium"),
        }
    }
}

/// One schedulable unit in a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOffer {
    /// Instance type identifier (e.g., "g4dn.xlarge")
    pub sku: String,
    pub gpu_name: String,
    pub gpu_count: u32,
    pub vcpus: u32,
    /// Accelerator memory in GB
    pub ram_gb: f64,
    pub spot_price_per_hour: f64,
    pub on_demand_price_per_hour: f64,
    /// Spot discount versus on-demand, in percent
    pub savings_pct: f64,
    pub availability: Availability,
    pub tier: Tier,
}

impl CandidateOffer {
    /// Create an offer, deriving `savings_pct` from the two prices
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sku: impl Into<String>,
        gpu_name: impl Into<String>,
        gpu_count: u32,
        vcpus: u32,
        ram_gb: f64,
        spot_price_per_hour: f64,
        on_demand_price_per_hour: f64,
        availability: Availability,
        tier: Tier,
    ) -> Self {
        let savings_pct = if on_demand_price_per_hour > 0.0 {
            ((on_demand_price_per_hour - spot_price_per_hour) / on_demand_price_per_hour * 100.0)
                .max(0.0)
        } else {
            0.0
        };
        Self {
            sku: sku.into(),
            gpu_name: gpu_name.into(),
            gpu_count,
            vcpus,
            ram_gb,
            spot_price_per_hour,
            on_demand_price_per_hour,
            savings_pct,
            availability,
            tier,
        }
    }
}

/// Discretized grid carbon intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonIndex {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl CarbonIndex {
    /// Bucket a carbon intensity in gCO2/kWh
    pub fn from_intensity(g_per_kwh: f64) -> Self {
        if g_per_kwh < 100.0 {
            CarbonIndex::VeryLow
        } else if g_per_kwh < 200.0 {
            CarbonIndex::Low
        } else if g_per_kwh < 300.0 {
            CarbonIndex::Moderate
        } else if g_per_kwh < 450.0 {
            CarbonIndex::High
        } else {
            CarbonIndex::VeryHigh
        }
    }
}

impl std::fmt::Display for CarbonIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CarbonIndex::VeryLow => write!(f, "very low"),
            CarbonIndex::Low => write!(f, "low"),
            CarbonIndex::Moderate => write!(f, "moderate"),
            CarbonIndex::High => write!(f, "high"),
            CarbonIndex::VeryHigh => write!(f, "very high"),
        }
    }
}

/// One availability zone within a region, fixed for a single evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone_id: String,
    pub zone_name: String,
    pub offers: Vec<CandidateOffer>,
    #[serde(rename = "carbon_intensity_gco2_per_kwh")]
    pub carbon_intensity: f64,
    pub carbon_index: CarbonIndex,
    pub temperature_c: f64,
    pub wind_kmh: f64,
}

/// Where each signal in a snapshot came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSources {
    pub price: String,
    pub weather: String,
    pub carbon: String,
}

/// Per-request view of a region, built from scratch for every decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub region_id: String,
    pub region_name: String,
    pub cloud_provider: String,
    pub location: String,
    /// Zones in catalog order
    pub zones: Vec<ZoneSnapshot>,
    /// Estimated carbon intensity for each hour of the day (UTC), 24 values
    pub carbon_curve: Vec<f64>,
    pub sources: SignalSources,
    pub captured_at: DateTime<Utc>,
}

impl RegionSnapshot {
    /// Mean spot price across every offer in every zone
    pub fn mean_spot_price(&self) -> Option<f64> {
        let prices: Vec<f64> = self
            .zones
            .iter()
            .flat_map(|z| z.offers.iter().map(|o| o.spot_price_per_hour))
            .collect();
        if prices.is_empty() {
            None
        } else {
            Some(prices.iter().sum::<f64>() / prices.len() as f64)
        }
    }

    /// Look up a zone by id
    pub fn zone(&self, zone_id: &str) -> Option<&ZoneSnapshot> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }
}

/// Largest accepted `estimated_gpu_hours` (about ten years of compute)
pub const MAX_ESTIMATED_GPU_HOURS: f64 = 87_600.0;

/// Resource requirement and deadline of a training job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub min_gpu_memory_gb: f64,
    pub estimated_gpu_hours: f64,
    pub deadline: DateTime<Utc>,
    pub preferred_region: Option<String>,
    /// Whether the job may be delayed within its deadline
    pub flexible: bool,
    pub checkpoint_interval_min: u32,
}

impl JobSpec {
    /// Create a flexible job with the default checkpoint interval
    pub fn new(min_gpu_memory_gb: f64, estimated_gpu_hours: f64, deadline: DateTime<Utc>) -> Self {
        Self {
            min_gpu_memory_gb,
            estimated_gpu_hours,
            deadline,
            preferred_region: None,
            flexible: true,
            checkpoint_interval_min: 30,
        }
    }
}

/// Whether the job starts now or at a later window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Immediate,
    TimeShifted,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Immediate => write!(f, "immediate"),
            Strategy::TimeShifted => write!(f, "time_shifted"),
        }
    }
}

/// Chosen placement for a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementDecision {
    pub region: String,
    pub zone: String,
    pub offer: CandidateOffer,
    pub score: f64,
    pub strategy: Strategy,
    pub optimal_start_time: Option<DateTime<Utc>>,
    pub reason: String,
}

/// Second-best candidate found during the same scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fallback {
    pub region: String,
    pub zone: String,
    pub sku: String,
    pub score: f64,
    pub reason: String,
}

/// Result of searching the deadline-bounded window for a cheaper start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeShiftPlan {
    pub region: String,
    pub recommended: bool,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    /// Hours between now and the best window start
    pub delay_hours: u32,
    pub reason: String,
    /// Mean hourly price if the job starts now
    pub price_now: f64,
    /// Mean hourly price over the best window
    pub price_at_window: f64,
    pub price_reduction_pct: f64,
    pub carbon_reduction_pct: f64,
    pub meets_deadline: bool,
}

/// States of a simulated spot interruption and recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Running,
    InterruptNoticeReceived,
    CheckpointSaving,
    Cordoned,
    Reprovisioning,
    CheckpointRestoring,
    Resumed,
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationState::Running => write!(f, "Running"),
            SimulationState::InterruptNoticeReceived => write!(f, "InterruptNoticeReceived"),
            SimulationState::CheckpointSaving => write!(f, "CheckpointSaving"),
            SimulationState::Cordoned => write!(f, "Cordoned"),
            SimulationState::Reprovisioning => write!(f, "Reprovisioning"),
            SimulationState::CheckpointRestoring => write!(f, "CheckpointRestoring"),
            SimulationState::Resumed => write!(f, "Resumed"),
        }
    }
}

/// One step of a simulated recovery timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub offset_sec: f64,
    pub state: SimulationState,
    pub event: String,
}

/// Outcome of a simulated eviction with checkpoint-based migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointEvent {
    pub job_id: String,
    pub region: String,
    pub from_zone: String,
    pub to_zone: String,
    pub sku: String,
    pub checkpoint_size_gb: f64,
    pub upload_duration_sec: f64,
    pub epoch_progress_pct: f64,
    /// Ordered by non-decreasing `offset_sec`
    pub timeline: Vec<TimelineEntry>,
    pub total_duration_sec: f64,
    pub data_loss: String,
}

/// Process-wide running totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub jobs_managed: u64,
    pub total_saved_usd: f64,
    pub total_co2_saved_kg: f64,
    pub checkpoints_saved: u64,
    pub evictions_handled: u64,
}
