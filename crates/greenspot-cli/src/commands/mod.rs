//! CLI commands implementation

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Job sizing shared by placement commands
#[derive(Debug, Clone, Copy)]
pub struct JobArgs {
    pub hours: f64,
    pub min_memory: f64,
    pub deadline_hours: f64,
}

fn deadline_from(now: DateTime<Utc>, hours: f64) -> String {
    (now + Duration::milliseconds((hours * 3_600_000.0).round() as i64)).to_rfc3339()
}

/// Offer as returned in decisions
#[derive(Debug, Deserialize)]
pub struct OfferView {
    pub sku: String,
    pub gpu_name: String,
    pub gpu_count: u32,
    pub ram_gb: f64,
    pub spot_price_per_hour: f64,
    pub on_demand_price_per_hour: f64,
    pub availability: String,
}

/// Placement decision response
#[derive(Debug, Deserialize)]
pub struct DecisionView {
    pub region: String,
    pub zone: String,
    pub offer: OfferView,
    pub score: f64,
    pub strategy: String,
    pub optimal_start_time: Option<String>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FallbackView {
    pub zone: String,
    pub sku: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct SavingsView {
    pub total_saved_usd: f64,
    pub savings_pct: f64,
    pub secondary_currency: String,
    pub total_saved_secondary: f64,
}

#[derive(Debug, Deserialize)]
pub struct GreenImpactView {
    pub energy_kwh: f64,
    pub co2_kg: f64,
    pub co2_saved_vs_worst_kg: f64,
}

#[derive(Debug, Deserialize)]
pub struct RiskView {
    pub level: String,
    pub expected_interruptions: f64,
}

#[derive(Debug, Deserialize)]
pub struct CheckpointingView {
    pub interval_min: u32,
    pub estimated_size_gb: f64,
}

/// Time-shift plan response
#[derive(Debug, Deserialize)]
pub struct TimeShiftView {
    pub region: String,
    pub recommended: bool,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub reason: String,
    pub price_now: f64,
    pub price_at_window: f64,
    pub price_reduction_pct: f64,
    pub carbon_reduction_pct: f64,
    pub meets_deadline: bool,
}

/// Placement response
#[derive(Debug, Deserialize)]
pub struct SimulateResponse {
    pub job_id: String,
    pub decision: DecisionView,
    pub fallback: Option<FallbackView>,
    pub checkpointing: CheckpointingView,
    pub savings: SavingsView,
    pub green_impact: GreenImpactView,
    pub server_path: Vec<String>,
    pub risk_assessment: RiskView,
    pub time_shift: TimeShiftView,
}

#[derive(Debug, Deserialize)]
pub struct FinancialView {
    pub current_price_usd_hr: f64,
    pub recommended_price_usd_hr: f64,
    pub total_savings_usd: f64,
    pub savings_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct EnvironmentalView {
    pub current_co2_kg: f64,
    pub recommended_co2_kg: f64,
}

/// Optimization response
#[derive(Debug, Deserialize)]
pub struct OptimizeResponse {
    pub recommendation: DecisionView,
    pub financial_analysis: FinancialView,
    pub environmental_impact: EnvironmentalView,
    pub should_switch: bool,
    pub switch_reason: String,
}

#[derive(Debug, Deserialize)]
pub struct TimelineView {
    pub offset_sec: f64,
    pub state: String,
    pub event: String,
}

/// Eviction simulation response
#[derive(Debug, Deserialize)]
pub struct CheckpointResponse {
    pub job_id: String,
    pub from_zone: String,
    pub to_zone: String,
    pub checkpoint_size_gb: f64,
    pub upload_duration_sec: f64,
    pub timeline: Vec<TimelineView>,
    pub total_duration_sec: f64,
    pub data_loss: String,
}

/// Dashboard stats response
#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    pub jobs_managed: u64,
    pub total_saved_usd: f64,
    pub total_co2_saved_kg: f64,
    pub checkpoints_saved: u64,
    pub evictions_handled: u64,
    pub regions_monitored: Vec<String>,
}

fn print_offer(decision: &DecisionView) {
    let offer = &decision.offer;
    println!(
        "  Instance: {} ({} x{}, {:.0} GB)",
        offer.sku, offer.gpu_name, offer.gpu_count, offer.ram_gb
    );
    println!(
        "  Price: ${:.3}/h spot, ${:.3}/h on-demand",
        offer.spot_price_per_hour, offer.on_demand_price_per_hour
    );
    println!("  Availability: {}", offer.availability);
}

/// Place a new job
pub async fn simulate(
    client: &ApiClient,
    job: JobArgs,
    region: Option<String>,
    checkpoint_interval: u32,
    flexible: bool,
) -> Result<()> {
    #[derive(Serialize)]
    struct SimulateRequest {
        estimated_gpu_hours: f64,
        min_gpu_memory_gb: f64,
        deadline: String,
        preferred_region: Option<String>,
        checkpoint_interval_min: u32,
        flexible: bool,
    }

    let req = SimulateRequest {
        estimated_gpu_hours: job.hours,
        min_gpu_memory_gb: job.min_memory,
        deadline: deadline_from(Utc::now(), job.deadline_hours),
        preferred_region: region,
        checkpoint_interval_min: checkpoint_interval,
        flexible,
    };

    let response = client
        .client
        .post(client.url("/simulate"))
        .json(&req)
        .send()
        .await?;

    if response.status().is_success() {
        let report: SimulateResponse = response.json().await?;
        let decision = &report.decision;
        println!("Job {} placed in {} / {}", report.job_id, decision.region, decision.zone);
        print_offer(decision);
        println!("  Score: {:.4} ({})", decision.score, decision.strategy);
        if let Some(start) = &decision.optimal_start_time {
            println!("  Start at: {}", start);
        }
        println!("  Reason: {}", decision.reason);
        match &report.fallback {
            Some(f) => println!("  Fallback: {} in {} (score {:.4})", f.sku, f.zone, f.score),
            None => println!("  Fallback: none"),
        }
        println!(
            "  Savings: ${:.2} ({:.0}%), {:.2} {}",
            report.savings.total_saved_usd,
            report.savings.savings_pct,
            report.savings.total_saved_secondary,
            report.savings.secondary_currency
        );
        println!(
            "  Energy: {:.1} kWh, {:.2} kg CO2 ({:.2} kg saved vs worst region)",
            report.green_impact.energy_kwh,
            report.green_impact.co2_kg,
            report.green_impact.co2_saved_vs_worst_kg
        );
        println!(
            "  Checkpoints: every {} min, ~{:.1} GB",
            report.checkpointing.interval_min, report.checkpointing.estimated_size_gb
        );
        println!(
            "  Risk: {} ({:.2} expected interruptions)",
            report.risk_assessment.level, report.risk_assessment.expected_interruptions
        );
        println!("  Time shift: {}", report.time_shift.reason);
        println!("  Path: {}", report.server_path.join(" -> "));
    } else {
        let error = response.text().await?;
        eprintln!("Failed to place job: {}", error);
    }

    Ok(())
}

/// Check whether a running job should move
pub async fn optimize(
    client: &ApiClient,
    job: JobArgs,
    region: Option<String>,
    az: Option<String>,
    price: Option<f64>,
) -> Result<()> {
    #[derive(Serialize)]
    struct OptimizeRequest {
        estimated_gpu_hours: f64,
        min_gpu_memory_gb: f64,
        deadline: String,
        current_region: Option<String>,
        current_az: Option<String>,
        current_price_usd_hr: Option<f64>,
    }

    let req = OptimizeRequest {
        estimated_gpu_hours: job.hours,
        min_gpu_memory_gb: job.min_memory,
        deadline: deadline_from(Utc::now(), job.deadline_hours),
        current_region: region,
        current_az: az,
        current_price_usd_hr: price,
    };

    let response = client
        .client
        .post(client.url("/optimize-job"))
        .json(&req)
        .send()
        .await?;

    if response.status().is_success() {
        let report: OptimizeResponse = response.json().await?;
        let rec = &report.recommendation;
        println!(
            "{}: {}",
            if report.should_switch { "SWITCH" } else { "STAY" },
            report.switch_reason
        );
        println!("  Best placement: {} / {}", rec.region, rec.zone);
        print_offer(rec);
        let fin = &report.financial_analysis;
        println!(
            "  Price: ${:.3}/h now -> ${:.3}/h ({:.1}%, ${:.2} total)",
            fin.current_price_usd_hr, fin.recommended_price_usd_hr, fin.savings_pct, fin.total_savings_usd
        );
        println!(
            "  CO2: {:.2} kg now -> {:.2} kg",
            report.environmental_impact.current_co2_kg, report.environmental_impact.recommended_co2_kg
        );
    } else {
        let error = response.text().await?;
        eprintln!("Failed to optimize job: {}", error);
    }

    Ok(())
}

/// Plan a delayed start
pub async fn timeshift(
    client: &ApiClient,
    hours: f64,
    deadline_hours: f64,
    region: Option<String>,
) -> Result<()> {
    #[derive(Serialize)]
    struct TimeShiftRequest {
        estimated_gpu_hours: f64,
        deadline: String,
        preferred_region: Option<String>,
    }

    let req = TimeShiftRequest {
        estimated_gpu_hours: hours,
        deadline: deadline_from(Utc::now(), deadline_hours),
        preferred_region: region,
    };

    let response = client
        .client
        .post(client.url("/timeshift-plan"))
        .json(&req)
        .send()
        .await?;

    if response.status().is_success() {
        let plan: TimeShiftView = response.json().await?;
        println!(
            "Region {}: {}",
            plan.region,
            if plan.recommended { "delay recommended" } else { "start now" }
        );
        if let (Some(start), Some(end)) = (&plan.window_start, &plan.window_end) {
            println!("  Window: {} -> {}", start, end);
        }
        println!(
            "  Price: ${:.3}/h now, ${:.3}/h in window ({:.1}% lower)",
            plan.price_now, plan.price_at_window, plan.price_reduction_pct
        );
        println!("  Carbon: {:.1}% lower", plan.carbon_reduction_pct);
        println!("  Meets deadline: {}", plan.meets_deadline);
        println!("  Reason: {}", plan.reason);
    } else {
        let error = response.text().await?;
        eprintln!("Failed to plan time shift: {}", error);
    }

    Ok(())
}

/// Simulate an eviction
pub async fn checkpoint(
    client: &ApiClient,
    region: String,
    az: String,
    sku: String,
    model_size: f64,
    progress: f64,
    job_id: Option<String>,
) -> Result<()> {
    #[derive(Serialize)]
    struct CheckpointRequest {
        job_id: String,
        current_region: String,
        current_az: String,
        current_sku: String,
        model_size_gb: f64,
        epoch_progress_pct: f64,
    }

    let req = CheckpointRequest {
        job_id: job_id.unwrap_or_default(),
        current_region: region,
        current_az: az,
        current_sku: sku,
        model_size_gb: model_size,
        epoch_progress_pct: progress,
    };

    let response = client
        .client
        .post(client.url("/checkpoint-simulate"))
        .json(&req)
        .send()
        .await?;

    if response.status().is_success() {
        let event: CheckpointResponse = response.json().await?;
        println!(
            "Job {}: {} -> {} ({:.1} GB checkpoint, {:.2}s upload)",
            event.job_id,
            event.from_zone,
            event.to_zone,
            event.checkpoint_size_gb,
            event.upload_duration_sec
        );
        println!("{:>9}  {:<24} EVENT", "T+SEC", "STATE");
        for entry in &event.timeline {
            println!("{:>9.2}  {:<24} {}", entry.offset_sec, entry.state, entry.event);
        }
        println!(
            "Recovered in {:.2}s, data loss: {}",
            event.total_duration_sec, event.data_loss
        );
    } else {
        let error = response.text().await?;
        eprintln!("Failed to simulate eviction: {}", error);
    }

    Ok(())
}

/// Show running totals
pub async fn stats(client: &ApiClient) -> Result<()> {
    let response = client.client.get(client.url("/dashboard-stats")).send().await?;

    if response.status().is_success() {
        let stats: StatsResponse = response.json().await?;
        println!("Jobs managed:      {}", stats.jobs_managed);
        println!("Total saved:       ${:.2}", stats.total_saved_usd);
        println!("CO2 saved:         {:.2} kg", stats.total_co2_saved_kg);
        println!("Checkpoints saved: {}", stats.checkpoints_saved);
        println!("Evictions handled: {}", stats.evictions_handled);
        println!("Regions:           {}", stats.regions_monitored.join(", "));
    } else {
        let error = response.text().await?;
        eprintln!("Failed to get stats: {}", error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:8787/");
        assert_eq!(client.url("/simulate"), "http://localhost:8787/simulate");
    }

    #[test]
    fn test_deadline_from() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let deadline = deadline_from(now, 1.5);
        let parsed = DateTime::parse_from_rfc3339(&deadline).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now + Duration::minutes(90));
    }

    #[test]
    fn test_decode_checkpoint_response() {
        let json = r#"{"job_id":"j","region":"eu-west-1","from_zone":"eu-west-1a","to_zone":"eu-west-1b",
            "sku":"g5.xlarge","checkpoint_size_gb":11.2,"upload_duration_sec":9.33,"epoch_progress_pct":40.0,
            "timeline":[{"offset_sec":0.0,"state":"interrupt_notice_received","event":"notice"}],
            "total_duration_sec":47.33,"data_loss":"none"}"#;
        let event: CheckpointResponse = serde_json::from_str(json).unwrap();
        assert_eq!(event.timeline.len(), 1);
        assert_eq!(event.data_loss, "none");
    }
}
