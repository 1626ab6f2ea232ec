//! Decision engine: snapshot assembly, placement, time-shift and reporting

use chrono::{DateTime, Utc};
use greenspot_core::{
    find_region, region_of_zone, regions, CandidateOffer, CheckpointEvent, GreenspotError,
    GreenspotResult, JobSpec, OrchestratorConfig, PlacementDecision, RegionInfo, RegionSnapshot,
    StatsSnapshot, Strategy, TimeShiftPlan, ZoneSnapshot, MAX_ESTIMATED_GPU_HOURS,
};
use greenspot_signals::SnapshotAssembler;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::eviction::{EvictionRequest, EvictionSimulator};
use crate::placement::{PlacementStrategy, ScoredPlacementStrategy, Selection};
use crate::report::{
    CheckpointPlan, CurrentPlacement, EnvironmentalImpact, FinancialAnalysis, GreenImpact,
    OptimizeReport, PlacementReport, RiskAssessment, SavingsReport,
};
use crate::scoring::Scorer;
use crate::stats::RunningStats;
use crate::timeshift::{price_curve, TimeShiftPlanner};

/// Upper bound on the checkpoint interval for an availability bucket
fn checkpoint_cap_min(offer: &CandidateOffer) -> u32 {
    use greenspot_core::Availability::*;
    match offer.availability {
        High => 30,
        Medium => 20,
        Low => 10,
        VeryLow => 5,
    }
}

fn check_gpu_hours(hours: f64) -> GreenspotResult<()> {
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_ESTIMATED_GPU_HOURS {
        return Err(GreenspotError::InvalidRequest(format!(
            "estimated_gpu_hours must be within (0, {}], got {}",
            MAX_ESTIMATED_GPU_HOURS, hours
        )));
    }
    Ok(())
}

/// Entry point for every decision
pub struct DecisionEngine {
    config: OrchestratorConfig,
    assembler: SnapshotAssembler,
    strategy: Box<dyn PlacementStrategy>,
    planner: TimeShiftPlanner,
    simulator: EvictionSimulator,
    stats: Arc<RunningStats>,
}

impl DecisionEngine {
    /// Create an engine using the scored placement strategy
    pub fn new(config: OrchestratorConfig, assembler: SnapshotAssembler) -> Self {
        let stats = Arc::new(RunningStats::new());
        Self {
            strategy: Box::new(ScoredPlacementStrategy::new(Scorer::new(
                config.scoring.clone(),
            ))),
            planner: TimeShiftPlanner::new(config.timeshift.min_price_reduction_pct),
            simulator: EvictionSimulator::new(&config.checkpoint, Arc::clone(&stats)),
            stats,
            assembler,
            config,
        }
    }

    /// Validate the configuration and wire up the configured collaborators
    pub fn from_config(config: OrchestratorConfig) -> GreenspotResult<Self> {
        config.validate()?;
        let assembler = SnapshotAssembler::from_config(&config.signals)?;
        Ok(Self::new(config, assembler))
    }

    /// Replace the placement strategy
    pub fn with_strategy(mut self, strategy: Box<dyn PlacementStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn regions_monitored(&self) -> Vec<String> {
        regions().iter().map(|r| r.id.to_string()).collect()
    }

    fn validate_job(&self, job: &JobSpec) -> GreenspotResult<()> {
        check_gpu_hours(job.estimated_gpu_hours)?;
        if !job.min_gpu_memory_gb.is_finite() || job.min_gpu_memory_gb < 0.0 {
            return Err(GreenspotError::InvalidRequest(format!(
                "min_gpu_memory_gb must be non-negative, got {}",
                job.min_gpu_memory_gb
            )));
        }
        if job.checkpoint_interval_min == 0 {
            return Err(GreenspotError::InvalidRequest(
                "checkpoint_interval_min must be at least 1".to_string(),
            ));
        }
        if let Some(region) = &job.preferred_region {
            find_region(region).ok_or_else(|| GreenspotError::UnknownRegion(region.clone()))?;
        }
        Ok(())
    }

    /// Fresh snapshots for the regions a job may run in
    async fn snapshots(&self, job: &JobSpec, now: DateTime<Utc>) -> Vec<RegionSnapshot> {
        let scanned: Vec<&RegionInfo> = regions()
            .iter()
            .filter(|r| job.preferred_region.as_deref().map_or(true, |p| r.id == p))
            .collect();
        self.assembler.assemble_all(&scanned, now).await
    }

    fn plan_for(
        &self,
        job: &JobSpec,
        snapshot: &RegionSnapshot,
        now: DateTime<Utc>,
    ) -> TimeShiftPlan {
        let prices = price_curve(snapshot.mean_spot_price().unwrap_or(0.0));
        self.planner
            .plan(job, &snapshot.region_id, &prices, &snapshot.carbon_curve, now)
    }

    fn select(&self, job: &JobSpec, snapshots: &[RegionSnapshot]) -> GreenspotResult<Selection> {
        self.strategy.select(job, snapshots)
    }

    fn checkpoint_plan(&self, job: &JobSpec, offer: &CandidateOffer) -> CheckpointPlan {
        let cap = checkpoint_cap_min(offer);
        let interval_min = job.checkpoint_interval_min.min(cap);
        let expected_checkpoints = (job.estimated_gpu_hours * 60.0 / interval_min as f64).ceil() as u32;
        let reason = if interval_min < job.checkpoint_interval_min {
            format!(
                "Shortened from {} to {} min for {} availability",
                job.checkpoint_interval_min, interval_min, offer.availability
            )
        } else {
            format!("Requested {} min interval fits {} availability", interval_min, offer.availability)
        };
        CheckpointPlan {
            interval_min,
            estimated_size_gb: offer.ram_gb * self.config.checkpoint.checkpoint_ratio,
            expected_checkpoints,
            reason,
        }
    }

    fn savings(&self, job: &JobSpec, offer: &CandidateOffer, plan: &TimeShiftPlan) -> SavingsReport {
        let economics = &self.config.economics;
        let hours = job.estimated_gpu_hours;
        let on_demand_cost_usd = offer.on_demand_price_per_hour * hours;
        let spot_cost_usd = offer.spot_price_per_hour * hours;
        let spot_savings_usd = on_demand_cost_usd - spot_cost_usd;
        let time_shift_savings_usd = if plan.recommended {
            spot_cost_usd * plan.price_reduction_pct / 100.0
        } else {
            0.0
        };
        let total_saved_usd = spot_savings_usd + time_shift_savings_usd;
        let savings_pct = if on_demand_cost_usd > 0.0 {
            total_saved_usd / on_demand_cost_usd * 100.0
        } else {
            0.0
        };

        SavingsReport {
            on_demand_cost_usd,
            spot_cost_usd,
            spot_savings_usd,
            time_shift_savings_usd,
            total_saved_usd,
            savings_pct,
            secondary_currency: economics.secondary_currency.clone(),
            total_saved_secondary: total_saved_usd * economics.usd_to_secondary,
            exchange_rate: economics.usd_to_secondary,
        }
    }

    fn energy_kwh(&self, job: &JobSpec, offer: &CandidateOffer) -> f64 {
        offer.tier.power_kwh_per_hour()
            * job.estimated_gpu_hours
            * self.config.economics.datacenter_overhead
    }

    fn green_impact(&self, job: &JobSpec, offer: &CandidateOffer, zone: &ZoneSnapshot) -> GreenImpact {
        let energy_kwh = self.energy_kwh(job, offer);
        let co2_kg = energy_kwh * zone.carbon_intensity / 1000.0;
        let worst_case_co2_kg =
            energy_kwh * self.config.economics.worst_case_intensity_g_per_kwh / 1000.0;
        GreenImpact {
            energy_kwh,
            carbon_intensity_g_per_kwh: zone.carbon_intensity,
            carbon_index: zone.carbon_index,
            co2_kg,
            worst_case_co2_kg,
            co2_saved_vs_worst_kg: worst_case_co2_kg - co2_kg,
        }
    }

    fn risk(&self, job: &JobSpec, selection: &Selection) -> RiskAssessment {
        let availability = selection.decision.offer.availability;
        let p = RiskAssessment::eviction_probability(availability);
        RiskAssessment {
            level: RiskAssessment::level_for(availability).to_string(),
            availability,
            eviction_probability_per_hour: p,
            expected_interruptions: p * job.estimated_gpu_hours,
            fallback_ready: selection.fallback.is_some(),
            fallback_zone: selection.fallback.as_ref().map(|f| f.zone.clone()),
        }
    }

    /// Choose a placement for a new job and explain it
    pub async fn decide(&self, job: &JobSpec, now: DateTime<Utc>) -> GreenspotResult<PlacementReport> {
        self.validate_job(job)?;

        let snapshots = self.snapshots(job, now).await;
        let selection = self.select(job, &snapshots)?;

        let winner = snapshots
            .iter()
            .find(|s| s.region_id == selection.decision.region)
            .ok_or_else(|| GreenspotError::Internal("selected region has no snapshot".to_string()))?;
        let zone = winner
            .zone(&selection.decision.zone)
            .ok_or_else(|| GreenspotError::Internal("selected zone has no snapshot".to_string()))?;

        let time_shift = self.plan_for(job, winner, now);
        let mut decision = selection.decision.clone();
        if time_shift.recommended {
            decision.strategy = Strategy::TimeShifted;
            decision.optimal_start_time = time_shift.window_start;
        }

        let offer = &decision.offer;
        let checkpointing = self.checkpoint_plan(job, offer);
        let savings = self.savings(job, offer, &time_shift);
        let green_impact = self.green_impact(job, offer, zone);
        let risk_assessment = self.risk(job, &selection);
        let server_path = vec![
            "greenspot-orchestrator".to_string(),
            format!("{} ({})", winner.region_id, winner.region_name),
            format!("{} ({})", zone.zone_id, zone.zone_name),
            format!("{} ({} x{})", offer.sku, offer.gpu_name, offer.gpu_count),
        ];

        self.stats
            .record_decision(savings.total_saved_usd, green_impact.co2_saved_vs_worst_kg);

        info!(
            region = %decision.region,
            zone = %decision.zone,
            sku = %offer.sku,
            score = decision.score,
            strategy = %decision.strategy,
            saved_usd = savings.total_saved_usd,
            "Placement decided"
        );

        Ok(PlacementReport {
            job_id: Uuid::new_v4(),
            fallback: selection.fallback.clone(),
            checkpointing,
            savings,
            green_impact,
            server_path,
            risk_assessment,
            time_shift,
            score_breakdown: selection.breakdown,
            candidates_evaluated: selection.candidates_evaluated,
            signal_sources: winner.sources.clone(),
            decision,
        })
    }

    /// Compare a running job's placement with the best one available now
    pub async fn optimize(
        &self,
        job: &JobSpec,
        current: &CurrentPlacement,
        now: DateTime<Utc>,
    ) -> GreenspotResult<OptimizeReport> {
        self.validate_job(job)?;
        let current_region = self.current_region(current)?;
        if let Some(price) = current.price_usd_hr {
            if !price.is_finite() || price < 0.0 {
                return Err(GreenspotError::InvalidRequest(format!(
                    "current_price_usd_hr must be non-negative, got {}",
                    price
                )));
            }
        }

        let mut open = job.clone();
        open.preferred_region = None;
        let snapshots = self.snapshots(&open, now).await;
        let selection = self.select(&open, &snapshots)?;
        let recommendation: PlacementDecision = selection.decision;

        let recommended_zone = snapshots
            .iter()
            .find(|s| s.region_id == recommendation.region)
            .and_then(|s| s.zone(&recommendation.zone))
            .ok_or_else(|| GreenspotError::Internal("selected zone has no snapshot".to_string()))?;
        let current_zone = current_region.and_then(|region| {
            let snapshot = snapshots.iter().find(|s| s.region_id == region.id)?;
            match &current.zone {
                Some(zone) => snapshot.zone(zone),
                None => snapshot.zones.first(),
            }
        });

        let offer = &recommendation.offer;
        let hours = job.estimated_gpu_hours;
        let current_price = current.price_usd_hr.unwrap_or(offer.on_demand_price_per_hour);
        let hourly_savings_usd = current_price - offer.spot_price_per_hour;
        let total_savings_usd = hourly_savings_usd * hours;
        let savings_pct = if current_price > 0.0 {
            hourly_savings_usd / current_price * 100.0
        } else {
            0.0
        };

        let economics = &self.config.economics;
        let financial_analysis = FinancialAnalysis {
            current_price_usd_hr: current_price,
            recommended_price_usd_hr: offer.spot_price_per_hour,
            hourly_savings_usd,
            total_savings_usd,
            savings_pct,
            secondary_currency: economics.secondary_currency.clone(),
            total_savings_secondary: total_savings_usd * economics.usd_to_secondary,
        };

        let energy_kwh = self.energy_kwh(job, offer);
        let recommended_intensity = recommended_zone.carbon_intensity;
        let current_intensity = current_zone.map_or(recommended_intensity, |z| z.carbon_intensity);
        let current_co2_kg = energy_kwh * current_intensity / 1000.0;
        let recommended_co2_kg = energy_kwh * recommended_intensity / 1000.0;
        let environmental_impact = EnvironmentalImpact {
            current_intensity_g_per_kwh: current_intensity,
            recommended_intensity_g_per_kwh: recommended_intensity,
            current_co2_kg,
            recommended_co2_kg,
            co2_saved_kg: current_co2_kg - recommended_co2_kg,
        };

        let same_zone = current.zone.as_deref() == Some(recommendation.zone.as_str());
        let threshold = economics.switch_threshold_pct;
        let should_switch = savings_pct >= threshold && !same_zone;
        let switch_reason = if same_zone {
            format!("Job already runs in the best zone {}", recommendation.zone)
        } else if should_switch {
            format!(
                "Moving to {} saves {:.1}% (${:.2} over {:.1}h), at or above the {:.1}% threshold",
                recommendation.zone, savings_pct, total_savings_usd, hours, threshold
            )
        } else {
            format!(
                "Saving of {:.1}% is below the {:.1}% threshold; stay in place",
                savings_pct, threshold
            )
        };

        let reason = recommendation.reason.clone();

        let (saved, co2_saved) = if should_switch {
            (total_savings_usd, environmental_impact.co2_saved_kg)
        } else {
            (0.0, 0.0)
        };
        self.stats.record_decision(saved, co2_saved);

        info!(
            recommended_zone = %recommendation.zone,
            current_zone = current.zone.as_deref().unwrap_or("-"),
            savings_pct,
            should_switch,
            "Optimization evaluated"
        );

        Ok(OptimizeReport {
            recommendation,
            financial_analysis,
            environmental_impact,
            reason,
            should_switch,
            switch_reason,
        })
    }

    /// Resolve and validate the region and zone a job currently runs in
    fn current_region(&self, current: &CurrentPlacement) -> GreenspotResult<Option<&'static RegionInfo>> {
        let region = match &current.region {
            Some(id) => Some(find_region(id).ok_or_else(|| GreenspotError::UnknownRegion(id.clone()))?),
            None => None,
        };
        match (&current.zone, region) {
            (Some(zone), Some(region)) => match region_of_zone(zone) {
                Some(owner) if owner.id == region.id => Ok(Some(region)),
                _ => Err(GreenspotError::UnknownZone(zone.clone())),
            },
            (Some(zone), None) => region_of_zone(zone)
                .map(Some)
                .ok_or_else(|| GreenspotError::UnknownZone(zone.clone())),
            (None, region) => Ok(region),
        }
    }

    /// Plan the start of a job in one region without placing it
    ///
    /// Uses the job's preferred region, else `region`, else the configured default.
    pub async fn plan_time_shift(
        &self,
        job: &JobSpec,
        region: Option<&str>,
        now: DateTime<Utc>,
    ) -> GreenspotResult<TimeShiftPlan> {
        check_gpu_hours(job.estimated_gpu_hours)?;

        let region_id = job
            .preferred_region
            .as_deref()
            .or(region)
            .unwrap_or(self.config.economics.default_region.as_str());
        let info = find_region(region_id)
            .ok_or_else(|| GreenspotError::UnknownRegion(region_id.to_string()))?;

        let snapshot = self.assembler.assemble(info, now).await;
        let plan = self.plan_for(job, &snapshot, now);

        info!(
            region = %plan.region,
            recommended = plan.recommended,
            delay_hours = plan.delay_hours,
            "Time shift planned"
        );
        Ok(plan)
    }

    /// Simulate an eviction of a running job
    pub fn simulate_eviction(&self, request: &EvictionRequest) -> GreenspotResult<CheckpointEvent> {
        self.simulator.simulate(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn engine() -> DecisionEngine {
        DecisionEngine::new(OrchestratorConfig::default(), SnapshotAssembler::offline())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap()
    }

    fn job(min_mem: f64, hours: f64, deadline_hours: i64) -> JobSpec {
        JobSpec::new(min_mem, hours, now() + Duration::hours(deadline_hours))
    }

    #[tokio::test]
    async fn test_decide_meets_memory_and_records_once() {
        let engine = engine();
        let report = engine.decide(&job(40.0, 24.0, 48), now()).await.unwrap();

        assert!(report.decision.offer.ram_gb >= 40.0);
        assert_eq!(report.server_path.len(), 4);
        assert!(report.savings.spot_savings_usd > 0.0);
        assert!(report.green_impact.co2_kg > 0.0);
        assert!(report.checkpointing.interval_min <= 30);
        assert_eq!(report.candidates_evaluated > 1, report.fallback.is_some());

        let stats = engine.stats();
        assert_eq!(stats.jobs_managed, 1);
        assert!(stats.total_saved_usd > 0.0);
    }

    #[tokio::test]
    async fn test_decide_strategy_follows_time_shift() {
        let engine = engine();
        let report = engine.decide(&job(16.0, 4.0, 24), now()).await.unwrap();

        assert_eq!(report.time_shift.region, report.decision.region);
        if report.time_shift.recommended {
            assert_eq!(report.decision.strategy, Strategy::TimeShifted);
            assert_eq!(report.decision.optimal_start_time, report.time_shift.window_start);
            assert!(report.savings.time_shift_savings_usd > 0.0);
        } else {
            assert_eq!(report.decision.strategy, Strategy::Immediate);
            assert!(report.decision.optimal_start_time.is_none());
        }
    }

    #[tokio::test]
    async fn test_evening_flexible_job_is_time_shifted() {
        // Offline weather is flat, so only the diurnal price shape matters
        let report = engine().decide(&job(16.0, 4.0, 24), now()).await.unwrap();
        assert!(report.time_shift.recommended);
        assert_eq!(report.decision.strategy, Strategy::TimeShifted);
    }

    #[tokio::test]
    async fn test_decide_respects_preferred_region() {
        let mut spec = job(16.0, 8.0, 48);
        spec.preferred_region = Some("ap-south-1".to_string());
        let report = engine().decide(&spec, now()).await.unwrap();
        assert_eq!(report.decision.region, "ap-south-1");
        assert!(report.decision.zone.starts_with("ap-south-1"));
    }

    #[tokio::test]
    async fn test_decide_errors() {
        let engine = engine();

        let result = engine.decide(&job(1024.0, 8.0, 48), now()).await;
        assert!(matches!(result, Err(GreenspotError::NoSuitableOfferFound(_))));

        let result = engine.decide(&job(16.0, 0.0, 48), now()).await;
        assert!(matches!(result, Err(GreenspotError::InvalidRequest(_))));

        let result = engine.decide(&job(16.0, 1e12, 48), now()).await;
        assert!(matches!(result, Err(GreenspotError::InvalidRequest(_))));

        let mut spec = job(16.0, 8.0, 48);
        spec.preferred_region = Some("atlantis-1".to_string());
        let result = engine.decide(&spec, now()).await;
        assert!(matches!(result, Err(GreenspotError::UnknownRegion(_))));

        assert_eq!(engine.stats().jobs_managed, 0);
    }

    #[tokio::test]
    async fn test_plan_time_shift_infeasible() {
        let plan = engine()
            .plan_time_shift(&job(0.0, 5.0, 1), None, now())
            .await
            .unwrap();
        assert_eq!(plan.region, "eu-north-1");
        assert!(!plan.recommended);
        assert!(!plan.meets_deadline);
    }

    #[tokio::test]
    async fn test_plan_time_shift_rejects_oversized_job() {
        let result = engine()
            .plan_time_shift(&job(0.0, 1e12, 1), None, now())
            .await;
        assert!(matches!(result, Err(GreenspotError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_plan_time_shift_region_choice() {
        let engine = engine();
        let plan = engine
            .plan_time_shift(&job(0.0, 2.0, 24), Some("us-west-2"), now())
            .await
            .unwrap();
        assert_eq!(plan.region, "us-west-2");

        let result = engine.plan_time_shift(&job(0.0, 2.0, 24), Some("nowhere"), now()).await;
        assert!(matches!(result, Err(GreenspotError::UnknownRegion(_))));
    }

    #[tokio::test]
    async fn test_optimize_from_on_demand() {
        let engine = engine();
        let current = CurrentPlacement {
            region: Some("us-east-1".to_string()),
            zone: Some("us-east-1a".to_string()),
            price_usd_hr: None,
        };
        let report = engine.optimize(&job(16.0, 10.0, 48), &current, now()).await.unwrap();

        let offer = &report.recommendation.offer;
        assert_eq!(report.financial_analysis.current_price_usd_hr, offer.on_demand_price_per_hour);
        assert!(report.financial_analysis.savings_pct > 10.0);
        assert_eq!(report.should_switch, report.recommendation.zone != "us-east-1a");
        assert_eq!(engine.stats().jobs_managed, 1);
    }

    #[tokio::test]
    async fn test_optimize_cheap_current_stays() {
        let current = CurrentPlacement {
            region: Some("eu-west-1".to_string()),
            zone: None,
            price_usd_hr: Some(0.01),
        };
        let report = engine().optimize(&job(16.0, 10.0, 48), &current, now()).await.unwrap();
        assert!(!report.should_switch);
        assert!(report.financial_analysis.hourly_savings_usd < 0.0);
        assert!(report.switch_reason.contains("below"));
    }

    #[tokio::test]
    async fn test_optimize_validates_current_placement() {
        let engine = engine();
        let current = CurrentPlacement {
            region: Some("eu-west-1".to_string()),
            zone: Some("us-east-1b".to_string()),
            price_usd_hr: None,
        };
        let result = engine.optimize(&job(16.0, 10.0, 48), &current, now()).await;
        assert!(matches!(result, Err(GreenspotError::UnknownZone(_))));
    }

    #[test]
    fn test_simulate_eviction_updates_shared_stats() {
        let engine = engine();
        let event = engine
            .simulate_eviction(&EvictionRequest {
                job_id: "j".to_string(),
                region: "us-west-2".to_string(),
                zone: "us-west-2c".to_string(),
                sku: "g5.xlarge".to_string(),
                model_size_gb: 14.0,
                epoch_progress_pct: 10.0,
            })
            .unwrap();
        assert_eq!(event.to_zone, "us-west-2a");
        assert_eq!(engine.stats().evictions_handled, 1);
    }

    #[test]
    fn test_regions_monitored() {
        let monitored = engine().regions_monitored();
        assert_eq!(monitored.len(), 6);
        assert_eq!(monitored[0], "eu-north-1");
    }
}
