//! Spot interruption and checkpoint recovery simulation
//!
//! Models the path from an interruption notice to training resuming in the
//! neighbouring zone. Nothing is measured: every offset is a fixed constant
//! plus the checkpoint upload time derived from model size and bandwidth.

use greenspot_core::{
    find_region, neighbor_zone, region_of_zone, CheckpointConfig, CheckpointEvent, GreenspotError,
    GreenspotResult, SimulationState, TimelineEntry,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::stats::RunningStats;

/// Offset at which the checkpoint upload starts
const SAVE_START_SEC: f64 = 0.5;
/// Offsets after the upload completes
const CORDON_SEC: f64 = 2.0;
const REPROVISION_SEC: f64 = 3.0;
const NODE_READY_SEC: f64 = 25.0;
const RESTORE_START_SEC: f64 = 27.0;
const RESTORED_SEC: f64 = 35.0;
const RESUMED_SEC: f64 = 38.0;

/// A running job hit by a simulated interruption
#[derive(Debug, Clone)]
pub struct EvictionRequest {
    /// Generated when empty
    pub job_id: String,
    pub region: String,
    pub zone: String,
    pub sku: String,
    pub model_size_gb: f64,
    pub epoch_progress_pct: f64,
}

/// Deterministic eviction simulator
pub struct EvictionSimulator {
    upload_bandwidth_gbps: f64,
    checkpoint_ratio: f64,
    stats: Arc<RunningStats>,
}

impl EvictionSimulator {
    pub fn new(config: &CheckpointConfig, stats: Arc<RunningStats>) -> Self {
        Self {
            upload_bandwidth_gbps: config.upload_bandwidth_gbps,
            checkpoint_ratio: config.checkpoint_ratio,
            stats,
        }
    }

    fn validate(&self, request: &EvictionRequest) -> GreenspotResult<String> {
        if !request.model_size_gb.is_finite() || request.model_size_gb <= 0.0 {
            return Err(GreenspotError::InvalidRequest(format!(
                "model_size_gb must be positive, got {}",
                request.model_size_gb
            )));
        }
        if !(0.0..=100.0).contains(&request.epoch_progress_pct) {
            return Err(GreenspotError::InvalidRequest(format!(
                "epoch_progress_pct must be within 0..=100, got {}",
                request.epoch_progress_pct
            )));
        }
        if request.sku.trim().is_empty() {
            return Err(GreenspotError::InvalidRequest(
                "current_sku must not be empty".to_string(),
            ));
        }

        let region = find_region(&request.region)
            .ok_or_else(|| GreenspotError::UnknownRegion(request.region.clone()))?;
        match region_of_zone(&request.zone) {
            Some(owner) if owner.id == region.id => {}
            _ => return Err(GreenspotError::UnknownZone(request.zone.clone())),
        }

        neighbor_zone(&request.zone).ok_or_else(|| GreenspotError::UnknownZone(request.zone.clone()))
    }

    /// Simulate an eviction and record it in the running totals
    pub fn simulate(&self, request: &EvictionRequest) -> GreenspotResult<CheckpointEvent> {
        let to_zone = self.validate(request)?;

        let checkpoint_size_gb = request.model_size_gb * self.checkpoint_ratio;
        let upload = checkpoint_size_gb / self.upload_bandwidth_gbps;
        let from = &request.zone;

        let entry = |offset_sec: f64, state: SimulationState, event: String| TimelineEntry {
            offset_sec,
            state,
            event,
        };

        let timeline = vec![
            entry(
                0.0,
                SimulationState::InterruptNoticeReceived,
                format!("Spot interruption notice for {} in {}", request.sku, from),
            ),
            entry(
                SAVE_START_SEC,
                SimulationState::CheckpointSaving,
                format!(
                    "Saving {:.1} GB checkpoint at {:.1}% of epoch",
                    checkpoint_size_gb, request.epoch_progress_pct
                ),
            ),
            entry(
                SAVE_START_SEC + upload,
                SimulationState::CheckpointSaving,
                format!("Checkpoint uploaded in {:.2}s", upload),
            ),
            entry(
                CORDON_SEC + upload,
                SimulationState::Cordoned,
                format!("Node in {} cordoned", from),
            ),
            entry(
                REPROVISION_SEC + upload,
                SimulationState::Reprovisioning,
                format!("Requesting {} in {}", request.sku, to_zone),
            ),
            entry(
                NODE_READY_SEC + upload,
                SimulationState::Reprovisioning,
                format!("Replacement node ready in {}", to_zone),
            ),
            entry(
                RESTORE_START_SEC + upload,
                SimulationState::CheckpointRestoring,
                "Restoring checkpoint".to_string(),
            ),
            entry(
                RESTORED_SEC + upload,
                SimulationState::CheckpointRestoring,
                "Checkpoint restored".to_string(),
            ),
            entry(
                RESUMED_SEC + upload,
                SimulationState::Resumed,
                format!(
                    "Training resumed in {} from {:.1}% of epoch",
                    to_zone, request.epoch_progress_pct
                ),
            ),
        ];

        let job_id = if request.job_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            request.job_id.clone()
        };

        let event = CheckpointEvent {
            job_id,
            region: request.region.clone(),
            from_zone: from.clone(),
            to_zone,
            sku: request.sku.clone(),
            checkpoint_size_gb,
            upload_duration_sec: upload,
            epoch_progress_pct: request.epoch_progress_pct,
            total_duration_sec: RESUMED_SEC + upload,
            timeline,
            data_loss: "none".to_string(),
        };

        self.stats.record_eviction();

        info!(
            job_id = %event.job_id,
            from = %event.from_zone,
            to = %event.to_zone,
            total_sec = event.total_duration_sec,
            "Simulated eviction"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> (EvictionSimulator, Arc<RunningStats>) {
        let stats = Arc::new(RunningStats::new());
        (
            EvictionSimulator::new(&CheckpointConfig::default(), Arc::clone(&stats)),
            stats,
        )
    }

    fn request(model_size_gb: f64) -> EvictionRequest {
        EvictionRequest {
            job_id: "job-42".to_string(),
            region: "eu-west-1".to_string(),
            zone: "eu-west-1a".to_string(),
            sku: "g5.xlarge".to_string(),
            model_size_gb,
            epoch_progress_pct: 63.0,
        }
    }

    #[test]
    fn test_fourteen_gb_model() {
        let (sim, _) = simulator();
        let event = sim.simulate(&request(14.0)).unwrap();

        let upload = 11.2 / 1.2;
        assert!((event.checkpoint_size_gb - 11.2).abs() < 1e-9);
        assert!((event.upload_duration_sec - 9.333).abs() < 1e-3);

        let expected = [0.0, 0.5, 0.5, 2.0, 3.0, 25.0, 27.0, 35.0, 38.0];
        for (i, (entry, constant)) in event.timeline.iter().zip(expected).enumerate() {
            let want = if i < 2 { constant } else { constant + upload };
            assert!((entry.offset_sec - want).abs() < 1e-9, "entry {}", i);
        }
    }

    #[test]
    fn test_timeline_properties() {
        let (sim, _) = simulator();
        for size in [0.5, 7.0, 70.0, 400.0] {
            let event = sim.simulate(&request(size)).unwrap();
            assert!(event
                .timeline
                .windows(2)
                .all(|w| w[0].offset_sec <= w[1].offset_sec));
            assert_eq!(
                event.total_duration_sec,
                event.timeline.last().unwrap().offset_sec
            );
            assert_eq!(event.data_loss, "none");
            assert_eq!(event.timeline.first().unwrap().state, SimulationState::InterruptNoticeReceived);
            assert_eq!(event.timeline.last().unwrap().state, SimulationState::Resumed);
        }
    }

    #[test]
    fn test_migrates_to_neighbor_zone() {
        let (sim, _) = simulator();
        let event = sim.simulate(&request(14.0)).unwrap();
        assert_eq!(event.from_zone, "eu-west-1a");
        assert_eq!(event.to_zone, "eu-west-1b");
        assert_eq!(event.job_id, "job-42");
    }

    #[test]
    fn test_records_stats_once() {
        let (sim, stats) = simulator();
        sim.simulate(&request(14.0)).unwrap();
        let snap = stats.snapshot();
        assert_eq!(snap.evictions_handled, 1);
        assert_eq!(snap.checkpoints_saved, 1);
        assert_eq!(snap.jobs_managed, 0);
    }

    #[test]
    fn test_invalid_requests() {
        let (sim, stats) = simulator();

        assert!(matches!(
            sim.simulate(&request(0.0)),
            Err(GreenspotError::InvalidRequest(_))
        ));

        let mut bad_progress = request(14.0);
        bad_progress.epoch_progress_pct = 120.0;
        assert!(matches!(
            sim.simulate(&bad_progress),
            Err(GreenspotError::InvalidRequest(_))
        ));

        let mut bad_region = request(14.0);
        bad_region.region = "moon-1".to_string();
        assert!(matches!(
            sim.simulate(&bad_region),
            Err(GreenspotError::UnknownRegion(_))
        ));

        let mut foreign_zone = request(14.0);
        foreign_zone.zone = "us-east-1a".to_string();
        assert!(matches!(
            sim.simulate(&foreign_zone),
            Err(GreenspotError::UnknownZone(_))
        ));

        assert_eq!(stats.snapshot().evictions_handled, 0);
    }

    #[test]
    fn test_generates_job_id() {
        let (sim, _) = simulator();
        let mut req = request(14.0);
        req.job_id = String::new();
        let event = sim.simulate(&req).unwrap();
        assert!(Uuid::parse_str(&event.job_id).is_ok());
    }
}
