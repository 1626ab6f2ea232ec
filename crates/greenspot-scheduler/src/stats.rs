//! Process-wide running totals

use greenspot_core::StatsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-point scale for currency (micro-USD) and mass (milligrams)
const MICRO: f64 = 1_000_000.0;

fn to_micro(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        (value * MICRO).round() as u64
    } else {
        0
    }
}

/// Increment-only counters shared across requests
///
/// Every update is a single `fetch_add`, so concurrent requests never lose
/// an increment. There is no reset or decrement.
#[derive(Debug, Default)]
pub struct RunningStats {
    jobs_managed: AtomicU64,
    saved_micro_usd: AtomicU64,
    co2_saved_mg: AtomicU64,
    checkpoints_saved: AtomicU64,
    evictions_handled: AtomicU64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed decision; negative deltas count as zero
    pub fn record_decision(&self, saved_usd: f64, co2_saved_kg: f64) {
        self.jobs_managed.fetch_add(1, Ordering::Relaxed);
        self.saved_micro_usd
            .fetch_add(to_micro(saved_usd), Ordering::Relaxed);
        self.co2_saved_mg
            .fetch_add(to_micro(co2_saved_kg), Ordering::Relaxed);
    }

    /// Count one simulated eviction and the checkpoint it saved
    pub fn record_eviction(&self) {
        self.checkpoints_saved.fetch_add(1, Ordering::Relaxed);
        self.evictions_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            jobs_managed: self.jobs_managed.load(Ordering::Relaxed),
            total_saved_usd: self.saved_micro_usd.load(Ordering::Relaxed) as f64 / MICRO,
            total_co2_saved_kg: self.co2_saved_mg.load(Ordering::Relaxed) as f64 / MICRO,
            checkpoints_saved: self.checkpoints_saved.load(Ordering::Relaxed),
            evictions_handled: self.evictions_handled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(RunningStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_record_decision() {
        let stats = RunningStats::new();
        stats.record_decision(12.5, 3.25);
        stats.record_decision(0.75, 0.0);

        let snap = stats.snapshot();
        assert_eq!(snap.jobs_managed, 2);
        assert!((snap.total_saved_usd - 13.25).abs() < 1e-9);
        assert!((snap.total_co2_saved_kg - 3.25).abs() < 1e-9);
        assert_eq!(snap.evictions_handled, 0);
    }

    #[test]
    fn test_negative_deltas_do_not_decrease() {
        let stats = RunningStats::new();
        stats.record_decision(5.0, 1.0);
        stats.record_decision(-100.0, f64::NAN);

        let snap = stats.snapshot();
        assert_eq!(snap.jobs_managed, 2);
        assert!((snap.total_saved_usd - 5.0).abs() < 1e-9);
        assert!((snap.total_co2_saved_kg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_eviction() {
        let stats = RunningStats::new();
        stats.record_eviction();
        let snap = stats.snapshot();
        assert_eq!(snap.checkpoints_saved, 1);
        assert_eq!(snap.evictions_handled, 1);
        assert_eq!(snap.jobs_managed, 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let stats = Arc::new(RunningStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_decision(0.01, 0.001);
                        stats.record_eviction();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.jobs_managed, 8000);
        assert_eq!(snap.evictions_handled, 8000);
        assert_eq!(snap.checkpoints_saved, 8000);
        assert!((snap.total_saved_usd - 80.0).abs() < 1e-6);
        assert!((snap.total_co2_saved_kg - 8.0).abs() < 1e-6);
    }
}
