//! Placement selection over region snapshots

use greenspot_core::{
    CandidateOffer, Fallback, GreenspotError, GreenspotResult, JobSpec, PlacementDecision,
    RegionSnapshot, Strategy, ZoneSnapshot,
};
use tracing::{debug, trace};

use crate::scoring::{ScoreBreakdown, Scorer, ZoneSignals};

/// Best and second-best placement from one scan
#[derive(Debug, Clone)]
pub struct Selection {
    pub decision: PlacementDecision,
    pub fallback: Option<Fallback>,
    pub breakdown: ScoreBreakdown,
    /// Offers that passed the memory constraint and were scored
    pub candidates_evaluated: usize,
}

/// Strategy for choosing a placement among scanned regions
pub trait PlacementStrategy: Send + Sync {
    /// Pick the primary placement and a fallback for a job
    fn select(&self, job: &JobSpec, snapshots: &[RegionSnapshot]) -> GreenspotResult<Selection>;
}

struct Candidate<'a> {
    region: &'a RegionSnapshot,
    zone: &'a ZoneSnapshot,
    offer: &'a CandidateOffer,
    breakdown: ScoreBreakdown,
}

impl Candidate<'_> {
    fn score(&self) -> f64 {
        self.breakdown.total
    }
}

/// Default strategy: lowest multi-objective score wins
///
/// Regions, zones and offers are scanned in snapshot order and compared with
/// a strict `<`, so ties go to the first candidate encountered.
pub struct ScoredPlacementStrategy {
    scorer: Scorer,
}

impl ScoredPlacementStrategy {
    /// Create a strategy using the given scorer
    pub fn new(scorer: Scorer) -> Self {
        Self { scorer }
    }
}

impl Default for ScoredPlacementStrategy {
    fn default() -> Self {
        Self::new(Scorer::default())
    }
}

fn decision_reason(c: &Candidate<'_>) -> String {
    format!(
        "{} x{} in {} ({}): ${:.3}/h spot, {:.0}% below on-demand; {:.0} gCO2/kWh ({} carbon); {} availability; {:.0}°C, {:.0} km/h wind; score {:.4}",
        c.offer.gpu_name,
        c.offer.gpu_count,
        c.zone.zone_name,
        c.region.region_id,
        c.offer.spot_price_per_hour,
        c.offer.savings_pct,
        c.zone.carbon_intensity,
        c.zone.carbon_index,
        c.offer.availability,
        c.zone.temperature_c,
        c.zone.wind_kmh,
        c.score()
    )
}

fn fallback_reason(c: &Candidate<'_>) -> String {
    format!(
        "Runner-up: {} in {} at ${:.3}/h spot, {:.0} gCO2/kWh, {} availability; score {:.4}",
        c.offer.sku,
        c.zone.zone_id,
        c.offer.spot_price_per_hour,
        c.zone.carbon_intensity,
        c.offer.availability,
        c.score()
    )
}

impl PlacementStrategy for ScoredPlacementStrategy {
    fn select(&self, job: &JobSpec, snapshots: &[RegionSnapshot]) -> GreenspotResult<Selection> {
        let mut best: Option<Candidate<'_>> = None;
        let mut fallback: Option<Candidate<'_>> = None;
        let mut evaluated = 0usize;

        let regions = snapshots.iter().filter(|s| {
            job.preferred_region
                .as_deref()
                .map_or(true, |preferred| s.region_id == preferred)
        });

        for region in regions {
            for zone in &region.zones {
                let signals = ZoneSignals::from(zone);
                for offer in zone.offers.iter().filter(|o| o.ram_gb >= job.min_gpu_memory_gb) {
                    let candidate = Candidate {
                        region,
                        zone,
                        offer,
                        breakdown: self.scorer.breakdown(offer, &signals),
                    };
                    evaluated += 1;

                    trace!(
                        region = %region.region_id,
                        zone = %zone.zone_id,
                        sku = %offer.sku,
                        score = candidate.score(),
                        "Scored candidate"
                    );

                    match &best {
                        None => best = Some(candidate),
                        Some(current) if candidate.score() < current.score() => {
                            fallback = best.replace(candidate);
                        }
                        Some(_) => {
                            let beats_fallback = fallback
                                .as_ref()
                                .map_or(true, |f| candidate.score() < f.score());
                            if beats_fallback {
                                fallback = Some(candidate);
                            }
                        }
                    }
                }
            }
        }

        let best = best.ok_or_else(|| {
            let scope = job
                .preferred_region
                .as_deref()
                .map_or_else(|| "any region".to_string(), |r| format!("region {}", r));
            GreenspotError::NoSuitableOfferFound(format!(
                "no offer with at least {} GB GPU memory in {}",
                job.min_gpu_memory_gb, scope
            ))
        })?;

        debug!(
            region = %best.region.region_id,
            zone = %best.zone.zone_id,
            sku = %best.offer.sku,
            score = best.score(),
            evaluated,
            "Selected placement"
        );

        let decision = PlacementDecision {
            region: best.region.region_id.clone(),
            zone: best.zone.zone_id.clone(),
            offer: best.offer.clone(),
            score: best.score(),
            strategy: Strategy::Immediate,
            optimal_start_time: None,
            reason: decision_reason(&best),
        };

        let fallback = fallback.map(|f| Fallback {
            region: f.region.region_id.clone(),
            zone: f.zone.zone_id.clone(),
            sku: f.offer.sku.clone(),
            score: f.score(),
            reason: fallback_reason(&f),
        });

        Ok(Selection {
            decision,
            fallback,
            breakdown: best.breakdown,
            candidates_evaluated: evaluated,
        })
    }
}
