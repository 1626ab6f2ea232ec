//! Deadline-bounded time-shift planning
//!
//! Searches every whole-hour start offset that still lets the job finish
//! before its deadline and picks the cheapest window. Carbon is reported for
//! the chosen window but does not take part in the selection.

use chrono::{DateTime, Duration, Timelike, Utc};
use greenspot_core::{JobSpec, TimeShiftPlan};
use tracing::debug;

/// Spot demand multiplier by UTC hour of day
///
/// Night trough around 02:00-04:00, business-hours plateau and an evening
/// peak around 18:00.
pub const DIURNAL_PRICE_SHAPE: [f64; 24] = [
    0.82, 0.80, 0.78, 0.78, 0.79, 0.82, 0.88, 0.95, 1.02, 1.08, 1.12, 1.15, 1.16, 1.15, 1.13,
    1.12, 1.14, 1.18, 1.22, 1.20, 1.12, 1.02, 0.93, 0.86,
];

/// Hourly price curve from a region's mean spot price
pub fn price_curve(mean_spot_price: f64) -> [f64; 24] {
    DIURNAL_PRICE_SHAPE.map(|m| mean_spot_price * m)
}

fn at_hour(curve: &[f64], hour: usize) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    curve[hour % curve.len()]
}

/// Sum of `len` consecutive hours, whole days folded into one pass
fn window_sum(curve: &[f64], start_hour: usize, len: usize) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let full_days = len / curve.len();
    let partial: f64 = (0..len % curve.len())
        .map(|h| at_hour(curve, start_hour + h))
        .sum();
    full_days as f64 * curve.iter().sum::<f64>() + partial
}

fn window_mean(curve: &[f64], start_hour: usize, len: usize) -> f64 {
    window_sum(curve, start_hour, len) / len as f64
}

fn reduction_pct(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before * 100.0
    } else {
        0.0
    }
}

fn job_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Planner holding the recommendation policy
#[derive(Debug, Clone)]
pub struct TimeShiftPlanner {
    min_price_reduction_pct: f64,
}

impl TimeShiftPlanner {
    /// A delayed start is only recommended above `min_price_reduction_pct`
    pub fn new(min_price_reduction_pct: f64) -> Self {
        Self {
            min_price_reduction_pct,
        }
    }

    pub fn min_price_reduction_pct(&self) -> f64 {
        self.min_price_reduction_pct
    }

    /// Plan the start of `job` in `region` against hourly curves indexed by UTC hour
    ///
    /// Never fails: an infeasible deadline yields a plan with
    /// `meets_deadline == false`.
    pub fn plan(
        &self,
        job: &JobSpec,
        region: &str,
        price_curve: &[f64],
        carbon_curve: &[f64],
        now: DateTime<Utc>,
    ) -> TimeShiftPlan {
        let job_hours = job.estimated_gpu_hours;
        let hours_until_deadline = (job.deadline - now).num_milliseconds() as f64 / 3_600_000.0;
        let window_len = (job_hours.ceil() as usize).max(1);
        let now_hour = now.hour() as usize;

        let price_now = window_mean(price_curve, now_hour, window_len);

        if hours_until_deadline < job_hours {
            debug!(
                region,
                hours_until_deadline, job_hours, "Deadline tighter than job duration"
            );
            return TimeShiftPlan {
                region: region.to_string(),
                recommended: false,
                window_start: None,
                window_end: None,
                delay_hours: 0,
                reason: format!(
                    "Deadline is {:.1}h away but the job needs {:.1}h; no window can meet it, start immediately",
                    hours_until_deadline.max(0.0),
                    job_hours
                ),
                price_now,
                price_at_window: price_now,
                price_reduction_pct: 0.0,
                carbon_reduction_pct: 0.0,
                meets_deadline: false,
            };
        }

        // Curves repeat daily, so offsets past 23h cannot find a cheaper window
        let max_offset = ((hours_until_deadline - job_hours).floor() as usize).min(23);

        let mut best_offset = 0usize;
        let mut best_cost = f64::INFINITY;
        for offset in 0..=max_offset {
            let cost = window_sum(price_curve, now_hour + offset, window_len);
            if cost < best_cost {
                best_cost = cost;
                best_offset = offset;
            }
        }

        let price_at_window = window_mean(price_curve, now_hour + best_offset, window_len);
        let price_reduction_pct = reduction_pct(price_now, price_at_window);
        let carbon_reduction_pct = reduction_pct(
            window_mean(carbon_curve, now_hour, window_len),
            window_mean(carbon_curve, now_hour + best_offset, window_len),
        );

        let above_threshold = price_reduction_pct > self.min_price_reduction_pct;
        let recommended = job.flexible && best_offset > 0 && above_threshold;

        let window_start = now + Duration::hours(best_offset as i64);
        let reason = if recommended {
            format!(
                "Delay {}h to {:02}:00 UTC: ${:.3}/h vs ${:.3}/h now ({:.1}% cheaper), carbon {:.1}% lower",
                best_offset,
                window_start.hour(),
                price_at_window,
                price_now,
                price_reduction_pct,
                carbon_reduction_pct
            )
        } else if best_offset == 0 {
            "Starting now is already the cheapest window before the deadline".to_string()
        } else if !job.flexible {
            format!(
                "Job is not flexible; a window {}h later would be {:.1}% cheaper",
                best_offset, price_reduction_pct
            )
        } else {
            format!(
                "Best window {}h later is only {:.1}% cheaper, below the {:.1}% threshold",
                best_offset, price_reduction_pct, self.min_price_reduction_pct
            )
        };

        debug!(
            region,
            best_offset, price_reduction_pct, recommended, "Planned time shift"
        );

        let (window_start, window_end, delay_hours) = if recommended {
            (
                Some(window_start),
                Some(window_start + job_duration(job_hours)),
                best_offset as u32,
            )
        } else {
            (None, None, 0)
        };

        TimeShiftPlan {
            region: region.to_string(),
            recommended,
            window_start,
            window_end,
            delay_hours,
            reason,
            price_now,
            price_at_window,
            price_reduction_pct,
            carbon_reduction_pct,
            meets_deadline: true,
        }
    }
}

impl Default for TimeShiftPlanner {
    fn default() -> Self {
        Self::new(5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
    }

    fn job(hours: f64, deadline: DateTime<Utc>) -> JobSpec {
        JobSpec::new(16.0, hours, deadline)
    }

    fn flat_carbon() -> Vec<f64> {
        vec![200.0; 24]
    }

    #[test]
    fn test_infeasible_deadline() {
        let now = at(12);
        let plan = TimeShiftPlanner::default().plan(
            &job(5.0, now + Duration::hours(1)),
            "eu-west-1",
            &price_curve(1.0),
            &flat_carbon(),
            now,
        );
        assert!(!plan.recommended);
        assert!(!plan.meets_deadline);
        assert!(plan.window_start.is_none());
        assert!(plan.reason.contains("start immediately"));
    }

    #[test]
    fn test_infeasible_regardless_of_curve() {
        let now = at(18);
        let mut steep = [10.0; 24];
        steep[3] = 0.01;
        let plan = TimeShiftPlanner::new(0.0).plan(
            &job(3.0, now + Duration::minutes(150)),
            "r",
            &steep,
            &flat_carbon(),
            now,
        );
        assert!(!plan.recommended);
        assert!(!plan.meets_deadline);
    }

    #[test]
    fn test_evening_job_shifts_to_night() {
        let now = at(17);
        let deadline = now + Duration::hours(24);
        let plan = TimeShiftPlanner::default().plan(
            &job(4.0, deadline),
            "eu-north-1",
            &price_curve(1.0),
            &flat_carbon(),
            now,
        );

        assert!(plan.recommended);
        assert!(plan.meets_deadline);
        // 01:00-04:59 is the cheapest four-hour block
        assert_eq!(plan.delay_hours, 8);
        let start = plan.window_start.unwrap();
        let end = plan.window_end.unwrap();
        assert_eq!(start.hour(), 1);
        assert_eq!(end - start, Duration::hours(4));
        assert!(end <= deadline);
        assert!(plan.price_at_window < plan.price_now);
        assert!(plan.price_reduction_pct > 5.0);
    }

    #[test]
    fn test_fractional_job_window_end() {
        let now = at(17);
        let deadline = now + Duration::hours(30);
        let plan = TimeShiftPlanner::default().plan(
            &job(2.5, deadline),
            "r",
            &price_curve(0.5),
            &flat_carbon(),
            now,
        );
        assert!(plan.recommended);
        let start = plan.window_start.unwrap();
        assert_eq!(plan.window_end.unwrap() - start, Duration::minutes(150));
        assert!(plan.window_end.unwrap() <= deadline);
    }

    #[test]
    fn test_inflexible_job_not_recommended() {
        let now = at(17);
        let mut spec = job(4.0, now + Duration::hours(24));
        spec.flexible = false;
        let plan =
            TimeShiftPlanner::default().plan(&spec, "r", &price_curve(1.0), &flat_carbon(), now);
        assert!(!plan.recommended);
        assert!(plan.meets_deadline);
        assert!(plan.price_reduction_pct > 5.0);
        assert!(plan.window_start.is_none());
    }

    #[test]
    fn test_marginal_gain_below_threshold() {
        let now = at(0);
        let plan = TimeShiftPlanner::default().plan(
            &job(1.0, now + Duration::hours(6)),
            "r",
            &price_curve(1.0),
            &flat_carbon(),
            now,
        );
        // 0.82 -> 0.78 is under 5%
        assert!(!plan.recommended);
        assert!(plan.meets_deadline);
        assert!(plan.price_reduction_pct > 0.0 && plan.price_reduction_pct < 5.0);
    }

    #[test]
    fn test_tight_deadline_limits_search() {
        let now = at(17);
        let plan = TimeShiftPlanner::default().plan(
            &job(4.0, now + Duration::hours(4)),
            "r",
            &price_curve(1.0),
            &flat_carbon(),
            now,
        );
        assert!(!plan.recommended);
        assert!(plan.meets_deadline);
        assert_eq!(plan.price_reduction_pct, 0.0);
    }

    #[test]
    fn test_carbon_reported_not_selected() {
        let now = at(17);
        let mut carbon = vec![100.0; 24];
        // Night is dirtier, but selection stays price-only
        for h in 0..6 {
            carbon[h] = 300.0;
        }
        let plan = TimeShiftPlanner::default().plan(
            &job(4.0, now + Duration::hours(24)),
            "r",
            &price_curve(1.0),
            &carbon,
            now,
        );
        assert!(plan.recommended);
        assert!(plan.carbon_reduction_pct < 0.0);
    }

    #[test]
    fn test_huge_job_plans_in_constant_time() {
        let now = at(12);
        let started = std::time::Instant::now();
        let plan = TimeShiftPlanner::default().plan(
            &job(1e12, now + Duration::hours(1)),
            "r",
            &price_curve(1.0),
            &flat_carbon(),
            now,
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert!(!plan.recommended);
        assert!(!plan.meets_deadline);
        // Whole days average to the daily mean
        let daily_mean = price_curve(1.0).iter().sum::<f64>() / 24.0;
        assert!((plan.price_now - daily_mean).abs() < 1e-6);
    }

    #[test]
    fn test_multi_day_window_sum() {
        let curve = price_curve(1.0);
        let daily: f64 = curve.iter().sum();
        let naive: f64 = (0..53).map(|h| curve[(17 + h) % 24]).sum();
        assert!((window_sum(&curve, 17, 53) - naive).abs() < 1e-9);
        assert!((window_sum(&curve, 5, 48) - 2.0 * daily).abs() < 1e-9);
        assert_eq!(window_sum(&[], 0, 10), 0.0);
    }

    #[test]
    fn test_price_curve_shape() {
        let curve = price_curve(2.0);
        assert_eq!(curve.len(), 24);
        assert!((curve[18] - 2.44).abs() < 1e-9);
        let min = curve.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((min - 1.56).abs() < 1e-9);
    }
}
