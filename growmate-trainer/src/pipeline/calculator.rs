//! Optimal-duration calculation
//!
//! For each reconciled row, derive the watering time that would have brought
//! the soil exactly to the target moisture, given the moisture rise per second
//! observed during the actual watering.
//!
//! Steps, in order:
//! 1. drop rows with `predicted_time <= 0` (nothing was watered)
//! 2. `rate = (moisture_after - moisture_before) / predicted_time`
//! 3. keep rows with `MIN_CHANGE_RATE < rate < MAX_CHANGE_RATE` and a moisture rise
//! 4. `optimal = max(target - moisture_before, 0) / rate`
//! 5. clamp `optimal` to `[min_duration, max_duration]`

use super::reconciler::CandidateRow;
use growmate_common::config::TrainingConfig;
use growmate_common::records::SensorLog;
use tracing::debug;

/// Lowest plausible moisture rise (% per second), exclusive
pub const MIN_CHANGE_RATE: f64 = 0.01;
/// Highest plausible moisture rise (% per second), exclusive
pub const MAX_CHANGE_RATE: f64 = 1.0;

/// Target and clamp bounds for derived durations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPolicy {
    pub target_moisture: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for DurationPolicy {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            target_moisture: config.target_moisture,
            min_duration: config.min_duration,
            max_duration: config.max_duration,
        }
    }
}

impl DurationPolicy {
    /// Same semantics as clipping with a lower then an upper bound
    fn clamp(&self, duration: f64) -> f64 {
        duration.max(self.min_duration).min(self.max_duration)
    }
}

/// A row ready for fitting
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub record_id: String,
    pub sensor: SensorLog,
    pub predicted_time: f64,
    pub moisture_after: f64,
    /// Observed moisture rise, % per second
    pub moisture_change_per_sec: f64,
    /// Seconds that would have reached the target, clamped
    pub optimal_duration: f64,
}

/// How many rows each filter removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalculationSummary {
    pub input: usize,
    pub not_watered: usize,
    pub implausible_rate: usize,
    pub kept: usize,
}

/// Observed moisture rise per second, `None` when nothing was watered
pub fn moisture_change_rate(row: &CandidateRow) -> Option<f64> {
    if row.predicted_time <= 0.0 {
        return None;
    }
    Some((row.moisture_after - row.sensor.moisture_before) / row.predicted_time)
}

/// Whether a rate and moisture rise look physically possible
pub fn is_plausible(rate: f64, moisture_before: f64, moisture_after: f64) -> bool {
    rate > MIN_CHANGE_RATE && rate < MAX_CHANGE_RATE && moisture_after > moisture_before
}

/// Derive optimal durations, dropping rows that cannot support a rate
pub fn calculate_optimal_durations(
    rows: Vec<CandidateRow>,
    policy: &DurationPolicy,
) -> (Vec<TrainingRow>, CalculationSummary) {
    let mut summary = CalculationSummary {
        input: rows.len(),
        ..Default::default()
    };
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(rate) = moisture_change_rate(&row) else {
            summary.not_watered += 1;
            continue;
        };

        if !is_plausible(rate, row.sensor.moisture_before, row.moisture_after) {
            summary.implausible_rate += 1;
            continue;
        }

        let required_increase = (policy.target_moisture - row.sensor.moisture_before).max(0.0);
        let optimal_duration = policy.clamp(required_increase / rate);

        kept.push(TrainingRow {
            record_id: row.record_id,
            sensor: row.sensor,
            predicted_time: row.predicted_time,
            moisture_after: row.moisture_after,
            moisture_change_per_sec: rate,
            optimal_duration,
        });
    }

    summary.kept = kept.len();
    debug!(
        input = summary.input,
        not_watered = summary.not_watered,
        implausible_rate = summary.implausible_rate,
        kept = summary.kept,
        "Calculated optimal durations"
    );

    (kept, summary)
}

/// Mean optimal duration rounded to one decimal place
pub fn average_optimal_duration(rows: &[TrainingRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let mean = rows.iter().map(|r| r.optimal_duration).sum::<f64>() / rows.len() as f64;
    // Halves go to the even neighbour
    Some((mean * 10.0).round_ties_even() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(moisture_before: f64, moisture_after: f64, predicted_time: f64) -> CandidateRow {
        CandidateRow {
            record_id: format!("{}-{}-{}", moisture_before, moisture_after, predicted_time),
            sensor: SensorLog {
                temperature: 22.0,
                humidity: 60.0,
                light: 10.0,
                moisture_before,
            },
            predicted_time,
            moisture_after,
        }
    }

    fn calculate(rows: Vec<CandidateRow>) -> Vec<TrainingRow> {
        calculate_optimal_durations(rows, &DurationPolicy::default()).0
    }

    #[test]
    fn test_reference_example() {
        let out = calculate(vec![row(30.0, 55.0, 50.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].moisture_change_per_sec, 0.5);
        assert_eq!(out[0].optimal_duration, 40.0);
    }

    #[test]
    fn test_zero_duration_dropped() {
        // Fields would otherwise be valid
        assert!(calculate(vec![row(30.0, 55.0, 0.0)]).is_empty());
    }

    #[test]
    fn test_negative_duration_dropped() {
        assert!(calculate(vec![row(30.0, 55.0, -5.0)]).is_empty());
    }

    #[test]
    fn test_moisture_decrease_dropped() {
        assert!(calculate(vec![row(45.0, 44.0, 10.0)]).is_empty());
    }

    #[test]
    fn test_unchanged_moisture_dropped() {
        assert!(calculate(vec![row(45.0, 45.0, 10.0)]).is_empty());
    }

    #[test]
    fn test_rate_bounds_are_exclusive() {
        // 0.5 / 50 = 0.01 exactly
        assert!(calculate(vec![row(30.0, 30.5, 50.0)]).is_empty());
        // 10 / 10 = 1.0 exactly
        assert!(calculate(vec![row(30.0, 40.0, 10.0)]).is_empty());
        // Runaway rate
        assert!(calculate(vec![row(30.0, 60.0, 2.0)]).is_empty());
        // Sluggish rate
        assert!(calculate(vec![row(30.0, 30.1, 100.0)]).is_empty());
    }

    #[test]
    fn test_clamped_to_max() {
        // rate = 1 / 50 = 0.02, required 40 -> 2000 s
        let out = calculate(vec![row(10.0, 11.0, 50.0)]);
        assert_eq!(out[0].optimal_duration, 600.0);
    }

    #[test]
    fn test_already_at_target_clamped_to_min() {
        // Above target: required increase is 0 -> 0 s -> min
        let out = calculate(vec![row(55.0, 60.0, 10.0)]);
        assert_eq!(out[0].optimal_duration, 5.0);
    }

    #[test]
    fn test_custom_policy() {
        let policy = DurationPolicy {
            target_moisture: 60.0,
            min_duration: 1.0,
            max_duration: 30.0,
        };
        let (out, _) = calculate_optimal_durations(vec![row(30.0, 55.0, 50.0)], &policy);
        // required 30 / 0.5 = 60 -> clamped to 30
        assert_eq!(out[0].optimal_duration, 30.0);
    }

    #[test]
    fn test_summary_counts() {
        let rows = vec![
            row(30.0, 55.0, 50.0),
            row(30.0, 55.0, 0.0),
            row(45.0, 44.0, 10.0),
            row(35.2, 51.8, 40.0),
        ];
        let (out, summary) = calculate_optimal_durations(rows, &DurationPolicy::default());
        assert_eq!(
            summary,
            CalculationSummary {
                input: 4,
                not_watered: 1,
                implausible_rate: 1,
                kept: 2
            }
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_every_emitted_duration_within_bounds() {
        let policy = DurationPolicy::default();
        let mut rows = Vec::new();
        for before in (0..100).step_by(7) {
            for rise in [0.2, 1.0, 3.5, 12.0, 40.0] {
                for time in [1.0, 4.0, 9.0, 33.0, 120.0, 900.0] {
                    rows.push(row(before as f64, before as f64 + rise, time));
                }
            }
        }

        let (out, summary) = calculate_optimal_durations(rows, &policy);
        assert!(summary.kept > 0);
        for r in &out {
            assert!(r.optimal_duration >= policy.min_duration, "{:?}", r);
            assert!(r.optimal_duration <= policy.max_duration, "{:?}", r);
            assert!(r.moisture_change_per_sec > MIN_CHANGE_RATE);
            assert!(r.moisture_change_per_sec < MAX_CHANGE_RATE);
            assert!(r.moisture_after > r.sensor.moisture_before);
        }
    }

    #[test]
    fn test_average_rounded() {
        let mut rows = calculate(vec![row(30.0, 55.0, 50.0), row(30.0, 55.0, 50.0)]);
        rows[1].optimal_duration = 40.37;
        assert_eq!(average_optimal_duration(&rows), Some(40.2));
        assert_eq!(average_optimal_duration(&[]), None);
    }

    #[test]
    fn test_average_half_rounds_to_even() {
        let mut rows = calculate(vec![row(30.0, 55.0, 50.0), row(30.0, 55.0, 50.0)]);
        rows[1].optimal_duration = 40.5;
        // 40.25 sits exactly on the boundary
        assert_eq!(average_optimal_duration(&rows), Some(40.2));
    }
}
