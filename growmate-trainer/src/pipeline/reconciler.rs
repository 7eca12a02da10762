//! Record reconciliation
//!
//! Turns the raw sensor and outcome collections into candidate training rows.
//! A record that cannot be used is skipped with a warning naming its id and
//! the reason; the batch always completes.

use crate::sources::LogSnapshot;
use growmate_common::config::ReconcileMode;
use growmate_common::records::{FlatRecord, OutcomeLog, RecordError, SensorLog};
use tracing::{debug, info, warn};

/// Sensor conditions joined with the outcome of the watering they led to
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    /// Id of the record the row came from (outcome id, or `collection/id` when flattened)
    pub record_id: String,
    pub sensor: SensorLog,
    pub predicted_time: f64,
    pub moisture_after: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub rows: Vec<CandidateRow>,
    pub skipped: usize,
    /// Well-formed records that carry no watering (flattened mode only)
    pub unwatered: usize,
}

impl Reconciliation {
    fn accept(&mut self, row: CandidateRow) {
        self.rows.push(row);
    }

    fn skip(&mut self, record_id: &str, reason: &RecordError) {
        warn!("Skipping record {}: {}", record_id, reason);
        self.skipped += 1;
    }
}

/// Produces candidate rows from one log snapshot
pub trait Reconciler: Send + Sync {
    fn reconcile(&self, snapshot: &LogSnapshot) -> Reconciliation;

    fn mode(&self) -> ReconcileMode;
}

/// Build the reconciler for a configured source shape
pub fn reconciler_for(mode: ReconcileMode) -> Box<dyn Reconciler> {
    match mode {
        ReconcileMode::Joined => Box::new(JoinedReconciler),
        ReconcileMode::Flattened => Box::new(FlattenedReconciler),
    }
}

/// Outcome logs point at their sensor log through `sensor_log_id`
pub struct JoinedReconciler;

impl JoinedReconciler {
    fn join(snapshot: &LogSnapshot, outcome_id: &str, raw: &serde_json::Value) -> Result<CandidateRow, RecordError> {
        let outcome = OutcomeLog::from_raw(raw)?;
        let sensor_raw = snapshot
            .sensor_logs
            .get(&outcome.sensor_log_id)
            .ok_or_else(|| RecordError::MissingSensorLog(outcome.sensor_log_id.clone()))?;
        let sensor = SensorLog::from_raw(sensor_raw)?;

        Ok(CandidateRow {
            record_id: outcome_id.to_string(),
            sensor,
            predicted_time: outcome.predicted_time,
            moisture_after: outcome.moisture_after,
        })
    }
}

impl Reconciler for JoinedReconciler {
    fn reconcile(&self, snapshot: &LogSnapshot) -> Reconciliation {
        let mut result = Reconciliation::default();

        for (outcome_id, raw) in &snapshot.outcome_logs {
            match Self::join(snapshot, outcome_id, raw) {
                Ok(row) => result.accept(row),
                Err(reason) => result.skip(outcome_id, &reason),
            }
        }

        info!(
            accepted = result.rows.len(),
            skipped = result.skipped,
            "Joined outcome logs with sensor logs"
        );
        result
    }

    fn mode(&self) -> ReconcileMode {
        ReconcileMode::Joined
    }
}

/// Every record in either collection is self-contained
pub struct FlattenedReconciler;

impl Reconciler for FlattenedReconciler {
    fn reconcile(&self, snapshot: &LogSnapshot) -> Reconciliation {
        let mut result = Reconciliation::default();

        let collections = [
            (&snapshot.sensor_collection, &snapshot.sensor_logs),
            (&snapshot.outcome_collection, &snapshot.outcome_logs),
        ];

        for (collection, records) in collections {
            for (id, raw) in records {
                let record_id = format!("{}/{}", collection, id);
                match FlatRecord::from_raw(raw) {
                    // Records without a watering never count as training data
                    Ok(flat) if flat.predicted_time <= 0.0 => {
                        debug!("Ignoring unwatered record {}", record_id);
                        result.unwatered += 1;
                    }
                    Ok(flat) => result.accept(CandidateRow {
                        record_id,
                        sensor: flat.sensor,
                        predicted_time: flat.predicted_time,
                        moisture_after: flat.moisture_after,
                    }),
                    Err(reason) => result.skip(&record_id, &reason),
                }
            }
        }

        info!(
            accepted = result.rows.len(),
            skipped = result.skipped,
            unwatered = result.unwatered,
            "Read flattened log records"
        );
        result
    }

    fn mode(&self) -> ReconcileMode {
        ReconcileMode::Flattened
    }
}
