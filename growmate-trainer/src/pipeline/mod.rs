//! Retrain pipeline
//!
//! fetch logs -> reconcile -> calculate optimal durations -> fit -> publish
//!
//! Each stage lives in its own module; [`RetrainPipeline`] wires them
//! together for one run.

pub mod calculator;
pub mod publisher;
pub mod reconciler;
pub mod trainer;

use crate::error::PipelineError;
use crate::sources::{fetch_snapshot, LogSource};
use calculator::{average_optimal_duration, calculate_optimal_durations, DurationPolicy};
use chrono::{DateTime, Utc};
use growmate_common::config::{DatabaseConfig, TrainingConfig};
use publisher::{Publisher, ReloadNotifier};
use reconciler::Reconciler;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RetrainReport {
    pub run_id: Uuid,
    pub records_used: usize,
    /// Mean derived duration, one decimal place
    pub average_optimal_duration: f64,
    pub target_moisture: f64,
    pub training_date: DateTime<Utc>,
    pub artifact_sha256: String,
}

pub struct RetrainPipeline {
    source: Arc<dyn LogSource>,
    reconciler: Box<dyn Reconciler>,
    publisher: Arc<Publisher>,
    database: DatabaseConfig,
    training: TrainingConfig,
    notifier: Option<ReloadNotifier>,
}

impl RetrainPipeline {
    pub fn new(
        source: Arc<dyn LogSource>,
        reconciler: Box<dyn Reconciler>,
        publisher: Publisher,
        database: DatabaseConfig,
        training: TrainingConfig,
    ) -> Self {
        Self {
            source,
            reconciler,
            publisher: Arc::new(publisher),
            database,
            training,
            notifier: None,
        }
    }

    /// Notify a predictor after every successful publish
    pub fn with_notifier(mut self, notifier: ReloadNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run one full retrain
    pub async fn run(&self) -> Result<RetrainReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("retrain", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RetrainReport, PipelineError> {
        info!(
            "Starting retrain from {} ({:?} reconciliation)",
            self.source.describe(),
            self.reconciler.mode()
        );

        let snapshot = fetch_snapshot(self.source.as_ref(), &self.database).await?;
        if snapshot.is_empty() {
            return Err(PipelineError::DataUnavailable);
        }

        let reconciliation = self.reconciler.reconcile(&snapshot);
        if reconciliation.rows.is_empty() {
            return Err(PipelineError::DataUnavailable);
        }

        let policy = DurationPolicy::from(&self.training);
        let (rows, summary) = calculate_optimal_durations(reconciliation.rows, &policy);
        if rows.is_empty() {
            return Err(PipelineError::NoValidRecords);
        }
        info!(
            kept = summary.kept,
            dropped = summary.input - summary.kept,
            "Derived optimal durations"
        );

        let average = average_optimal_duration(&rows).ok_or(PipelineError::NoValidRecords)?;
        let records_used = rows.len();

        // Fitting, serialization and the synced write all block
        let training = self.training.clone();
        let publisher = self.publisher.clone();
        let published = tokio::task::spawn_blocking(move || {
            let model = trainer::train_model(&rows, &training)?;
            publisher.publish(model, records_used, &policy)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Training task failed: {}", e)))??;

        if let Some(notifier) = &self.notifier {
            notifier.notify().await;
        }

        info!(
            records_used,
            average_optimal_duration = average,
            "Retrain completed"
        );

        Ok(RetrainReport {
            run_id,
            records_used,
            average_optimal_duration: average,
            target_moisture: policy.target_moisture,
            training_date: published.summary.training_date,
            artifact_sha256: published.blob.sha256,
        })
    }
}
