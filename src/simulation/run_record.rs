//! Production Run - one completed, immutable coating run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::quality::{QualityGrade, QualityMetrics};
use super::sensors::{channel_series, SensorReading};
use super::setup::SetupParams;

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run finished and produced a part.
    Completed,
    /// Run was aborted after a defect.
    Failed,
}

/// Production Run aggregates setup, time series and quality outcome.
///
/// Created once by the orchestrator and never mutated afterwards. The
/// reading sequence is skipped when serializing; use the run store's
/// timeseries accessor for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRun {
    id: String,
    batch_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: RunStatus,
    is_ood: bool,
    setup_params: SetupParams,
    #[serde(skip)]
    sensor_readings: Vec<SensorReading>,
    quality_metrics: QualityMetrics,
    quality_grade: QualityGrade,
}

impl ProductionRun {
    /// Create a builder with the identifying fields.
    #[must_use]
    pub fn builder(id: impl Into<String>, batch_id: impl Into<String>) -> ProductionRunBuilder {
        ProductionRunBuilder::new(id, batch_id)
    }

    /// Run identifier, unique within a collection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Powder batch identifier.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Run start.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Run end.
    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Final status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Whether the run was deliberately perturbed out of distribution.
    #[must_use]
    pub const fn is_ood(&self) -> bool {
        self.is_ood
    }

    /// Setup parameters.
    #[must_use]
    pub const fn setup_params(&self) -> &SetupParams {
        &self.setup_params
    }

    /// Ordered reading sequence.
    #[must_use]
    pub fn sensor_readings(&self) -> &[SensorReading] {
        &self.sensor_readings
    }

    /// Quality outcome.
    #[must_use]
    pub const fn quality_metrics(&self) -> &QualityMetrics {
        &self.quality_metrics
    }

    /// Quality grade (derived from the metrics).
    #[must_use]
    pub const fn quality_grade(&self) -> QualityGrade {
        self.quality_grade
    }

    /// One channel across the whole run.
    #[must_use]
    pub fn channel_values(&self, channel: Channel) -> Vec<f64> {
        channel_series(&self.sensor_readings, channel)
    }
}

/// Builder for `ProductionRun`.
#[derive(Debug)]
pub struct ProductionRunBuilder {
    id: String,
    batch_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: RunStatus,
    is_ood: bool,
    setup_params: SetupParams,
    sensor_readings: Vec<SensorReading>,
}

impl ProductionRunBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, batch_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            start_time: now,
            end_time: now,
            status: RunStatus::Completed,
            is_ood: false,
            setup_params: SetupParams::default(),
            sensor_readings: Vec::new(),
        }
    }

    /// Set start and end timestamps.
    #[must_use]
    pub fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Set the final status.
    #[must_use]
    pub fn status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark the run as out-of-distribution.
    #[must_use]
    pub fn ood(mut self, is_ood: bool) -> Self {
        self.is_ood = is_ood;
        self
    }

    /// Set the setup parameters.
    #[must_use]
    pub fn setup(mut self, setup: SetupParams) -> Self {
        self.setup_params = setup;
        self
    }

    /// Set the reading sequence.
    #[must_use]
    pub fn readings(mut self, readings: Vec<SensorReading>) -> Self {
        self.sensor_readings = readings;
        self
    }

    /// Build the `ProductionRun` with its quality outcome.
    #[must_use]
    pub fn build(self, quality_metrics: QualityMetrics) -> ProductionRun {
        ProductionRun {
            id: self.id,
            batch_id: self.batch_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            is_ood: self.is_ood,
            setup_params: self.setup_params,
            sensor_readings: self.sensor_readings,
            quality_grade: quality_metrics.quality_grade(),
            quality_metrics,
        }
    }
}
