//! Process monitor: one handle over generation, features and drift.
//!
//! The orchestrator's random streams are single-writer state, so it sits
//! behind a mutex. Reset, reference generation and the reference swap run
//! under one guard, so no other run can draw from a freshly seeded stream.
//! Drift passes only take the mutex long enough to copy the recent window.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::SimulationConfig;
use crate::drift::{DriftDetector, DriftStatus};
use crate::features::{FeatureEngineer, FeatureSet};
use crate::predict::{predict_run, QualityPrediction, QualityPredictor};
use crate::simulation::{ProductionRun, RunOrchestrator, RunSummary, SensorReading};
use crate::Result;

/// Shared entry point for a boundary layer.
///
/// `ProcessMonitor` is `Send + Sync`; wrap it in an `Arc` to share it.
#[derive(Debug)]
pub struct ProcessMonitor {
    config: SimulationConfig,
    orchestrator: Mutex<RunOrchestrator>,
    detector: DriftDetector,
    engineer: FeatureEngineer,
    last_status: RwLock<Option<DriftStatus>>,
}

impl ProcessMonitor {
    /// Create a monitor with no runs.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` is out of range.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Ok(Self {
            orchestrator: Mutex::new(RunOrchestrator::with_config(config)?),
            detector: DriftDetector::new(config.drift)?,
            engineer: FeatureEngineer::new(),
            last_status: RwLock::new(None),
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Drift detector.
    #[must_use]
    pub const fn detector(&self) -> &DriftDetector {
        &self.detector
    }

    /// Generate `num_runs` runs and use them as the drift reference.
    ///
    /// # Errors
    ///
    /// Propagates generation errors; the reference is unchanged on error.
    pub fn initialize(&self, num_runs: usize) -> Result<Vec<Arc<ProductionRun>>> {
        let mut orchestrator = self.orchestrator.lock();
        self.initialize_locked(&mut orchestrator, num_runs)
    }

    fn initialize_locked(
        &self,
        orchestrator: &mut RunOrchestrator,
        num_runs: usize,
    ) -> Result<Vec<Arc<ProductionRun>>> {
        let runs = orchestrator.generate_dataset(
            num_runs,
            self.config.duration_seconds,
            self.config.sample_rate_hz,
            None,
        )?;
        self.detector.set_reference(&runs);
        tracing::info!(runs = runs.len(), seed = orchestrator.seed(), "monitor initialized");
        Ok(runs)
    }

    /// Whether a drift reference is in place.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.detector.has_reference()
    }

    /// Generate one run with the configured shape.
    ///
    /// # Errors
    ///
    /// Propagates generation errors.
    pub fn add_run(&self) -> Result<Arc<ProductionRun>> {
        self.orchestrator.lock().generate_single_run(
            self.config.duration_seconds,
            self.config.sample_rate_hz,
            None,
            None,
        )
    }

    /// Snapshot of all runs in insertion order.
    #[must_use]
    pub fn runs(&self) -> Vec<Arc<ProductionRun>> {
        self.orchestrator.lock().list_runs().to_vec()
    }

    /// Look up a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn run(&self, run_id: &str) -> Result<Arc<ProductionRun>> {
        self.orchestrator.lock().get_run(run_id)
    }

    /// Reading sequence of a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn timeseries(&self, run_id: &str) -> Result<Vec<SensorReading>> {
        Ok(self.run(run_id)?.sensor_readings().to_vec())
    }

    /// Engineered features of a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn features(&self, run_id: &str) -> Result<FeatureSet> {
        let run = self.run(run_id)?;
        Ok(self.engineer.engineer_run(&run))
    }

    /// Sanitized feature vector in canonical order.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn feature_vector(&self, run_id: &str) -> Result<Vec<f64>> {
        Ok(self
            .features(run_id)?
            .to_vector(FeatureEngineer::feature_names()))
    }

    /// Predict a run's quality with an external predictor.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id or the predictor's error.
    pub fn predict(
        &self,
        run_id: &str,
        predictor: &dyn QualityPredictor,
    ) -> Result<QualityPrediction> {
        let run = self.run(run_id)?;
        predict_run(predictor, &run)
    }

    /// Compare the most recent `recent_n` runs (all if fewer) against the
    /// reference, and remember the result.
    #[must_use]
    pub fn drift_status(&self, recent_n: usize) -> DriftStatus {
        let recent = self.orchestrator.lock().recent_runs(recent_n).to_vec();
        let status = self.detector.detect_drift(&recent, self.config.drift.top_n);
        *self.last_status.write() = Some(status.clone());
        status
    }

    /// Result of the latest `drift_status` call.
    #[must_use]
    pub fn last_drift_status(&self) -> Option<DriftStatus> {
        self.last_status.read().clone()
    }

    /// Reset with a new seed and initialize again.
    ///
    /// # Errors
    ///
    /// Propagates generation errors.
    pub fn regenerate(&self, num_runs: usize, seed: Option<u64>) -> Result<Vec<Arc<ProductionRun>>> {
        let mut orchestrator = self.orchestrator.lock();
        orchestrator.reset(seed);
        *self.last_status.write() = None;
        self.initialize_locked(&mut orchestrator, num_runs)
    }

    /// Summary statistics over all runs.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        self.orchestrator.lock().summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftState;
    use crate::Error;

    fn monitor() -> ProcessMonitor {
        let config = SimulationConfig::default().with_seed(9).with_run_shape(30.0, 1.0);
        ProcessMonitor::new(config).unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let monitor = monitor();
        assert!(!monitor.is_initialized());
        assert_eq!(monitor.drift_status(20).overall_status, DriftState::Unknown);

        let runs = monitor.initialize(12).unwrap();
        assert!(monitor.is_initialized());
        assert_eq!(monitor.runs().len(), 12);

        let id = runs[0].id().to_string();
        assert_eq!(monitor.timeseries(&id).unwrap().len(), 30);
        assert_eq!(monitor.feature_vector(&id).unwrap().len(), 226);

        let status = monitor.drift_status(20);
        assert_eq!(status.current_run_count, 12);
        assert_eq!(monitor.last_drift_status(), Some(status));

        monitor.add_run().unwrap();
        assert_eq!(monitor.summary().unwrap().total_runs, 13);
    }

    #[test]
    fn test_unknown_run_errors() {
        let monitor = monitor();
        assert!(matches!(monitor.run("missing"), Err(Error::RunNotFound(_))));
        assert!(matches!(monitor.features("missing"), Err(Error::RunNotFound(_))));
    }

    #[test]
    fn test_regenerate_replaces_runs() {
        let monitor = monitor();
        let first = monitor.initialize(10).unwrap();
        let _ = monitor.drift_status(10);
        let second = monitor.regenerate(10, Some(10)).unwrap();
        assert_eq!(monitor.runs().len(), 10);
        assert_ne!(first[0].id(), second[0].id());
        assert!(monitor.last_drift_status().is_none());
    }

    #[test]
    fn test_regenerate_replays_seed_under_concurrent_adds() {
        let expected: Vec<String> = {
            let mut orch = RunOrchestrator::with_config(monitor().config).unwrap();
            orch.reset(Some(77));
            orch.generate_dataset(10, 30.0, 1.0, None)
                .unwrap()
                .iter()
                .map(|r| r.id().to_string())
                .collect()
        };

        let monitor = monitor();
        monitor.initialize(10).unwrap();
        let regenerated = std::thread::scope(|scope| {
            let adder = scope.spawn(|| {
                for _ in 0..20 {
                    monitor.add_run().unwrap();
                }
            });
            let runs = monitor.regenerate(10, Some(77)).unwrap();
            adder.join().unwrap();
            runs
        });

        let ids: Vec<String> = regenerated.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, expected);
        let reference = monitor.detector().reference().unwrap();
        assert_eq!(reference.frame().row_ids(), ids.as_slice());
    }

    #[test]
    fn test_monitor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProcessMonitor>();
    }
}
