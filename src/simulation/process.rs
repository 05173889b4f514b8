//! Run orchestration: setup draw, OOD decision, sensor generation, quality
//! evaluation and status derivation, composed into stored production runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::quality::{QualityGrade, QualityModel};
use super::run_record::{ProductionRun, RunStatus};
use super::sensors::{offset_time, SensorReading, SensorSimulator};
use super::setup::SetupParams;
use super::store::RunStore;
use crate::config::SimulationConfig;
use crate::{Error, Result};

/// Offset for the orchestration stream (ids, batches, setups, status).
const RUN_STREAM: u64 = 0x7275_6E73_2100_0002;
/// Offset for the quality-model stream.
const QUALITY_STREAM: u64 = 0x7175_616C_2100_0003;
/// Chance that a defect-flagged run is aborted.
const FAILURE_PROBABILITY: f64 = 0.3;
/// Default lookback for a dataset with no explicit start date.
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Aggregate view over a run collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Number of runs
    pub total_runs: usize,
    /// Runs with status `completed`
    pub completed_runs: usize,
    /// Runs with status `failed`
    pub failed_runs: usize,
    /// Out-of-distribution runs
    pub ood_runs: usize,
    /// Mean coating thickness (µm)
    pub avg_thickness_um: f64,
    /// Mean porosity (%)
    pub avg_porosity_pct: f64,
    /// Share of runs with any defect (%)
    pub defect_rate_pct: f64,
    /// Run count per grade; every grade is present
    pub grade_distribution: BTreeMap<QualityGrade, usize>,
}

impl RunSummary {
    /// Summarize a run slice; `None` when it is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_runs(runs: &[Arc<ProductionRun>]) -> Option<Self> {
        if runs.is_empty() {
            return None;
        }
        let n = runs.len() as f64;
        let mut grade_distribution: BTreeMap<QualityGrade, usize> =
            QualityGrade::ALL.into_iter().map(|g| (g, 0)).collect();
        let (mut completed, mut failed, mut ood, mut defects) = (0, 0, 0, 0);
        let (mut thickness, mut porosity) = (0.0, 0.0);

        for run in runs {
            match run.status() {
                RunStatus::Completed => completed += 1,
                RunStatus::Failed => failed += 1,
            }
            ood += usize::from(run.is_ood());
            let metrics = run.quality_metrics();
            defects += usize::from(metrics.defect_flag());
            thickness += metrics.thickness_um;
            porosity += metrics.porosity_pct;
            *grade_distribution.entry(run.quality_grade()).or_default() += 1;
        }

        Some(Self {
            total_runs: runs.len(),
            completed_runs: completed,
            failed_runs: failed,
            ood_runs: ood,
            avg_thickness_um: thickness / n,
            avg_porosity_pct: porosity / n,
            defect_rate_pct: defects as f64 / n * 100.0,
            grade_distribution,
        })
    }
}

/// Composes the generators into production runs and owns the run collection.
///
/// All randomness derives from one seed. Generation is sequential: callers
/// that share an orchestrator across threads must serialize access to keep
/// output reproducible (see `ProcessMonitor`); parallel throughput comes from
/// independent instances via [`generate_sharded`].
#[derive(Debug)]
pub struct RunOrchestrator {
    config: SimulationConfig,
    rng: StdRng,
    sensors: SensorSimulator,
    quality: QualityModel,
    store: RunStore,
}

impl RunOrchestrator {
    /// Create an orchestrator with default configuration and the given seed.
    ///
    /// # Errors
    ///
    /// Never fails with the default configuration; the signature matches
    /// [`RunOrchestrator::with_config`].
    pub fn new(seed: u64) -> Result<Self> {
        Self::with_config(SimulationConfig::default().with_seed(seed))
    }

    /// Create an orchestrator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if any section is out of range.
    pub fn with_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed ^ RUN_STREAM),
            sensors: SensorSimulator::new(config.baselines, config.noise, seed)?,
            quality: QualityModel::new(seed ^ QUALITY_STREAM),
            store: RunStore::new(),
            config,
        })
    }

    /// Seed of the current generator state.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The run collection.
    #[must_use]
    pub const fn store(&self) -> &RunStore {
        &self.store
    }

    /// Generate `num_runs` runs spaced `run_spacing_hours` apart.
    ///
    /// Without a start date the dataset begins seven days before now.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an invalid run shape or a timeline
    /// past chrono's range, and `Error::Computation` when the shape yields
    /// no readings.
    pub fn generate_dataset(
        &mut self,
        num_runs: usize,
        duration_seconds: f64,
        sample_rate_hz: f64,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Arc<ProductionRun>>> {
        let start = start_date.unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_LOOKBACK_DAYS));
        let mut runs = Vec::with_capacity(num_runs);
        for i in 0..num_runs {
            let run_start = spaced_start(start, self.config.run_spacing_hours, i)?;
            runs.push(self.generate_single_run(duration_seconds, sample_rate_hz, Some(run_start), None)?);
        }

        tracing::info!(
            num_runs,
            duration_seconds,
            sample_rate_hz,
            total_runs = self.store.len(),
            "generated dataset"
        );
        Ok(runs)
    }

    /// Generate one run and add it to the collection.
    ///
    /// A caller-supplied setup replaces the random draw. Without a start time
    /// the run starts now.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an invalid run shape and
    /// `Error::Computation` when the shape yields no readings.
    pub fn generate_single_run(
        &mut self,
        duration_seconds: f64,
        sample_rate_hz: f64,
        start_time: Option<DateTime<Utc>>,
        setup: Option<SetupParams>,
    ) -> Result<Arc<ProductionRun>> {
        let start = start_time.unwrap_or_else(Utc::now);
        let end = offset_time(start, duration_seconds)?;

        let id = self.next_run_id();
        let batch_id = format!("BATCH-{}", self.rng.gen_range(1000..10_000));
        let setup = setup.unwrap_or_else(|| SetupParams::random(&mut self.rng));
        let is_ood = self.sensors.decide_ood();

        let readings = self
            .sensors
            .generate_run(&setup, duration_seconds, sample_rate_hz, start, is_ood)?;
        let metrics = self.quality.evaluate(&setup, &readings, is_ood)?;

        let status = if metrics.defect_flag() && self.rng.gen::<f64>() < FAILURE_PROBABILITY {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let run = Arc::new(
            ProductionRun::builder(id, batch_id)
                .window(start, end)
                .status(status)
                .ood(is_ood)
                .setup(setup)
                .readings(readings)
                .build(metrics),
        );

        tracing::debug!(
            run_id = run.id(),
            is_ood,
            grade = %run.quality_grade(),
            status = ?status,
            "generated run"
        );
        self.store.insert(Arc::clone(&run))?;
        Ok(run)
    }

    /// Draw an 8-hex-char id that is not yet in the collection.
    fn next_run_id(&mut self) -> String {
        loop {
            let bytes: [u8; 16] = self.rng.gen();
            let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
            let mut id = uuid.simple().to_string();
            id.truncate(8);
            if !self.store.contains(&id) {
                return id;
            }
            tracing::warn!(run_id = %id, "run id collision, drawing again");
        }
    }

    /// Look up a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn get_run(&self, run_id: &str) -> Result<Arc<ProductionRun>> {
        self.store
            .get(run_id)
            .cloned()
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    /// All runs in insertion order.
    #[must_use]
    pub fn list_runs(&self) -> &[Arc<ProductionRun>] {
        self.store.runs()
    }

    /// The most recent `n` runs, oldest first.
    #[must_use]
    pub fn recent_runs(&self, n: usize) -> &[Arc<ProductionRun>] {
        self.store.recent(n)
    }

    /// Reading sequence of a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown id.
    pub fn timeseries(&self, run_id: &str) -> Result<&[SensorReading]> {
        self.store
            .timeseries(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    /// Summary statistics; `None` for an empty collection.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        RunSummary::from_runs(self.store.runs())
    }

    /// Clear the collection and reseed every generator.
    ///
    /// `None` reuses the current seed, so a reset followed by the same calls
    /// replays the same runs.
    pub fn reset(&mut self, seed: Option<u64>) {
        let seed = seed.unwrap_or(self.config.seed);
        self.config.seed = seed;
        self.rng = StdRng::seed_from_u64(seed ^ RUN_STREAM);
        self.sensors.reseed(seed);
        self.quality.reseed(seed ^ QUALITY_STREAM);
        self.store.clear();
        tracing::info!(seed, "orchestrator reset");
    }
}

/// Start of the `index`-th run of a dataset beginning at `start`.
fn spaced_start(start: DateTime<Utc>, spacing_hours: u32, index: usize) -> Result<DateTime<Utc>> {
    i64::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(i64::from(spacing_hours)))
        .and_then(Duration::try_hours)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "run {index} at {spacing_hours} h spacing from {start} is outside the representable time range"
            ))
        })
}

/// Generate runs across independent, independently-seeded orchestrators.
///
/// Shard `k` uses seed `config.seed + k` and starts where shard `k - 1`
/// ends on the synthetic timeline. Output is concatenated in shard order and
/// is identical with or without the `rayon` feature. Run ids are unique
/// within each shard.
///
/// # Errors
///
/// Returns the first error of any shard.
pub fn generate_sharded(
    config: &SimulationConfig,
    shards: usize,
    runs_per_shard: usize,
    start_date: DateTime<Utc>,
) -> Result<Vec<Arc<ProductionRun>>> {
    config.validate()?;
    let run_shard = |shard: usize| -> Result<Vec<Arc<ProductionRun>>> {
        let shard_config = config.with_seed(config.seed.wrapping_add(shard as u64));
        let mut orchestrator = RunOrchestrator::with_config(shard_config)?;
        orchestrator.generate_dataset(
            runs_per_shard,
            config.duration_seconds,
            config.sample_rate_hz,
            Some(spaced_start(
                start_date,
                config.run_spacing_hours,
                shard.saturating_mul(runs_per_shard),
            )?),
        )
    };

    #[cfg(feature = "rayon")]
    let results: Vec<Result<Vec<Arc<ProductionRun>>>> = {
        use rayon::prelude::*;
        (0..shards).into_par_iter().map(run_shard).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let results: Vec<Result<Vec<Arc<ProductionRun>>>> = (0..shards).map(run_shard).collect();

    let mut runs = Vec::with_capacity(shards * runs_per_shard);
    for shard in results {
        runs.extend(shard?);
    }
    tracing::info!(shards, runs_per_shard, total_runs = runs.len(), "generated sharded dataset");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::setup::{Coating, Substrate};

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn small_config(seed: u64) -> SimulationConfig {
        SimulationConfig::default()
            .with_seed(seed)
            .with_run_shape(30.0, 1.0)
    }

    #[test]
    fn test_dataset_spacing_and_shape() {
        let mut orch = RunOrchestrator::with_config(small_config(42)).unwrap();
        let runs = orch.generate_dataset(4, 30.0, 1.0, Some(start())).unwrap();
        assert_eq!(runs.len(), 4);
        assert_eq!(orch.store().len(), 4);
        for (i, run) in runs.iter().enumerate() {
            assert_eq!(run.sensor_readings().len(), 30);
            assert_eq!(run.start_time(), start() + Duration::hours(3 * i as i64));
            assert_eq!(run.end_time(), run.start_time() + Duration::seconds(30));
        }
    }

    #[test]
    fn test_ids_and_batches() {
        let mut orch = RunOrchestrator::new(7).unwrap();
        let runs = orch.generate_dataset(20, 10.0, 1.0, Some(start())).unwrap();
        for run in &runs {
            assert_eq!(run.id().len(), 8);
            assert!(run.id().chars().all(|c| c.is_ascii_hexdigit()));
            let batch: u32 = run.batch_id().strip_prefix("BATCH-").unwrap().parse().unwrap();
            assert!((1000..10_000).contains(&batch));
        }
        let mut ids: Vec<_> = runs.iter().map(|r| r.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_same_seed_same_runs() {
        let mut a = RunOrchestrator::new(11).unwrap();
        let mut b = RunOrchestrator::new(11).unwrap();
        let ra = a.generate_dataset(3, 20.0, 1.0, Some(start())).unwrap();
        let rb = b.generate_dataset(3, 20.0, 1.0, Some(start())).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_reset_replays() {
        let mut orch = RunOrchestrator::new(5).unwrap();
        let first = orch.generate_dataset(3, 20.0, 1.0, Some(start())).unwrap();
        orch.reset(None);
        assert!(orch.store().is_empty());
        let second = orch.generate_dataset(3, 20.0, 1.0, Some(start())).unwrap();
        assert_eq!(first, second);

        orch.reset(Some(6));
        assert_eq!(orch.seed(), 6);
        let third = orch.generate_dataset(3, 20.0, 1.0, Some(start())).unwrap();
        assert_ne!(first[0].id(), third[0].id());
    }

    #[test]
    fn test_single_run_with_setup() {
        let mut orch = RunOrchestrator::new(3).unwrap();
        let setup =
            SetupParams::new(Substrate::Titanium, Coating::Alumina, 250.0, 110.0, 450.0).unwrap();
        let run = orch.generate_single_run(15.0, 2.0, Some(start()), Some(setup)).unwrap();
        assert_eq!(run.setup_params(), &setup);
        assert_eq!(run.sensor_readings().len(), 30);
        assert_eq!(orch.get_run(run.id()).unwrap(), run);
        assert_eq!(orch.timeseries(run.id()).unwrap().len(), 30);
    }

    #[test]
    fn test_unknown_run() {
        let orch = RunOrchestrator::new(3).unwrap();
        assert!(matches!(orch.get_run("nope"), Err(Error::RunNotFound(_))));
        assert!(matches!(orch.timeseries("nope"), Err(Error::RunNotFound(_))));
    }

    #[test]
    fn test_zero_reading_run_is_computation_error() {
        let mut orch = RunOrchestrator::new(3).unwrap();
        let err = orch.generate_single_run(0.5, 1.0, Some(start()), None).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
        assert!(orch.store().is_empty());
    }

    #[test]
    fn test_non_defect_runs_complete() {
        let mut orch = RunOrchestrator::new(21).unwrap();
        let runs = orch.generate_dataset(30, 10.0, 1.0, Some(start())).unwrap();
        for run in runs {
            if run.status() == RunStatus::Failed {
                assert!(run.quality_metrics().defect_flag());
            }
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut orch = RunOrchestrator::new(8).unwrap();
        assert!(orch.summary().is_none());
        orch.generate_dataset(12, 10.0, 1.0, Some(start())).unwrap();
        let summary = orch.summary().unwrap();
        assert_eq!(summary.total_runs, 12);
        assert_eq!(summary.completed_runs + summary.failed_runs, 12);
        assert_eq!(summary.grade_distribution.len(), 4);
        assert_eq!(summary.grade_distribution.values().sum::<usize>(), 12);
        assert!((0.0..=100.0).contains(&summary.defect_rate_pct));
    }

    #[test]
    fn test_timeline_overflow_is_config_error() {
        let mut orch = RunOrchestrator::new(3).unwrap();
        let far = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        let err = orch.generate_dataset(3, 10.0, 1.0, Some(far)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = orch
            .generate_single_run(10.0, 1.0, Some(DateTime::<Utc>::MAX_UTC), None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(orch.store().len(), 1);
    }

    #[test]
    fn test_sharded_matches_sequential_shards() {
        let config = small_config(100).with_run_shape(10.0, 1.0);
        let runs = generate_sharded(&config, 3, 2, start()).unwrap();
        assert_eq!(runs.len(), 6);

        let mut shard1 = RunOrchestrator::with_config(config.with_seed(101)).unwrap();
        let expected = shard1
            .generate_dataset(2, 10.0, 1.0, Some(start() + Duration::hours(6)))
            .unwrap();
        assert_eq!(&runs[2..4], expected.as_slice());
    }
}
