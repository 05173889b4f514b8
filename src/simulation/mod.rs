//! Thermal spray process simulation
//!
//! Generators are layered leaves-first and every one is seeded, so a single
//! master seed reproduces a whole dataset bit for bit.
//!
//! ```text
//! NoiseEngine ──> SensorSimulator ──> QualityModel ──> RunOrchestrator
//!                                                          │
//!                                                          └──< ProductionRun (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chrono::DateTime;
//! use spraywatch::simulation::RunOrchestrator;
//!
//! let mut orchestrator = RunOrchestrator::new(42)?;
//! let start = DateTime::from_timestamp(1_700_000_000, 0);
//! let runs = orchestrator.generate_dataset(3, 30.0, 1.0, start)?;
//!
//! assert_eq!(runs.len(), 3);
//! assert_eq!(runs[0].sensor_readings().len(), 30);
//! # Ok::<(), spraywatch::Error>(())
//! ```

mod channel;
mod noise;
mod process;
mod quality;
mod run_record;
mod sensors;
mod setup;
mod store;

pub use channel::Channel;
pub use noise::{gaussian, NoiseConfig, NoiseEngine};
pub use process::{generate_sharded, RunOrchestrator, RunSummary};
pub use quality::{DefectRisk, ProcessState, QualityGrade, QualityMetrics, QualityModel};
pub use run_record::{ProductionRun, ProductionRunBuilder, RunStatus};
pub use sensors::{
    channel_series, deposition_rate, sample_count, ProcessBaselines, SensorReading,
    SensorSimulator,
};
pub use setup::{
    Coating, SetupParams, Substrate, ROBOT_SPEED_RANGE, SPRAY_DISTANCE_RANGE,
    TARGET_THICKNESS_RANGE,
};
pub use store::RunStore;
