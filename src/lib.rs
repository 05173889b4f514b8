//! # Spraywatch: Thermal Spray Process Simulation and Drift Monitoring
//!
//! **Version**: 0.1.0
//!
//! Spraywatch simulates a multi-sensor plasma spray coating line and watches
//! whether newly produced runs still look like a known-good reference
//! population.
//!
//! ## Pipeline
//!
//! ```text
//! NoiseEngine → SensorSimulator → QualityModel → RunOrchestrator
//!                                                     │ ProductionRun
//!                                                     ▼
//!                               FeatureEngineer → DriftDetector → DriftStatus
//! ```
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Genchi Genbutsu**: Every value derives from seeded physical models; one seed replays a whole dataset
//! - **Poka-Yoke**: Closed enums for materials and channels; out-of-range setups fail at construction
//! - **Jidoka**: Drift detection reports degraded states instead of failing
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::DateTime;
//! use spraywatch::drift::{DriftDetector, DriftState};
//! use spraywatch::simulation::RunOrchestrator;
//!
//! let start = DateTime::from_timestamp(1_700_000_000, 0);
//! let mut orchestrator = RunOrchestrator::new(42)?;
//! let reference = orchestrator.generate_dataset(12, 30.0, 1.0, start)?;
//!
//! let detector = DriftDetector::default();
//! detector.set_reference(&reference);
//! let status = detector.detect_drift(&reference, 20);
//! assert_eq!(status.overall_status, DriftState::Stable);
//! # Ok::<(), spraywatch::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod drift;
pub mod error;
pub mod features;
pub mod monitor;
pub mod predict;
pub mod simulation;
pub mod stats;

pub use config::{DriftConfig, SimulationConfig};
pub use drift::{DriftDetector, DriftState, DriftStatus};
pub use error::{Error, Result};
pub use features::{FeatureEngineer, FeatureFrame, FeatureSet};
pub use monitor::ProcessMonitor;
pub use predict::{QualityPrediction, QualityPredictor};
pub use simulation::{ProductionRun, RunOrchestrator, SetupParams};
