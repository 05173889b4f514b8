//! Drift detection
//!
//! Engineered features of newly observed runs are compared against a
//! reference population with a two-sample KS test per feature and a
//! population stability index (PSI). The pass resolves to one of:
//!
//! | State               | Condition                                     |
//! |---------------------|-----------------------------------------------|
//! | `unknown`           | no reference, or reference below `minSamples` |
//! | `insufficient_data` | current runs below `minSamples`               |
//! | `stable`            | PSI < 0.10 and fewer than 3 drifted features  |
//! | `warning`           | PSI < 0.25 or fewer than 5 drifted features   |
//! | `critical`          | otherwise                                     |
//!
//! State conditions are reported in the returned `DriftStatus`; detection
//! never fails.

mod detector;
mod statistics;
mod types;

pub use detector::{DriftDetector, FeatureStats, ReferenceDistribution};
pub use statistics::{histogram, ks_2samp, ks_p_value, psi, KsResult};
pub use types::{DriftState, DriftStatus, DriftSummary, DriftedFeature, FeatureDrift};
