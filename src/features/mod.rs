//! Feature engineering
//!
//! `FeatureEngineer` turns one run's readings into a sorted `FeatureSet`;
//! `FeatureFrame` stacks sets into a columnar table for drift comparison and
//! Arrow export.

mod engineering;
mod frame;

pub use engineering::{FeatureEngineer, FeatureSet, CROSS_FEATURES, WINDOW_SIZES};
pub use frame::FeatureFrame;
