//! Run Store - insertion-ordered in-memory collection of production runs
//!
//! Owned by the orchestrator and handed to boundary layers by reference;
//! there is no global registry.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::run_record::ProductionRun;
use super::sensors::SensorReading;
use crate::{Error, Result};

/// In-memory store of production runs.
///
/// ## Design
///
/// Runs are kept in a vector in insertion order, with an id → position
/// map for O(1) lookups. Runs are immutable and shared as `Arc` so
/// callers can hold them without borrowing the store.
#[derive(Debug, Default)]
pub struct RunStore {
    runs: Vec<Arc<ProductionRun>>,
    index: FxHashMap<String, usize>,
}

impl RunStore {
    /// Create a new empty run store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether a run id is already present.
    #[must_use]
    pub fn contains(&self, run_id: &str) -> bool {
        self.index.contains_key(run_id)
    }

    /// Add a run to the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRun` if the id is already present.
    pub fn insert(&mut self, run: Arc<ProductionRun>) -> Result<()> {
        if self.contains(run.id()) {
            return Err(Error::DuplicateRun(run.id().to_string()));
        }
        self.index.insert(run.id().to_string(), self.runs.len());
        self.runs.push(run);
        Ok(())
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<&Arc<ProductionRun>> {
        self.index.get(run_id).map(|&i| &self.runs[i])
    }

    /// All runs in insertion order.
    #[must_use]
    pub fn runs(&self) -> &[Arc<ProductionRun>] {
        &self.runs
    }

    /// The most recent `n` runs (all runs if fewer), oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Arc<ProductionRun>] {
        &self.runs[self.runs.len().saturating_sub(n)..]
    }

    /// Reading sequence of a run.
    #[must_use]
    pub fn timeseries(&self, run_id: &str) -> Option<&[SensorReading]> {
        self.get(run_id).map(|run| run.sensor_readings())
    }

    /// Remove every run.
    pub fn clear(&mut self) {
        self.runs.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::quality::QualityMetrics;

    fn run(id: &str) -> Arc<ProductionRun> {
        let metrics = QualityMetrics {
            thickness_um: 300.0,
            thickness_uniformity_pct: 2.0,
            porosity_pct: 2.0,
            adhesion_strength_mpa: 55.0,
            surface_roughness_ra: 2.0,
            has_delamination: false,
            has_cracks: false,
            has_voids: false,
        };
        Arc::new(ProductionRun::builder(id, "BATCH-1000").build(metrics))
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut store = RunStore::new();
        for id in ["c", "a", "b"] {
            store.insert(run(id)).unwrap();
        }
        let ids: Vec<_> = store.runs().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(store.get("a").unwrap().id(), "a");
        assert!(store.get("z").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = RunStore::new();
        store.insert(run("a")).unwrap();
        let err = store.insert(run("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateRun(id) if id == "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_recent_window() {
        let mut store = RunStore::new();
        for i in 0..5 {
            store.insert(run(&format!("r{i}"))).unwrap();
        }
        let recent: Vec<_> = store.recent(2).iter().map(|r| r.id().to_string()).collect();
        assert_eq!(recent, ["r3", "r4"]);
        assert_eq!(store.recent(10).len(), 5);
        assert!(store.recent(0).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut store = RunStore::new();
        store.insert(run("a")).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("a"));
        store.insert(run("a")).unwrap();
    }

    #[test]
    fn test_timeseries_lookup() {
        let mut store = RunStore::new();
        store.insert(run("a")).unwrap();
        assert_eq!(store.timeseries("a").map(<[SensorReading]>::len), Some(0));
        assert!(store.timeseries("missing").is_none());
    }
}
