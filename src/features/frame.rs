//! Columnar feature table
//!
//! Ordered column names, row ids and a row-major `f64` matrix, with a
//! name → column index built once per frame. Values are stored as computed;
//! consumers that need finite numbers sanitize on the way out.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use rustc_hash::FxHashMap;

use super::engineering::FeatureSet;
use crate::stats::finite_or_zero;
use crate::Result;

/// Feature table over many runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    row_ids: Vec<String>,
    data: Vec<f64>,
    index: FxHashMap<String, usize>,
}

impl FeatureFrame {
    /// Build a frame whose columns are the sorted union of every set's keys.
    ///
    /// A feature missing from a set is stored as 0.
    #[must_use]
    pub fn from_feature_sets(sets: &[FeatureSet]) -> Self {
        let mut columns: Vec<String> = sets
            .iter()
            .flat_map(FeatureSet::names)
            .map(ToString::to_string)
            .collect();
        columns.sort_unstable();
        columns.dedup();
        Self::with_columns(sets, columns)
    }

    /// Build a frame with an explicit column order.
    ///
    /// Missing features are stored as 0; extra features are ignored.
    #[must_use]
    pub fn with_columns(sets: &[FeatureSet], columns: Vec<String>) -> Self {
        let mut data = Vec::with_capacity(sets.len() * columns.len());
        for set in sets {
            data.extend(columns.iter().map(|c| set.get(c).unwrap_or(0.0)));
        }
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            row_ids: sets.iter().map(|s| s.run_id().to_string()).collect(),
            columns,
            data,
            index,
        }
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row (run) ids in order.
    #[must_use]
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Values of the column at `index`, top to bottom.
    #[must_use]
    pub fn column_at(&self, index: usize) -> Vec<f64> {
        if index >= self.columns.len() {
            return Vec::new();
        }
        self.data
            .iter()
            .skip(index)
            .step_by(self.columns.len())
            .copied()
            .collect()
    }

    /// Values of a named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).map(|i| self.column_at(i))
    }

    /// One row.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        let width = self.columns.len();
        let start = row.checked_mul(width)?;
        self.data.get(start..start + width)
    }

    /// Single cell.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.row(row).map(|r| r[col])
    }

    /// Convert to an Arrow record batch: `run_id` (Utf8) followed by one
    /// non-null Float64 column per feature, non-finite values replaced by 0.
    ///
    /// # Errors
    ///
    /// Returns `Error::Arrow` if the batch cannot be assembled.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len() + 1);
        fields.push(Field::new("run_id", DataType::Utf8, false));
        fields.extend(
            self.columns
                .iter()
                .map(|c| Field::new(c, DataType::Float64, false)),
        );
        let schema = Arc::new(Schema::new(fields));

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 1);
        arrays.push(Arc::new(StringArray::from(self.row_ids.clone())));
        for i in 0..self.columns.len() {
            let values: Vec<f64> = self.column_at(i).into_iter().map(finite_or_zero).collect();
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use std::collections::BTreeMap;

    fn set(id: &str, pairs: &[(&str, f64)]) -> FeatureSet {
        let features: BTreeMap<String, f64> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        FeatureSet::new(id.to_string(), features)
    }

    #[test]
    fn test_union_columns_fill_zero() {
        let frame = FeatureFrame::from_feature_sets(&[
            set("r1", &[("b", 1.0), ("a", 2.0)]),
            set("r2", &[("c", 3.0)]),
        ]);
        assert_eq!(frame.columns(), ["a", "b", "c"]);
        assert_eq!(frame.row(0), Some(&[2.0, 1.0, 0.0][..]));
        assert_eq!(frame.row(1), Some(&[0.0, 0.0, 3.0][..]));
        assert_eq!(frame.column("c"), Some(vec![0.0, 3.0]));
        assert_eq!(frame.value(1, "c"), Some(3.0));
        assert!(frame.row(2).is_none());
        assert!(frame.column("z").is_none());
    }

    #[test]
    fn test_explicit_columns() {
        let frame = FeatureFrame::with_columns(
            &[set("r1", &[("a", 1.0), ("extra", 9.0)])],
            vec!["b".to_string(), "a".to_string()],
        );
        assert_eq!(frame.n_cols(), 2);
        assert_eq!(frame.row(0), Some(&[0.0, 1.0][..]));
        assert_eq!(frame.column_index("a"), Some(1));
    }

    #[test]
    fn test_empty_frame() {
        let frame = FeatureFrame::from_feature_sets(&[]);
        assert!(frame.is_empty());
        assert_eq!(frame.n_cols(), 0);
        assert!(frame.column_at(0).is_empty());
    }

    #[test]
    fn test_record_batch_schema_and_sanitizing() {
        let frame = FeatureFrame::from_feature_sets(&[
            set("r1", &[("x", f64::NAN), ("y", 1.5)]),
            set("r2", &[("x", 2.0), ("y", f64::NEG_INFINITY)]),
        ]);
        let batch = frame.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.schema().field(0).name(), "run_id");
        assert_eq!(batch.schema().field(1).name(), "x");

        let ids = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ids.value(1), "r2");
        let x = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(x.values().to_vec(), vec![0.0, 2.0]);
        let y = batch.column(2).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(y.values().to_vec(), vec![1.5, 0.0]);
        assert_eq!(y.null_count(), 0);
    }
}
