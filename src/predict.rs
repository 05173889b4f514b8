//! Predictive-model seam
//!
//! Model fitting and artifact persistence live outside this crate. This
//! module fixes the contract: a predictor consumes feature vectors in the
//! canonical sorted-name order and returns a `QualityPrediction`.

use serde::Serialize;

use crate::features::{FeatureEngineer, FeatureSet};
use crate::simulation::ProductionRun;
use crate::Result;

/// Upper bound applied to predicted porosity (%).
const MAX_POROSITY_PCT: f64 = 20.0;
/// Weight of defect-probability entropy in the confidence score.
const ENTROPY_WEIGHT: f64 = 0.3;

/// Predicted quality of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityPrediction {
    /// Run the prediction belongs to
    pub run_id: String,
    /// Point estimate of thickness (µm)
    pub thickness_um: f64,
    /// Lower bound of the thickness interval (µm)
    pub thickness_lower: f64,
    /// Upper bound of the thickness interval (µm)
    pub thickness_upper: f64,
    /// Predicted porosity (%)
    pub porosity_pct: f64,
    /// Probability of any defect
    pub defect_probability: f64,
    /// Predicted grade label
    pub quality_grade: String,
    /// Overall confidence in `[0, 1]`
    pub confidence: f64,
}

impl QualityPrediction {
    /// Assemble a prediction from raw model outputs.
    ///
    /// Thickness bounds are floored at 0, porosity clipped to `[0, 20]`, and
    /// confidence derived from interval width and defect-probability entropy.
    #[must_use]
    pub fn from_raw(
        run_id: impl Into<String>,
        thickness: f64,
        thickness_lower: f64,
        thickness_upper: f64,
        porosity: f64,
        defect_probability: f64,
        quality_grade: impl Into<String>,
    ) -> Self {
        let defect_probability = defect_probability.clamp(0.0, 1.0);
        Self {
            run_id: run_id.into(),
            confidence: confidence_score(thickness, thickness_lower, thickness_upper, defect_probability),
            thickness_um: thickness.max(0.0),
            thickness_lower: thickness_lower.max(0.0),
            thickness_upper: thickness_upper.max(0.0),
            porosity_pct: porosity.clamp(0.0, MAX_POROSITY_PCT),
            defect_probability,
            quality_grade: quality_grade.into(),
        }
    }
}

/// Confidence from relative interval width, discounted by the normalized
/// binary entropy of the defect probability.
#[must_use]
pub fn confidence_score(thickness: f64, lower: f64, upper: f64, defect_probability: f64) -> f64 {
    let relative_width = if thickness > 0.0 {
        (upper - lower) / thickness
    } else {
        1.0
    };
    let interval = (1.0 - relative_width).clamp(0.0, 1.0);

    let p = defect_probability.clamp(0.0, 1.0);
    let entropy = -[p, 1.0 - p]
        .iter()
        .map(|q| q * (q + 1e-10).ln())
        .sum::<f64>()
        / (2.0f64 + 1e-10).ln();
    interval * ENTROPY_WEIGHT.mul_add(-entropy, 1.0)
}

/// External quality predictor.
pub trait QualityPredictor {
    /// Feature order the predictor was trained on.
    fn feature_names(&self) -> &[String] {
        FeatureEngineer::feature_names()
    }

    /// Predict from a finite feature vector in `feature_names` order.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn predict(&self, run_id: &str, features: &[f64]) -> Result<QualityPrediction>;
}

/// Engineer features for `run` and hand the sanitized vector to `predictor`.
///
/// # Errors
///
/// Propagates the predictor's error.
pub fn predict_run<P: QualityPredictor + ?Sized>(
    predictor: &P,
    run: &ProductionRun,
) -> Result<QualityPrediction> {
    let set: FeatureSet = FeatureEngineer::new().engineer_run(run);
    let vector = set.to_vector(predictor.feature_names());
    predictor.predict(run.id(), &vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::RunOrchestrator;

    struct MeanThickness {
        names: Vec<String>,
    }

    impl QualityPredictor for MeanThickness {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, run_id: &str, features: &[f64]) -> Result<QualityPrediction> {
            assert_eq!(features.len(), self.names.len());
            assert!(features.iter().all(|v| v.is_finite()));
            let total = features[0];
            Ok(QualityPrediction::from_raw(run_id, total, total * 0.9, total * 1.1, 25.0, 0.0, "A"))
        }
    }

    #[test]
    fn test_predict_run_uses_predictor_order() {
        let mut orch = RunOrchestrator::new(1).unwrap();
        let run = orch.generate_single_run(20.0, 1.0, None, None).unwrap();
        let predictor = MeanThickness {
            names: vec!["total_deposition".to_string(), "not_a_feature".to_string()],
        };
        let prediction = predict_run(&predictor, &run).unwrap();
        assert_eq!(prediction.run_id, run.id());
        assert!(prediction.thickness_um > 0.0);
        assert!((prediction.porosity_pct - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_bounds() {
        let tight = confidence_score(300.0, 299.0, 301.0, 0.0);
        let wide = confidence_score(300.0, 100.0, 500.0, 0.0);
        assert!(tight > wide);
        assert!(tight <= 1.0);
        assert!((confidence_score(0.0, 0.0, 0.0, 0.0)).abs() < 1e-12);

        let certain = confidence_score(300.0, 290.0, 310.0, 0.0);
        let uncertain = confidence_score(300.0, 290.0, 310.0, 0.5);
        assert!((uncertain - certain * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_from_raw_clamps() {
        let p = QualityPrediction::from_raw("r", -5.0, -10.0, 3.0, -1.0, 1.5, "reject");
        assert_eq!(p.thickness_um, 0.0);
        assert_eq!(p.thickness_lower, 0.0);
        assert_eq!(p.porosity_pct, 0.0);
        assert_eq!(p.defect_probability, 1.0);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["qualityGrade"], "reject");
    }
}
