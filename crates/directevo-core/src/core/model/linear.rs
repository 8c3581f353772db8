use super::{ModelError, Prediction, SurrogateModel};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// A linear predictor with an independent Gaussian posterior over each weight.
///
/// `mean = X w + b` and `sd = sqrt((X ∘ X) v + noise)`, where `v` holds the posterior weight
/// variances. The parameters are fitted elsewhere; this type only evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearSurrogate {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    pub weight_variances: Vec<f64>,
    #[serde(default)]
    pub noise_variance: f64,
}

impl LinearSurrogate {
    pub fn new(
        weights: Vec<f64>,
        bias: f64,
        weight_variances: Vec<f64>,
        noise_variance: f64,
    ) -> Result<Self, ModelError> {
        let model = Self {
            weights,
            bias,
            weight_variances,
            noise_variance,
        };
        model.check()?;
        Ok(model)
    }

    /// A model with no posterior uncertainty.
    pub fn point_estimate(weights: Vec<f64>, bias: f64) -> Self {
        let weight_variances = vec![0.0; weights.len()];
        Self {
            weights,
            bias,
            weight_variances,
            noise_variance: 0.0,
        }
    }

    pub(crate) fn check(&self) -> Result<(), ModelError> {
        if self.weights.len() != self.weight_variances.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.len(),
                found: self.weight_variances.len(),
            });
        }
        let bad_variance = self
            .weight_variances
            .iter()
            .chain(std::iter::once(&self.noise_variance))
            .any(|v| !v.is_finite() || *v < 0.0);
        if bad_variance {
            return Err(ModelError::Failed(
                "variances must be finite and non-negative".to_string(),
            ));
        }
        if self.weights.iter().any(|w| !w.is_finite()) || !self.bias.is_finite() {
            return Err(ModelError::Failed(
                "weights and bias must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl SurrogateModel for LinearSurrogate {
    fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
        if features.ncols() != self.weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.len(),
                found: features.ncols(),
            });
        }

        let weights = DVector::from_column_slice(&self.weights);
        let variances = DVector::from_column_slice(&self.weight_variances);

        let mean = features * &weights;
        let mean = mean.add_scalar(self.bias);

        let squared = features.component_mul(features);
        let uncertainty = (squared * &variances)
            .add_scalar(self.noise_variance)
            .map(f64::sqrt);

        Ok(Prediction::new(mean, uncertainty))
    }

    fn input_dimension(&self) -> Option<usize> {
        Some(self.weights.len())
    }
}
