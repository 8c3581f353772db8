//! The surrogate model contract.
//!
//! The search treats a surrogate as an opaque, read-only predictor: a batch of encoded
//! sequences in, one `(mean, uncertainty)` pair per row out. Any fitting technique can sit
//! behind [`SurrogateModel`]; the reference implementations here exist so that a fitted
//! parameter file can be loaded without pulling in a training stack.

pub mod ensemble;
pub mod linear;
pub mod persistence;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

pub use ensemble::Ensemble;
pub use linear::LinearSurrogate;
pub use persistence::{ModelLoadError, SurrogateSpec};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model expects {expected} features per row, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid prediction{}: {reason}", row_suffix(.row))]
    InvalidPrediction { row: Option<usize>, reason: String },

    #[error("Model evaluation failed: {0}")]
    Failed(String),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" for row {r}")).unwrap_or_default()
}

/// What the second output of [`SurrogateModel::predict`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncertaintyKind {
    #[default]
    StandardDeviation,
    /// Predictive variance; converted to a standard deviation before scoring.
    Variance,
}

/// Row-aligned model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub mean: DVector<f64>,
    pub uncertainty: DVector<f64>,
}

impl Prediction {
    pub fn new(mean: DVector<f64>, uncertainty: DVector<f64>) -> Self {
        Self { mean, uncertainty }
    }

    pub fn from_vecs(mean: Vec<f64>, uncertainty: Vec<f64>) -> Self {
        Self {
            mean: DVector::from_vec(mean),
            uncertainty: DVector::from_vec(uncertainty),
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Enforces one finite mean and one finite, non-negative uncertainty per input row.
    pub fn validate(&self, rows: usize) -> Result<(), ModelError> {
        if self.mean.len() != rows || self.uncertainty.len() != rows {
            return Err(ModelError::InvalidPrediction {
                row: None,
                reason: format!(
                    "expected {rows} (mean, uncertainty) pairs, got {} means and {} uncertainties",
                    self.mean.len(),
                    self.uncertainty.len()
                ),
            });
        }
        for (row, (&mean, &uncertainty)) in self.mean.iter().zip(self.uncertainty.iter()).enumerate()
        {
            if !mean.is_finite() {
                return Err(ModelError::InvalidPrediction {
                    row: Some(row),
                    reason: format!("mean is {mean}"),
                });
            }
            if !uncertainty.is_finite() || uncertainty < 0.0 {
                return Err(ModelError::InvalidPrediction {
                    row: Some(row),
                    reason: format!("uncertainty is {uncertainty}"),
                });
            }
        }
        Ok(())
    }

    /// Converts a validated prediction to standard-deviation uncertainty.
    pub fn into_standard_deviation(mut self, kind: UncertaintyKind) -> Self {
        if kind == UncertaintyKind::Variance {
            self.uncertainty.apply(|v| *v = v.sqrt());
        }
        self
    }
}

/// A fitted predictor returning a point estimate and an uncertainty for every row.
///
/// Implementations must be deterministic for identical input (within floating-point
/// tolerance) and are never mutated by the search. Cost should scale roughly linearly with
/// the number of rows; the engine calls `predict` once per batch.
pub trait SurrogateModel: Send + Sync {
    /// `features` holds one encoded sequence per row.
    fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError>;

    fn uncertainty_kind(&self) -> UncertaintyKind {
        UncertaintyKind::StandardDeviation
    }

    /// Expected feature dimensionality, when the model knows it.
    fn input_dimension(&self) -> Option<usize> {
        None
    }
}

impl<M: SurrogateModel + ?Sized> SurrogateModel for Box<M> {
    fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
        (**self).predict(features)
    }

    fn uncertainty_kind(&self) -> UncertaintyKind {
        (**self).uncertainty_kind()
    }

    fn input_dimension(&self) -> Option<usize> {
        (**self).input_dimension()
    }
}
