use super::{ModelError, Prediction, SurrogateModel};
use nalgebra::{DMatrix, DVector};

/// Combines independently fitted members into one predictor.
///
/// The mean is the average of the member means and the uncertainty is the population
/// standard deviation of those means, i.e. the members' disagreement. Member uncertainties are
/// ignored.
pub struct Ensemble {
    members: Vec<Box<dyn SurrogateModel>>,
}

impl Ensemble {
    pub fn new(members: Vec<Box<dyn SurrogateModel>>) -> Result<Self, ModelError> {
        if members.is_empty() {
            return Err(ModelError::Failed(
                "an ensemble needs at least one member".to_string(),
            ));
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.members.len())
            .finish()
    }
}

impl SurrogateModel for Ensemble {
    fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
        let rows = features.nrows();
        let n = self.members.len() as f64;

        let mut sum: DVector<f64> = DVector::zeros(rows);
        let mut sum_sq: DVector<f64> = DVector::zeros(rows);
        for (index, member) in self.members.iter().enumerate() {
            let prediction = member.predict(features)?;
            prediction
                .validate(rows)
                .map_err(|e| ModelError::Failed(format!("ensemble member {index}: {e}")))?;
            sum_sq += prediction.mean.component_mul(&prediction.mean);
            sum += prediction.mean;
        }

        let mean = sum / n;
        let uncertainty = (sum_sq / n - mean.component_mul(&mean)).map(|v: f64| v.max(0.0).sqrt());
        Ok(Prediction::new(mean, uncertainty))
    }

    fn input_dimension(&self) -> Option<usize> {
        self.members.iter().find_map(|m| m.input_dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::LinearSurrogate;

    #[test]
    fn ensemble_averages_means_and_reports_disagreement() {
        let members: Vec<Box<dyn SurrogateModel>> = vec![
            Box::new(LinearSurrogate::point_estimate(vec![1.0], 0.0)),
            Box::new(LinearSurrogate::point_estimate(vec![3.0], 0.0)),
        ];
        let ensemble = Ensemble::new(members).unwrap();
        let features = DMatrix::from_row_slice(2, 1, &[1.0, 0.0]);

        let prediction = ensemble.predict(&features).unwrap();
        assert!((prediction.mean[0] - 2.0).abs() < 1e-12);
        assert!((prediction.uncertainty[0] - 1.0).abs() < 1e-12);
        assert_eq!(prediction.mean[1], 0.0);
        assert_eq!(prediction.uncertainty[1], 0.0);
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        assert!(Ensemble::new(Vec::new()).is_err());
    }

    #[test]
    fn member_errors_propagate() {
        let members: Vec<Box<dyn SurrogateModel>> =
            vec![Box::new(LinearSurrogate::point_estimate(vec![1.0, 1.0], 0.0))];
        let ensemble = Ensemble::new(members).unwrap();
        let features = DMatrix::zeros(1, 1);
        assert!(matches!(
            ensemble.predict(&features),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
