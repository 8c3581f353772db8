use super::config::ConfigError;
use super::frontier::Candidate;
use crate::core::alphabet::Alphabet;
use crate::core::model::Prediction;
use std::cmp::Ordering;

/// Turns a `(mean, uncertainty)` pair into a single ranking value.
///
/// Scores must be non-decreasing in `mean` for a fixed uncertainty.
pub trait AcquisitionFunction: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, mean: f64, uncertainty: f64) -> f64;

    fn score_batch(&self, prediction: &Prediction) -> Vec<f64> {
        prediction
            .mean
            .iter()
            .zip(prediction.uncertainty.iter())
            .map(|(&mean, &uncertainty)| self.score(mean, uncertainty))
            .collect()
    }
}

/// `score = mean + beta * uncertainty`; `beta = 0` is pure exploitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperConfidenceBound {
    beta: f64,
}

impl UpperConfidenceBound {
    pub fn new(beta: f64) -> Result<Self, ConfigError> {
        if !beta.is_finite() || beta < 0.0 {
            return Err(ConfigError::InvalidBeta(beta));
        }
        Ok(Self { beta })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl AcquisitionFunction for UpperConfidenceBound {
    fn name(&self) -> &'static str {
        "ucb"
    }

    #[inline]
    fn score(&self, mean: f64, uncertainty: f64) -> f64 {
        mean + self.beta * uncertainty
    }

    fn score_batch(&self, prediction: &Prediction) -> Vec<f64> {
        (&prediction.mean + &prediction.uncertainty * self.beta)
            .iter()
            .copied()
            .collect()
    }
}

/// Total ranking order: higher score first, then fewer mutations, then canonical sequence order.
pub fn compare_ranked(a: &Candidate, b: &Candidate, alphabet: &Alphabet) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.mutation_distance.cmp(&b.mutation_distance))
        .then_with(|| alphabet.compare(&a.sequence, &b.sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::Sequence;

    fn candidate(sequence: &str, score: f64, distance: usize) -> Candidate {
        Candidate {
            sequence: sequence.parse::<Sequence>().unwrap(),
            mean: score,
            uncertainty: 0.0,
            score,
            mutation_distance: distance,
            iteration: 1,
            features: None,
        }
    }

    #[test]
    fn ucb_is_monotone_in_mean_and_uncertainty() {
        let ucb = UpperConfidenceBound::new(2.0).unwrap();
        assert!(ucb.score(1.0, 0.5) < ucb.score(1.5, 0.5));
        assert!(ucb.score(1.0, 0.5) < ucb.score(1.0, 0.75));
        assert_eq!(ucb.score(1.0, 0.5), 2.0);
    }

    #[test]
    fn zero_beta_ignores_uncertainty() {
        let ucb = UpperConfidenceBound::new(0.0).unwrap();
        assert_eq!(ucb.score(3.0, 0.0), ucb.score(3.0, 100.0));
    }

    #[test]
    fn batch_scores_match_scalar_scores() {
        let ucb = UpperConfidenceBound::new(0.5).unwrap();
        let prediction = Prediction::from_vecs(vec![1.0, -2.0, 0.0], vec![0.0, 4.0, 1.0]);
        let expected: Vec<f64> = [(1.0, 0.0), (-2.0, 4.0), (0.0, 1.0)]
            .iter()
            .map(|&(m, u)| ucb.score(m, u))
            .collect();
        assert_eq!(ucb.score_batch(&prediction), expected);
    }

    #[test]
    fn invalid_beta_is_rejected() {
        assert!(UpperConfidenceBound::new(-1.0).is_err());
        assert!(UpperConfidenceBound::new(f64::NAN).is_err());
    }

    #[test]
    fn ties_break_on_distance_then_canonical_order() {
        let alphabet = Alphabet::new("ABCD").unwrap();
        let mut ranked = vec![
            candidate("BAB", 1.0, 2),
            candidate("ABA", 1.0, 1),
            candidate("BAA", 1.0, 1),
            candidate("CCC", 2.0, 3),
        ];
        ranked.sort_by(|a, b| compare_ranked(a, b, &alphabet));
        let order: Vec<String> = ranked.iter().map(|c| c.sequence.to_string()).collect();
        assert_eq!(order, ["CCC", "ABA", "BAA", "BAB"]);
    }
}
