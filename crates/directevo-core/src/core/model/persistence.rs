use super::{Ensemble, LinearSurrogate, ModelError, SurrogateModel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid model parameters: {0}")]
    Invalid(#[from] ModelError),
}

/// On-disk description of a fitted reference model.
///
/// ```toml
/// kind = "linear"
/// weights = [0.5, -0.25]
/// bias = 0.1
/// weight-variances = [0.01, 0.01]
/// noise-variance = 0.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SurrogateSpec {
    Linear {
        weights: Vec<f64>,
        #[serde(default)]
        bias: f64,
        #[serde(rename = "weight-variances")]
        weight_variances: Vec<f64>,
        #[serde(default, rename = "noise-variance")]
        noise_variance: f64,
    },
    Ensemble {
        members: Vec<SurrogateSpec>,
    },
}

impl SurrogateSpec {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        debug!("Loading surrogate parameters from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ModelLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ModelLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelLoadError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ModelLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn build(self) -> Result<Box<dyn SurrogateModel>, ModelLoadError> {
        match self {
            Self::Linear {
                weights,
                bias,
                weight_variances,
                noise_variance,
            } => Ok(Box::new(LinearSurrogate::new(
                weights,
                bias,
                weight_variances,
                noise_variance,
            )?)),
            Self::Ensemble { members } => {
                let members = members
                    .into_iter()
                    .map(Self::build)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(Ensemble::new(members)?))
            }
        }
    }
}

impl From<LinearSurrogate> for SurrogateSpec {
    fn from(model: LinearSurrogate) -> Self {
        Self::Linear {
            weights: model.weights,
            bias: model.bias,
            weight_variances: model.weight_variances,
            noise_variance: model.noise_variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_linear_spec_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.toml");
        fs::write(
            &path,
            r#"
            kind = "linear"
            weights = [1.0, 2.0]
            bias = 0.5
            weight-variances = [0.0, 0.0]
            "#,
        )
        .unwrap();

        let model = SurrogateSpec::load(&path).unwrap().build().unwrap();
        let prediction = model
            .predict(&DMatrix::from_row_slice(1, 2, &[1.0, 1.0]))
            .unwrap();
        assert_eq!(prediction.mean[0], 3.5);
        assert_eq!(model.input_dimension(), Some(2));
    }

    #[test]
    fn load_nested_ensemble_spec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ensemble.toml");
        fs::write(
            &path,
            r#"
            kind = "ensemble"

            [[members]]
            kind = "linear"
            weights = [1.0]
            weight-variances = [0.0]

            [[members]]
            kind = "linear"
            weights = [3.0]
            weight-variances = [0.0]
            "#,
        )
        .unwrap();

        let model = SurrogateSpec::load(&path).unwrap().build().unwrap();
        let prediction = model.predict(&DMatrix::from_element(1, 1, 1.0)).unwrap();
        assert!((prediction.mean[0] - 2.0).abs() < 1e-12);
        assert!((prediction.uncertainty[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn save_then_load_preserves_parameters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let spec: SurrogateSpec = LinearSurrogate::new(vec![0.25, -1.5], 2.0, vec![0.1, 0.2], 0.3)
            .unwrap()
            .into();

        spec.save(&path).unwrap();
        assert_eq!(SurrogateSpec::load(&path).unwrap(), spec);
    }

    #[test]
    fn invalid_parameters_fail_at_build() {
        let spec = SurrogateSpec::Linear {
            weights: vec![1.0],
            bias: 0.0,
            weight_variances: vec![-1.0],
            noise_variance: 0.0,
        };
        assert!(matches!(spec.build(), Err(ModelLoadError::Invalid(_))));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = SurrogateSpec::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ModelLoadError::Io { .. })));
    }
}
