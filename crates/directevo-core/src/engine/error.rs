use thiserror::Error;

use super::config::ConfigError;
use crate::core::encoding::EncodingError;
use crate::core::model::ModelError;
use crate::core::sequence::Sequence;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Invalid symbol '{symbol}' at position {position} in sequence {sequence}")]
    InvalidSymbol {
        sequence: Sequence,
        position: usize,
        symbol: char,
    },

    #[error("Encoder setup failed: {0}")]
    EncoderSetup(#[source] EncodingError),

    #[error("Failed to encode {sequence}: {source}")]
    Encoding {
        sequence: Sequence,
        source: EncodingError,
    },

    #[error(
        "{failures} of {batch_size} candidates failed to encode (tolerance {tolerance}); first failure: {first}"
    )]
    SystemicEncodingFailure {
        failures: usize,
        batch_size: usize,
        tolerance: usize,
        first: Box<EngineError>,
    },

    #[error("Surrogate model failed: {0}")]
    Model(#[source] ModelError),

    #[error("Invalid prediction{}: {reason}", sequence_suffix(.sequence))]
    InvalidPrediction {
        sequence: Option<Sequence>,
        reason: String,
    },

    #[error("Checkpoint cannot be resumed: {0}")]
    Checkpoint(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

fn sequence_suffix(sequence: &Option<Sequence>) -> String {
    sequence
        .as_ref()
        .map(|s| format!(" for {s}"))
        .unwrap_or_default()
}

impl EngineError {
    /// Attaches batch context to a model error, distinguishing malformed output from failures.
    pub(crate) fn from_model(error: ModelError, batch: &[Sequence]) -> Self {
        match error {
            ModelError::InvalidPrediction { row, reason } => Self::InvalidPrediction {
                sequence: row.and_then(|r| batch.get(r).cloned()),
                reason,
            },
            other => Self::Model(other),
        }
    }

    /// Errors caused by one candidate rather than by the whole search.
    pub fn is_candidate_local(&self) -> bool {
        matches!(self, Self::InvalidSymbol { .. } | Self::Encoding { .. })
    }
}
