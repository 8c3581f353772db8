//! Deterministic sequence-to-feature encoders.
//!
//! An [`EncodingScheme`] selects how each position of a [`Sequence`] maps to a block of
//! numbers; a [`SequenceEncoder`] binds a scheme to an alphabet and a fixed session length so
//! that every encoded row has the same dimensionality. Rows are laid out position-major: the
//! block for position `p` occupies columns `p * width .. (p + 1) * width`.

pub mod descriptors;
pub mod table;

use crate::core::alphabet::Alphabet;
use crate::core::sequence::Sequence;
use nalgebra::DMatrix;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use table::{LookupTable, TableLoadError};

const ONE_HOT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Invalid symbol '{symbol}' at position {position}")]
    InvalidSymbol { position: usize, symbol: char },

    #[error("Sequence length {found} does not match the session length {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Feature vector has {found} values, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Operation '{operation}' is not supported by the {scheme} encoding")]
    UnsupportedOperation {
        scheme: &'static str,
        operation: &'static str,
    },

    #[error("Features for position {position} do not correspond to any alphabet symbol")]
    UndecodableFeature { position: usize },

    #[error("Invalid encoder setup: {0}")]
    InvalidSetup(String),
}

/// How a single symbol becomes numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingScheme {
    /// One indicator column per alphabet symbol.
    OneHot,
    /// The symbol's alphabet rank as a single column.
    Ordinal,
    /// Physicochemical descriptor vector per symbol.
    Descriptor(Arc<LookupTable>),
    /// Pretrained embedding vector per symbol.
    Embedding(Arc<LookupTable>),
}

impl EncodingScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OneHot => "one-hot",
            Self::Ordinal => "ordinal",
            Self::Descriptor(_) => "descriptor",
            Self::Embedding(_) => "embedding",
        }
    }

    /// Columns produced per sequence position.
    pub fn width(&self, alphabet: &Alphabet) -> usize {
        match self {
            Self::OneHot => alphabet.len(),
            Self::Ordinal => 1,
            Self::Descriptor(table) | Self::Embedding(table) => table.width(),
        }
    }

    pub fn is_invertible(&self) -> bool {
        match self {
            Self::OneHot | Self::Ordinal => true,
            Self::Descriptor(table) | Self::Embedding(table) => table.is_invertible(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    alphabet: Alphabet,
    scheme: EncodingScheme,
    sequence_length: usize,
    width: usize,
}

impl SequenceEncoder {
    pub fn new(
        alphabet: Alphabet,
        scheme: EncodingScheme,
        sequence_length: usize,
    ) -> Result<Self, EncodingError> {
        if sequence_length == 0 {
            return Err(EncodingError::InvalidSetup(
                "sequence length must be at least 1".to_string(),
            ));
        }
        let width = scheme.width(&alphabet);
        if width == 0 {
            return Err(EncodingError::InvalidSetup(format!(
                "the {} table has no columns",
                scheme.name()
            )));
        }
        Ok(Self {
            alphabet,
            scheme,
            sequence_length,
            width,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn scheme(&self) -> &EncodingScheme {
        &self.scheme
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Columns per position.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Total feature dimensionality `D` of one encoded sequence.
    pub fn dimension(&self) -> usize {
        self.sequence_length * self.width
    }

    pub fn encode(&self, sequence: &Sequence) -> Result<Vec<f64>, EncodingError> {
        let mut out = vec![0.0; self.dimension()];
        self.encode_into(sequence, &mut out)?;
        Ok(out)
    }

    /// Encodes into a caller-provided row of exactly `dimension()` values.
    pub fn encode_into(&self, sequence: &Sequence, out: &mut [f64]) -> Result<(), EncodingError> {
        if sequence.len() != self.sequence_length {
            return Err(EncodingError::LengthMismatch {
                expected: self.sequence_length,
                found: sequence.len(),
            });
        }
        if out.len() != self.dimension() {
            return Err(EncodingError::DimensionMismatch {
                expected: self.dimension(),
                found: out.len(),
            });
        }

        for (position, (&symbol, block)) in sequence
            .as_bytes()
            .iter()
            .zip(out.chunks_exact_mut(self.width))
            .enumerate()
        {
            let invalid = || EncodingError::InvalidSymbol {
                position,
                symbol: symbol as char,
            };
            let rank = self.alphabet.rank_of(symbol).ok_or_else(invalid)?;
            match &self.scheme {
                EncodingScheme::OneHot => {
                    block.fill(0.0);
                    block[rank] = 1.0;
                }
                EncodingScheme::Ordinal => block[0] = rank as f64,
                EncodingScheme::Descriptor(table) | EncodingScheme::Embedding(table) => {
                    let row = table.row(symbol).ok_or_else(invalid)?;
                    block.copy_from_slice(row);
                }
            }
        }
        Ok(())
    }

    /// Encodes each sequence independently, preserving input order.
    ///
    /// Unlike [`encode_batch`](Self::encode_batch) a failing sequence does not affect the others,
    /// which lets callers drop individual candidates.
    pub fn encode_each(&self, sequences: &[Sequence]) -> Vec<Result<Vec<f64>, EncodingError>> {
        #[cfg(not(feature = "parallel"))]
        let iterator = sequences.iter();

        #[cfg(feature = "parallel")]
        let iterator = sequences.par_iter();

        iterator.map(|s| self.encode(s)).collect()
    }

    /// Encodes `N` sequences into an `N x D` matrix, one row per sequence in input order.
    ///
    /// Fails with the error of the lowest-indexed failing sequence.
    #[instrument(level = "trace", skip_all, fields(n = sequences.len()))]
    pub fn encode_batch(&self, sequences: &[Sequence]) -> Result<DMatrix<f64>, EncodingError> {
        let rows = self
            .encode_each(sequences)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::stack_rows(&rows, self.dimension()))
    }

    /// Stacks equally sized rows into a row-per-sequence matrix.
    pub fn stack_rows(rows: &[Vec<f64>], dimension: usize) -> DMatrix<f64> {
        DMatrix::from_row_iterator(rows.len(), dimension, rows.iter().flatten().copied())
    }

    /// Per-position view of the encoding: `L` blocks of `width` values each.
    pub fn encode_per_position(&self, sequence: &Sequence) -> Result<Vec<Vec<f64>>, EncodingError> {
        let flat = self.encode(sequence)?;
        Ok(flat.chunks_exact(self.width).map(<[f64]>::to_vec).collect())
    }

    pub fn decode(&self, features: &[f64]) -> Result<Sequence, EncodingError> {
        if !self.scheme.is_invertible() {
            return Err(EncodingError::UnsupportedOperation {
                scheme: self.scheme.name(),
                operation: "decode",
            });
        }
        if features.len() != self.dimension() {
            return Err(EncodingError::DimensionMismatch {
                expected: self.dimension(),
                found: features.len(),
            });
        }

        let symbols = features
            .chunks_exact(self.width)
            .enumerate()
            .map(|(position, block)| {
                self.decode_block(block)
                    .ok_or(EncodingError::UndecodableFeature { position })
            })
            .collect::<Result<Vec<u8>, _>>()?;

        Sequence::from_bytes(symbols).map_err(|e| EncodingError::InvalidSetup(e.to_string()))
    }

    fn decode_block(&self, block: &[f64]) -> Option<u8> {
        match &self.scheme {
            EncodingScheme::OneHot => {
                let mut hot = None;
                for (rank, &value) in block.iter().enumerate() {
                    if (value - 1.0).abs() <= ONE_HOT_TOLERANCE {
                        if hot.replace(rank).is_some() {
                            return None;
                        }
                    } else if value.abs() > ONE_HOT_TOLERANCE {
                        return None;
                    }
                }
                hot.and_then(|rank| self.alphabet.symbol_at(rank))
            }
            EncodingScheme::Ordinal => {
                let value = block[0];
                let rounded = value.round();
                if (value - rounded).abs() > ONE_HOT_TOLERANCE || rounded < 0.0 {
                    return None;
                }
                self.alphabet.symbol_at(rounded as usize)
            }
            EncodingScheme::Descriptor(table) | EncodingScheme::Embedding(table) => table
                .symbol_for(block)
                .filter(|&symbol| self.alphabet.contains(symbol)),
        }
    }
}
