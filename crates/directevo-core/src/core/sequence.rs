use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Symbols are single bytes, so anything outside ASCII can never belong to an alphabet.
    #[error("Invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { position: usize, symbol: char },
    #[error("Substitution position {position} is out of range for a sequence of length {length}")]
    PositionOutOfRange { position: usize, length: usize },
}

/// An owned string of single-byte symbols.
///
/// A `Sequence` is not tied to an alphabet; membership is checked by
/// [`Alphabet::validate`](super::alphabet::Alphabet::validate) and by the encoders, so that an
/// invalid symbol is reported with its position at the point of use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(Vec<u8>);

impl Sequence {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SequenceError> {
        let bytes = bytes.into();
        if let Some(position) = bytes.iter().position(|b| !b.is_ascii()) {
            return Err(SequenceError::InvalidSymbol {
                position,
                symbol: bytes[position] as char,
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn symbol(&self, position: usize) -> Option<u8> {
        self.0.get(position).copied()
    }

    /// Number of positions at which the two sequences differ.
    ///
    /// Sequences of different length additionally count every unmatched trailing position.
    pub fn mutation_distance(&self, other: &Sequence) -> usize {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count();
        shared + self.0.len().abs_diff(other.0.len())
    }

    pub fn with_substitutions(&self, substitutions: &[(usize, u8)]) -> Result<Self, SequenceError> {
        let mut bytes = self.0.clone();
        for &(position, symbol) in substitutions {
            let slot = bytes
                .get_mut(position)
                .ok_or(SequenceError::PositionOutOfRange {
                    position,
                    length: self.0.len(),
                })?;
            *slot = symbol;
        }
        Self::from_bytes(bytes)
    }

    /// Positions at which `self` differs from `reference`, with the symbol found in `self`.
    pub fn substitutions_from(&self, reference: &Sequence) -> Vec<(usize, u8)> {
        self.0
            .iter()
            .zip(reference.0.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(position, (&symbol, _))| (position, symbol))
            .collect()
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((position, symbol)) = s.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
            return Err(SequenceError::InvalidSymbol { position, symbol });
        }
        Ok(Self(s.as_bytes().to_vec()))
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Construction guarantees ASCII, so every byte maps to one char.
        for &b in &self.0 {
            fmt::Write::write_char(f, b as char)?;
        }
        Ok(())
    }
}

impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
