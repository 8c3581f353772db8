use directevo::core::alphabet::{Alphabet, AlphabetError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(
        "Unknown encoding '{0}'. Expected 'one-hot', 'ordinal', 'descriptor', 'descriptor@table.csv' or 'embedding@table.csv'."
    )]
    UnknownEncoding(String),

    #[error("The '{0}' encoding requires a table path (e.g., '{0}@table.csv').")]
    MissingTablePath(&'static str),

    #[error("The '{0}' encoding does not take a table path.")]
    UnexpectedTablePath(&'static str),

    #[error("Invalid alphabet '{name}': {source}")]
    InvalidAlphabet {
        name: String,
        #[source]
        source: AlphabetError,
    },

    #[error("Invalid position '{0}'. Expected a non-negative integer.")]
    InvalidPosition(String),
}

/// An encoding choice as written on the command line or in a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingName {
    OneHot,
    Ordinal,
    /// The built-in physicochemical table, or a custom one.
    Descriptor(Option<PathBuf>),
    Embedding(PathBuf),
}

pub fn parse_encoding(name: &str) -> Result<EncodingName, ParseError> {
    let (scheme, path) = match name.split_once('@') {
        Some((scheme, path)) => (scheme.trim(), Some(path.trim())),
        None => (name.trim(), None),
    };
    let path = path.filter(|p| !p.is_empty()).map(PathBuf::from);

    match (scheme.to_ascii_lowercase().as_str(), path) {
        ("one-hot" | "onehot", None) => Ok(EncodingName::OneHot),
        ("one-hot" | "onehot", Some(_)) => Err(ParseError::UnexpectedTablePath("one-hot")),
        ("ordinal" | "integer", None) => Ok(EncodingName::Ordinal),
        ("ordinal" | "integer", Some(_)) => Err(ParseError::UnexpectedTablePath("ordinal")),
        ("descriptor", path) => Ok(EncodingName::Descriptor(path)),
        ("embedding", Some(path)) => Ok(EncodingName::Embedding(path)),
        ("embedding", None) => Err(ParseError::MissingTablePath("embedding")),
        _ => Err(ParseError::UnknownEncoding(name.to_string())),
    }
}

/// `protein`, `dna`, or the symbols themselves in rank order.
pub fn parse_alphabet(name: &str) -> Result<Alphabet, ParseError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "protein" | "amino-acid" => Ok(Alphabet::protein()),
        "protein-gap" => Ok(Alphabet::protein_with_gap()),
        "dna" => Ok(Alphabet::dna()),
        _ => Alphabet::new(name.trim()).map_err(|source| ParseError::InvalidAlphabet {
            name: name.to_string(),
            source,
        }),
    }
}

pub fn parse_position(key: &str) -> Result<usize, ParseError> {
    key.trim()
        .parse()
        .map_err(|_| ParseError::InvalidPosition(key.to_string()))
}
