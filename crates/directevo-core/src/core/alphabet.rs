use super::sequence::Sequence;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// The 20 canonical amino acids in one-letter code, alphabetical order.
pub const CANONICAL_RESIDUES: &str = "ACDEFGHIKLMNPQRSTVWY";

pub const GAP_SYMBOL: u8 = b'-';
pub const WILDCARD_SYMBOL: u8 = b'X';

const NO_RANK: u8 = u8::MAX;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("Alphabet must contain at least one symbol")]
    Empty,
    #[error("Alphabet may contain at most 254 symbols, got {0}")]
    TooLarge(usize),
    #[error("Duplicate symbol '{0}' in alphabet")]
    DuplicateSymbol(char),
    #[error("Symbol {0:?} is not a printable ASCII character")]
    NonGraphicSymbol(char),
    #[error("Invalid symbol '{symbol}' at position {position}")]
    InvalidSymbol { position: usize, symbol: char },
}

/// An ordered, duplicate-free set of single-byte symbols.
///
/// The rank of a symbol is its index in declaration order. Ranks drive the one-hot column
/// layout, the ordinal encoding and the canonical ordering used for tie-breaking.
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<u8>,
    ranks: [u8; 256],
}

impl Alphabet {
    pub fn new(symbols: impl AsRef<[u8]>) -> Result<Self, AlphabetError> {
        let symbols = symbols.as_ref();
        if symbols.is_empty() {
            return Err(AlphabetError::Empty);
        }
        if symbols.len() >= NO_RANK as usize {
            return Err(AlphabetError::TooLarge(symbols.len()));
        }

        let mut ranks = [NO_RANK; 256];
        for (rank, &symbol) in symbols.iter().enumerate() {
            if !symbol.is_ascii_graphic() {
                return Err(AlphabetError::NonGraphicSymbol(symbol as char));
            }
            if ranks[symbol as usize] != NO_RANK {
                return Err(AlphabetError::DuplicateSymbol(symbol as char));
            }
            ranks[symbol as usize] = rank as u8;
        }

        Ok(Self {
            symbols: symbols.to_vec(),
            ranks,
        })
    }

    pub fn protein() -> Self {
        Self::from_static(CANONICAL_RESIDUES.as_bytes())
    }

    pub fn protein_with_gap() -> Self {
        let mut symbols = CANONICAL_RESIDUES.as_bytes().to_vec();
        symbols.push(GAP_SYMBOL);
        Self::from_static(&symbols)
    }

    pub fn protein_with_wildcard() -> Self {
        let mut symbols = CANONICAL_RESIDUES.as_bytes().to_vec();
        symbols.push(WILDCARD_SYMBOL);
        Self::from_static(&symbols)
    }

    pub fn dna() -> Self {
        Self::from_static(b"ACGT")
    }

    // Only called with the compile-time symbol sets above, which are known to be valid.
    fn from_static(symbols: &[u8]) -> Self {
        let mut ranks = [NO_RANK; 256];
        for (rank, &symbol) in symbols.iter().enumerate() {
            ranks[symbol as usize] = rank as u8;
        }
        Self {
            symbols: symbols.to_vec(),
            ranks,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    #[inline]
    pub fn rank_of(&self, symbol: u8) -> Option<usize> {
        match self.ranks[symbol as usize] {
            NO_RANK => None,
            rank => Some(rank as usize),
        }
    }

    #[inline]
    pub fn symbol_at(&self, rank: usize) -> Option<u8> {
        self.symbols.get(rank).copied()
    }

    #[inline]
    pub fn contains(&self, symbol: u8) -> bool {
        self.ranks[symbol as usize] != NO_RANK
    }

    /// Checks every symbol of `sequence`, reporting the first offending position.
    pub fn validate(&self, sequence: &Sequence) -> Result<(), AlphabetError> {
        match sequence
            .as_bytes()
            .iter()
            .position(|&symbol| !self.contains(symbol))
        {
            Some(position) => Err(AlphabetError::InvalidSymbol {
                position,
                symbol: sequence.as_bytes()[position] as char,
            }),
            None => Ok(()),
        }
    }

    /// Canonical ordering: lexicographic by symbol rank, shorter sequences first on a shared
    /// prefix. Symbols outside the alphabet sort after every valid symbol, by byte value.
    pub fn compare(&self, a: &Sequence, b: &Sequence) -> Ordering {
        let key = |symbol: u8| (self.ranks[symbol as usize], symbol);
        a.as_bytes()
            .iter()
            .map(|&s| key(s))
            .cmp(b.as_bytes().iter().map(|&s| key(s)))
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Alphabet")
            .field(&String::from_utf8_lossy(&self.symbols))
            .finish()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_alphabet_has_twenty_ranked_symbols() {
        let alphabet = Alphabet::protein();
        assert_eq!(alphabet.len(), 20);
        assert_eq!(alphabet.rank_of(b'A'), Some(0));
        assert_eq!(alphabet.rank_of(b'Y'), Some(19));
        assert_eq!(alphabet.symbol_at(2), Some(b'D'));
        assert!(!alphabet.contains(b'B'));
    }

    #[test]
    fn extended_alphabets_append_the_extra_symbol_last() {
        assert_eq!(Alphabet::protein_with_gap().rank_of(b'-'), Some(20));
        assert_eq!(Alphabet::protein_with_wildcard().rank_of(b'X'), Some(20));
    }

    #[test]
    fn new_rejects_duplicates_and_empty_input() {
        assert_eq!(Alphabet::new(""), Err(AlphabetError::Empty));
        assert_eq!(
            Alphabet::new("ABA"),
            Err(AlphabetError::DuplicateSymbol('A'))
        );
        assert_eq!(
            Alphabet::new("A B"),
            Err(AlphabetError::NonGraphicSymbol(' '))
        );
    }

    #[test]
    fn validate_reports_first_offending_position() {
        let alphabet = Alphabet::new("ABCD").unwrap();
        let sequence: Sequence = "ABZDZ".parse().unwrap();
        assert_eq!(
            alphabet.validate(&sequence),
            Err(AlphabetError::InvalidSymbol {
                position: 2,
                symbol: 'Z'
            })
        );
        assert!(alphabet.validate(&"DCBA".parse().unwrap()).is_ok());
    }

    #[test]
    fn compare_follows_declared_rank_not_byte_value() {
        let alphabet = Alphabet::new("DCBA").unwrap();
        let a: Sequence = "AD".parse().unwrap();
        let b: Sequence = "DA".parse().unwrap();
        assert_eq!(alphabet.compare(&b, &a), Ordering::Less);
        assert_eq!(alphabet.compare(&a, &a), Ordering::Equal);
    }
}
