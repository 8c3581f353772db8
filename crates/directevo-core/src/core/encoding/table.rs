use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::descriptors::{BUILTIN_DESCRIPTORS, BUILTIN_DESCRIPTOR_COLUMNS};

const ROW_MATCH_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Table '{path}' has no value columns; expected 'symbol,<column>...'")]
    NoColumns { path: String },
    #[error("Invalid symbol field '{field}' on line {line} of '{path}'; expected one ASCII character")]
    InvalidSymbolField {
        path: String,
        line: u64,
        field: String,
    },
    #[error("Invalid number '{field}' on line {line} of '{path}'")]
    InvalidNumber {
        path: String,
        line: u64,
        field: String,
    },
    #[error("Row for '{symbol}' has {found} values, expected {expected}")]
    RowWidth {
        symbol: char,
        expected: usize,
        found: usize,
    },
    #[error("Symbol '{0}' appears more than once in the table")]
    DuplicateSymbol(char),
}

/// A per-symbol feature table backing the descriptor and embedding encoding schemes.
///
/// Every row has the same width. Rows are kept in symbol order so that decoding and
/// serialisation are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    columns: Vec<String>,
    rows: BTreeMap<u8, Vec<f64>>,
}

impl LookupTable {
    pub fn new(
        columns: Vec<String>,
        rows: impl IntoIterator<Item = (u8, Vec<f64>)>,
    ) -> Result<Self, TableLoadError> {
        let mut table = BTreeMap::new();
        for (symbol, values) in rows {
            if values.len() != columns.len() {
                return Err(TableLoadError::RowWidth {
                    symbol: symbol as char,
                    expected: columns.len(),
                    found: values.len(),
                });
            }
            if table.insert(symbol, values).is_some() {
                return Err(TableLoadError::DuplicateSymbol(symbol as char));
            }
        }
        Ok(Self {
            columns,
            rows: table,
        })
    }

    /// Kyte-Doolittle hydropathy, side-chain volume (cubic angstroms) and net charge at pH 7
    /// for the 20 canonical residues.
    pub fn builtin_physicochemical() -> Self {
        Self {
            columns: BUILTIN_DESCRIPTOR_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: BUILTIN_DESCRIPTORS
                .entries()
                .map(|(&symbol, values)| (symbol, values.to_vec()))
                .collect(),
        }
    }

    /// Loads a `symbol,<column>...` CSV file with a header row.
    pub fn load_csv(path: &Path) -> Result<Self, TableLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|e| TableLoadError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

        let headers = reader
            .headers()
            .map_err(|e| TableLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?
            .clone();
        let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
        if columns.is_empty() {
            return Err(TableLoadError::NoColumns { path: path_str });
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| TableLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let symbol_field = record.get(0).unwrap_or_default().trim();
            let symbol = match symbol_field.as_bytes() {
                [b] if b.is_ascii_graphic() => *b,
                _ => {
                    return Err(TableLoadError::InvalidSymbolField {
                        path: path_str,
                        line,
                        field: symbol_field.to_string(),
                    });
                }
            };

            let values = record
                .iter()
                .skip(1)
                .map(|field| {
                    field
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| TableLoadError::InvalidNumber {
                            path: path_str.clone(),
                            line,
                            field: field.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((symbol, values));
        }

        Self::new(columns, rows)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn row(&self, symbol: u8) -> Option<&[f64]> {
        self.rows.get(&symbol).map(Vec::as_slice)
    }

    /// Whether every row is distinct, which is what makes table-backed decoding well defined.
    pub fn is_invertible(&self) -> bool {
        let rows: Vec<&Vec<f64>> = self.rows.values().collect();
        rows.iter().enumerate().all(|(i, a)| {
            rows[i + 1..]
                .iter()
                .all(|b| !rows_match(a.as_slice(), b.as_slice()))
        })
    }

    /// The unique symbol whose row matches `values`, if any.
    pub fn symbol_for(&self, values: &[f64]) -> Option<u8> {
        let mut matches = self
            .rows
            .iter()
            .filter(|(_, row)| rows_match(row, values))
            .map(|(&symbol, _)| symbol);
        match (matches.next(), matches.next()) {
            (Some(symbol), None) => Some(symbol),
            _ => None,
        }
    }

    /// Z-scores every column across rows. Constant columns are centred only.
    pub fn standardized(&self) -> Self {
        let n = self.rows.len().max(1) as f64;
        let stats: Vec<(f64, f64)> = (0..self.width())
            .map(|col| {
                let mean = self.rows.values().map(|r| r[col]).sum::<f64>() / n;
                let var = self
                    .rows
                    .values()
                    .map(|r| (r[col] - mean).powi(2))
                    .sum::<f64>()
                    / n;
                let sd = var.sqrt();
                (mean, if sd > f64::EPSILON { sd } else { 1.0 })
            })
            .collect();

        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|(&symbol, row)| {
                    let scaled = row
                        .iter()
                        .zip(&stats)
                        .map(|(v, (mean, sd))| (v - mean) / sd)
                        .collect();
                    (symbol, scaled)
                })
                .collect(),
        }
    }
}

fn rows_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= ROW_MATCH_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builtin_table_covers_canonical_residues_and_is_invertible() {
        let table = LookupTable::builtin_physicochemical();
        assert_eq!(table.len(), 20);
        assert_eq!(table.width(), 3);
        assert_eq!(table.row(b'R'), Some(&[-4.5, 173.4, 1.0][..]));
        assert!(table.is_invertible());
        assert!(table.standardized().is_invertible());
    }

    #[test]
    fn load_csv_reads_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "symbol,x,y\nA,1.0,2.0\nB,-1.5,0\n").unwrap();

        let table = LookupTable::load_csv(&path).unwrap();
        assert_eq!(table.columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(table.row(b'B'), Some(&[-1.5, 0.0][..]));
        assert_eq!(table.symbol_for(&[1.0, 2.0]), Some(b'A'));
    }

    #[test]
    fn load_csv_rejects_bad_numbers_and_duplicates() {
        let dir = tempdir().unwrap();
        let bad_number = dir.path().join("bad.csv");
        fs::write(&bad_number, "symbol,x\nA,abc\n").unwrap();
        assert!(matches!(
            LookupTable::load_csv(&bad_number),
            Err(TableLoadError::InvalidNumber { .. })
        ));

        let duplicate = dir.path().join("dup.csv");
        fs::write(&duplicate, "symbol,x\nA,1\nA,2\n").unwrap();
        assert!(matches!(
            LookupTable::load_csv(&duplicate),
            Err(TableLoadError::DuplicateSymbol('A'))
        ));
    }

    #[test]
    fn load_csv_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = LookupTable::load_csv(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(TableLoadError::Csv { .. })));
    }

    #[test]
    fn colliding_rows_make_table_non_invertible() {
        let table = LookupTable::new(
            vec!["e0".to_string()],
            vec![(b'A', vec![0.5]), (b'B', vec![0.5]), (b'C', vec![1.0])],
        )
        .unwrap();
        assert!(!table.is_invertible());
        assert_eq!(table.symbol_for(&[0.5]), None);
        assert_eq!(table.symbol_for(&[1.0]), Some(b'C'));
    }
}
