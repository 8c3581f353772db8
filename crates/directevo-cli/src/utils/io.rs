use crate::error::{CliError, Result};
use crate::utils::parser::EncodingName;
use anyhow::{Context, anyhow};
use bio::io::fasta;
use directevo::core::encoding::{EncodingScheme, LookupTable, SequenceEncoder};
use directevo::core::sequence::Sequence;
use directevo::engine::frontier::Candidate;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads sequences from a FASTA file or from a file with one sequence per line.
///
/// The format is FASTA when the first non-empty line is a `>` header. Blank lines and lines
/// starting with `#` are skipped in the plain format.
pub fn read_sequences(path: &Path) -> Result<Vec<Sequence>> {
    debug!("Reading sequences from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let parsing_error = |source: anyhow::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source,
    };

    let body = content.trim_start();
    let sequences = if body.starts_with('>') {
        read_fasta_records(body).map_err(parsing_error)?
    } else {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.parse::<Sequence>().map_err(anyhow::Error::from))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(parsing_error)?
    };

    if sequences.is_empty() {
        return Err(parsing_error(anyhow!("no sequences found")));
    }
    debug!("Read {} sequences", sequences.len());
    Ok(sequences)
}

fn read_fasta_records(body: &str) -> anyhow::Result<Vec<Sequence>> {
    fasta::Reader::new(body.as_bytes())
        .records()
        .map(|record| {
            let record = record?;
            if record.seq().is_empty() {
                return Err(anyhow!("record '{}' has no sequence", record.id()));
            }
            Sequence::from_bytes(record.seq())
                .with_context(|| format!("record '{}'", record.id()))
        })
        .collect()
}

pub fn load_scheme(name: &EncodingName) -> Result<EncodingScheme> {
    let load = |path: &Path| {
        LookupTable::load_csv(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    };
    Ok(match name {
        EncodingName::OneHot => EncodingScheme::OneHot,
        EncodingName::Ordinal => EncodingScheme::Ordinal,
        EncodingName::Descriptor(None) => {
            EncodingScheme::Descriptor(Arc::new(LookupTable::builtin_physicochemical()))
        }
        EncodingName::Descriptor(Some(path)) => {
            info!("Loading descriptor table from {:?}", path);
            EncodingScheme::Descriptor(Arc::new(load(path)?))
        }
        EncodingName::Embedding(path) => {
            info!("Loading embedding table from {:?}", path);
            EncodingScheme::Embedding(Arc::new(load(path)?))
        }
    })
}

#[derive(Serialize)]
struct FrontierRecord {
    rank: usize,
    sequence: String,
    mean: f64,
    uncertainty: f64,
    score: f64,
    mutation_distance: usize,
    iteration: usize,
}

/// Writes the ranked frontier, best first.
pub fn write_frontier(path: &Path, frontier: &[Candidate]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for (index, candidate) in frontier.iter().enumerate() {
        writer
            .serialize(FrontierRecord {
                rank: index + 1,
                sequence: candidate.sequence.to_string(),
                mean: candidate.mean,
                uncertainty: candidate.uncertainty,
                score: candidate.score,
                mutation_distance: candidate.mutation_distance,
                iteration: candidate.iteration,
            })
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Column names for an encoder's feature vector, position-major.
pub fn feature_columns(encoder: &SequenceEncoder) -> Vec<String> {
    let per_position: Vec<String> = match encoder.scheme() {
        EncodingScheme::OneHot => encoder
            .alphabet()
            .symbols()
            .iter()
            .map(|&s| (s as char).to_string())
            .collect(),
        EncodingScheme::Ordinal => vec!["rank".to_string()],
        EncodingScheme::Descriptor(table) | EncodingScheme::Embedding(table) => {
            table.columns().to_vec()
        }
    };
    (0..encoder.sequence_length())
        .flat_map(|position| {
            per_position
                .iter()
                .map(move |column| format!("p{position}_{column}"))
        })
        .collect()
}

/// Writes one row per sequence: the sequence followed by its features.
pub fn write_features(path: &Path, encoder: &SequenceEncoder, sequences: &[Sequence]) -> Result<()> {
    let matrix = encoder.encode_batch(sequences)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec!["sequence".to_string()];
    header.extend(feature_columns(encoder));
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;

    for (row, sequence) in sequences.iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.ncols() + 1);
        record.push(sequence.to_string());
        record.extend(matrix.row(row).iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(path: &Path, e: csv::Error) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    }
}
