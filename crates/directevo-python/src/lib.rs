use directevo::core::alphabet::Alphabet;
use directevo::core::encoding::{EncodingScheme, LookupTable, SequenceEncoder};
use directevo::core::sequence::Sequence;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn resolve_alphabet(alphabet: Option<&str>) -> PyResult<Alphabet> {
    match alphabet {
        None | Some("protein") => Ok(Alphabet::protein()),
        Some("protein-gap") => Ok(Alphabet::protein_with_gap()),
        Some("dna") => Ok(Alphabet::dna()),
        Some(symbols) => Alphabet::new(symbols).map_err(|e| PyValueError::new_err(e.to_string())),
    }
}

/// Builds an encoder sized to the first sequence; every other sequence must match it.
fn prepare(
    sequences: &[String],
    alphabet: Alphabet,
    scheme: EncodingScheme,
) -> PyResult<(SequenceEncoder, Vec<Sequence>)> {
    let parsed = sequences
        .iter()
        .enumerate()
        .map(|(index, s)| {
            s.parse::<Sequence>()
                .map_err(|e| PyValueError::new_err(format!("sequence {index}: {e}")))
        })
        .collect::<PyResult<Vec<_>>>()?;
    let length = parsed.first().map_or(1, Sequence::len);
    let encoder = SequenceEncoder::new(alphabet, scheme, length)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok((encoder, parsed))
}

fn encode_rows(encoder: &SequenceEncoder, sequences: &[Sequence]) -> PyResult<Vec<Vec<f64>>> {
    encoder
        .encode_each(sequences)
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|e| PyValueError::new_err(format!("sequence {index}: {e}")))
        })
        .collect()
}

/// One-hot encodes equal-length sequences into flat `L * A` rows.
#[pyfunction]
#[pyo3(signature = (sequences, alphabet = None))]
fn onehot_flat_encode_list(
    py: Python<'_>,
    sequences: Vec<String>,
    alphabet: Option<&str>,
) -> PyResult<Vec<Vec<f64>>> {
    let (encoder, parsed) = prepare(&sequences, resolve_alphabet(alphabet)?, EncodingScheme::OneHot)?;
    py.allow_threads(|| encode_rows(&encoder, &parsed))
}

/// One-hot encodes equal-length sequences into `N x L x A` nested lists.
#[pyfunction]
#[pyo3(signature = (sequences, alphabet = None))]
fn onehot_3d_encode_list(
    py: Python<'_>,
    sequences: Vec<String>,
    alphabet: Option<&str>,
) -> PyResult<Vec<Vec<Vec<f64>>>> {
    let (encoder, parsed) = prepare(&sequences, resolve_alphabet(alphabet)?, EncodingScheme::OneHot)?;
    py.allow_threads(|| {
        let width = encoder.width();
        let rows = encode_rows(&encoder, &parsed)?;
        Ok(rows
            .into_iter()
            .map(|row| row.chunks(width).map(<[f64]>::to_vec).collect())
            .collect())
    })
}

/// Maps each symbol to its alphabet rank.
#[pyfunction]
#[pyo3(signature = (sequences, alphabet = None))]
fn integer_encode_list(
    py: Python<'_>,
    sequences: Vec<String>,
    alphabet: Option<&str>,
) -> PyResult<Vec<Vec<u32>>> {
    let (encoder, parsed) = prepare(&sequences, resolve_alphabet(alphabet)?, EncodingScheme::Ordinal)?;
    py.allow_threads(|| {
        let rows = encode_rows(&encoder, &parsed)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|rank| rank as u32).collect())
            .collect())
    })
}

/// Concatenates per-residue descriptors: the built-in hydropathy, volume and charge table, or
/// a `symbol,<column>...` CSV table when `table_path` is given.
#[pyfunction]
#[pyo3(signature = (sequences, table_path = None, alphabet = None))]
fn descriptor_encode_list(
    py: Python<'_>,
    sequences: Vec<String>,
    table_path: Option<&str>,
    alphabet: Option<&str>,
) -> PyResult<Vec<Vec<f64>>> {
    let table = match table_path {
        Some(path) => LookupTable::load_csv(Path::new(path))
            .map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => LookupTable::builtin_physicochemical(),
    };
    let scheme = EncodingScheme::Descriptor(Arc::new(table));
    let (encoder, parsed) = prepare(&sequences, resolve_alphabet(alphabet)?, scheme)?;
    py.allow_threads(|| encode_rows(&encoder, &parsed))
}

#[pymodule]
fn directevo_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(onehot_flat_encode_list, m)?)?;
    m.add_function(wrap_pyfunction!(onehot_3d_encode_list, m)?)?;
    m.add_function(wrap_pyfunction!(integer_encode_list, m)?)?;
    m.add_function(wrap_pyfunction!(descriptor_encode_list, m)?)?;
    Ok(())
}
