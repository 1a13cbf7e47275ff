//! Reading and writing a single spectrum pair as a CSV table with the columns
//! `type, mz, intensity, matchedMsrdPeak, atomIndices`. Rows of type `msrd` (or
//! `measured`) belong to the measured spectrum, rows of type `pred` (or `predicted`)
//! to the predicted spectrum.
use std::io;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ResultsReadError;
use crate::peaks::{AtomIndices, MeasuredPeak, PeakLike, PredictedPeak};
use crate::results::{ResultsFile, SpectrumRecord};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Row {row}: unknown peak type {kind:?}, expected `msrd` or `pred`")]
    UnknownPeakType { row: usize, kind: String },
    #[error("Row {row}: cannot read {value:?} as a match flag")]
    InvalidFlag { row: usize, value: String },
    #[error("Row {row}: cannot read atom indices {value:?}: {source}")]
    InvalidAtomIndices {
        row: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeakKind {
    Measured,
    Predicted,
}

#[derive(Debug, Serialize, Deserialize)]
struct PeakRow {
    #[serde(rename = "type")]
    kind: String,
    mz: f64,
    intensity: f64,
    #[serde(rename = "matchedMsrdPeak", default)]
    matched: String,
    #[serde(rename = "atomIndices", default)]
    atom_indices: String,
}

fn parse_kind(row: usize, kind: &str) -> Result<PeakKind, TableError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "msrd" | "measured" => Ok(PeakKind::Measured),
        "pred" | "predicted" => Ok(PeakKind::Predicted),
        _ => Err(TableError::UnknownPeakType {
            row,
            kind: kind.to_string(),
        }),
    }
}

fn parse_flag(row: usize, value: &str) -> Result<bool, TableError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "0.0" => Ok(false),
        "true" | "1" | "yes" | "1.0" => Ok(true),
        _ => Err(TableError::InvalidFlag {
            row,
            value: value.to_string(),
        }),
    }
}

/// Read a table into a results file holding one spectrum named `title`. Tables carry
/// no parent structure, so the result's `smiles` is empty.
pub fn read_table<R: io::Read>(reader: R, title: &str) -> Result<ResultsFile, ResultsReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut measured = Vec::new();
    let mut predicted = Vec::new();
    for (i, row) in reader.deserialize::<PeakRow>().enumerate() {
        let row_number = i + 1;
        let row = row?;
        let atom_indices: AtomIndices =
            row.atom_indices
                .parse()
                .map_err(|source| TableError::InvalidAtomIndices {
                    row: row_number,
                    value: row.atom_indices.clone(),
                    source,
                })?;
        match parse_kind(row_number, &row.kind)? {
            PeakKind::Measured => {
                let matched = parse_flag(row_number, &row.matched)?;
                measured.push(MeasuredPeak::new(row.mz, row.intensity, matched, atom_indices));
            }
            PeakKind::Predicted => {
                predicted.push(PredictedPeak::new(row.mz, row.intensity, atom_indices));
            }
        }
    }
    log::debug!(
        "Read {} measured and {} predicted peaks from table",
        measured.len(),
        predicted.len()
    );
    let results = ResultsFile::new(
        String::new(),
        vec![SpectrumRecord::new(title.to_string(), measured, predicted)],
    );
    results.validate()?;
    Ok(results)
}

fn format_atoms(atoms: &AtomIndices) -> String {
    format!("[{atoms}]")
}

/// Write one spectrum pair as a table, measured rows first
pub fn write_table<W: io::Write>(writer: W, record: &SpectrumRecord) -> Result<(), ResultsReadError> {
    let mut writer = csv::Writer::from_writer(writer);
    for peak in record.msrd_spectrum.iter() {
        writer.serialize(PeakRow {
            kind: "msrd".into(),
            mz: peak.mz,
            intensity: peak.intensity,
            matched: if peak.is_matched { "True" } else { "False" }.into(),
            atom_indices: format_atoms(&peak.atom_indices),
        })?;
    }
    for peak in record.pred_spectrum.iter() {
        writer.serialize(PeakRow {
            kind: "pred".into(),
            mz: peak.mz(),
            intensity: peak.intensity(),
            matched: String::new(),
            atom_indices: format_atoms(peak.atom_indices()),
        })?;
    }
    writer.flush()?;
    Ok(())
}
