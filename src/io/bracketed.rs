//! The compact single-line spectrum notation `[(mass,intensity,atom,atom,...);(...)]`.
//!
//! Each parenthesized tuple is one peak: its m/z, its intensity, and zero or more atom
//! indices. Tuples are separated by `;`, whitespace anywhere is ignored, and `[]` is an
//! empty spectrum. [`format_peaks`] writes the shortest decimal form that parses back
//! to the same value, so formatting then parsing reproduces every peak exactly.
use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::mass_error::Tolerance;
use crate::matching::PeakMatcher;
use crate::peaks::{AtomIndices, PeakLike, PredictedPeak};
use crate::results::{ResultsFile, SpectrumRecord};

#[derive(Debug, Error)]
pub enum BracketedParseError {
    #[error("Spectrum string must be enclosed in `[` and `]`, got {0:?}")]
    MissingBrackets(String),
    #[error("Peak {index} is not a parenthesized tuple: {text:?}")]
    MalformedTuple { index: usize, text: String },
    #[error("Peak {index} needs at least a mass and an intensity: {text:?}")]
    NotEnoughFields { index: usize, text: String },
    #[error("Peak {index} has an invalid number {text:?}: {source}")]
    InvalidNumber {
        index: usize,
        text: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("Peak {index} has an invalid atom index {text:?}: {source}")]
    InvalidAtomIndex {
        index: usize,
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Peak {index} is invalid: {reason}")]
    InvalidPeak { index: usize, reason: String },
}

fn parse_number(index: usize, text: &str, token: Option<&str>) -> Result<f64, BracketedParseError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| BracketedParseError::NotEnoughFields {
            index,
            text: text.to_string(),
        })?;
    token
        .parse::<f64>()
        .map_err(|source| BracketedParseError::InvalidNumber {
            index,
            text: token.to_string(),
            source,
        })
}

fn parse_tuple(index: usize, text: &str) -> Result<PredictedPeak, BracketedParseError> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| BracketedParseError::MalformedTuple {
            index,
            text: text.to_string(),
        })?;
    let mut fields = inner.split(',').map(str::trim);
    let mz = parse_number(index, text, fields.next())?;
    let intensity = parse_number(index, text, fields.next())?;

    let atom_indices = fields
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|source| BracketedParseError::InvalidAtomIndex {
                    index,
                    text: token.to_string(),
                    source,
                })
        })
        .collect::<Result<AtomIndices, _>>()?;

    let peak = PredictedPeak::new(mz, intensity, atom_indices);
    peak.validate()
        .map_err(|reason| BracketedParseError::InvalidPeak { index, reason })?;
    Ok(peak)
}

/// Parse a bracketed spectrum string into its peaks, in the order written
pub fn parse_peaks(text: &str) -> Result<Vec<PredictedPeak>, BracketedParseError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let body = compact
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| BracketedParseError::MissingBrackets(text.to_string()))?;

    body.split(';')
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(index, part)| parse_tuple(index, part))
        .collect()
}

/// Build a one-spectrum [`ResultsFile`] from a measured and a predicted bracketed
/// spectrum string. The measured peaks carry no match flags in this notation, so they
/// are labeled by pairing them with the predicted peaks within `tolerance`.
pub fn read_bracketed_pair(
    measured: &str,
    predicted: &str,
    smiles: &str,
    title: &str,
    tolerance: Tolerance,
) -> Result<ResultsFile, BracketedParseError> {
    let measured = parse_peaks(measured)?;
    let predicted = parse_peaks(predicted)?;
    let measured = PeakMatcher::new(tolerance).label(&measured, &predicted);
    let record = SpectrumRecord::new(title.to_string(), measured, predicted);
    Ok(ResultsFile::new(smiles.to_string(), vec![record]))
}

/// Format peaks as a bracketed spectrum string
pub fn format_peaks<P: PeakLike>(peaks: &[P]) -> String {
    let mut buffer = String::with_capacity(peaks.len() * 24 + 2);
    buffer.push('[');
    for (i, peak) in peaks.iter().enumerate() {
        if i > 0 {
            buffer.push(';');
        }
        buffer.push('(');
        buffer.push_str(&peak.mz().to_string());
        buffer.push(',');
        buffer.push_str(&peak.intensity().to_string());
        for atom in peak.atom_indices() {
            buffer.push(',');
            buffer.push_str(&atom.to_string());
        }
        buffer.push(')');
    }
    buffer.push(']');
    buffer
}

/// Write peaks as a bracketed spectrum string followed by a newline
pub fn write_peaks<W: io::Write, P: PeakLike>(writer: &mut W, peaks: &[P]) -> io::Result<()> {
    writer.write_all(format_peaks(peaks).as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let peaks = parse_peaks("[(100.5,0.25,1,2,3); (200, 1e3) ;(42.0 , 0.5, 7)]").unwrap();
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].mz, 100.5);
        assert_eq!(peaks[0].atom_indices.as_slice(), &[1, 2, 3]);
        assert_eq!(peaks[1].intensity, 1000.0);
        assert!(peaks[1].atom_indices.is_empty());
        assert_eq!(peaks[2].atom_indices.as_slice(), &[7]);

        assert!(parse_peaks("[]").unwrap().is_empty());
        assert!(parse_peaks(" [ ] ").unwrap().is_empty());
        assert_eq!(parse_peaks("[(1,2);]").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_peaks("(1,2)"),
            Err(BracketedParseError::MissingBrackets(_))
        ));
        assert!(matches!(
            parse_peaks("[1,2]"),
            Err(BracketedParseError::MalformedTuple { index: 0, .. })
        ));
        assert!(matches!(
            parse_peaks("[(1,2);(3)]"),
            Err(BracketedParseError::NotEnoughFields { index: 1, .. })
        ));
        assert!(matches!(
            parse_peaks("[(1,abc)]"),
            Err(BracketedParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_peaks("[(1,2,-3)]"),
            Err(BracketedParseError::InvalidAtomIndex { .. })
        ));
        assert!(matches!(
            parse_peaks("[(-1,2)]"),
            Err(BracketedParseError::InvalidPeak { .. })
        ));
    }

    #[test]
    fn test_format_then_parse_is_exact() {
        let peaks = vec![
            PredictedPeak::new(0.1 + 0.2, 1.0 / 3.0, AtomIndices::new(vec![5, 1, 3])),
            PredictedPeak::new(123456.789012345, 1e-12, AtomIndices::default()),
            PredictedPeak::new(91.05422664, 0.0, AtomIndices::new(vec![0])),
        ];
        let text = format_peaks(&peaks);
        assert!(text.starts_with("[(0.30000000000000004,"));
        let parsed = parse_peaks(&text).unwrap();
        assert_eq!(parsed, peaks);

        let mut buffer = Vec::new();
        write_peaks(&mut buffer, &parsed).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), format!("{text}\n"));
        assert_eq!(format_peaks::<PredictedPeak>(&[]), "[]");
    }

    #[test]
    fn test_read_pair() {
        use crate::classify::{classify, PeakGroup, UnannotatedPolicy};

        let results = read_bracketed_pair(
            "[(43.0178,0.35);(121.0284,0.4,3,4);(163.039,0.1);(65.0386,0.15,7)]",
            "[(43.01785,0.5,0,1,2);(121.0284,1.0,3,4,5)]",
            "CC(=O)OC1=CC=CC=C1C(=O)O",
            "energy_20",
            Tolerance::PPM(15.0),
        )
        .unwrap();
        assert_eq!(results.smiles, "CC(=O)OC1=CC=CC=C1C(=O)O");
        assert_eq!(results.len(), 1);
        let record = &results.spectra[0];
        assert_eq!(record.name, "energy_20");
        assert_eq!(record.pred_spectrum.len(), 2);

        let matched: Vec<bool> = record.msrd_spectrum.iter().map(|p| p.is_matched).collect();
        assert_eq!(matched, vec![true, true, false, false]);
        // The unannotated match borrows its partner's atoms, the annotated one keeps its own
        assert_eq!(record.msrd_spectrum[0].atom_indices.as_slice(), &[0, 1, 2]);
        assert_eq!(record.msrd_spectrum[1].atom_indices.as_slice(), &[3, 4]);

        let classes = classify(&record.msrd_spectrum, UnannotatedPolicy::Distinct);
        assert_eq!(classes.indices(PeakGroup::AnnotatedMatched), &[0, 1]);
        assert_eq!(classes.indices(PeakGroup::NotAnnotatedNotMatched), &[2]);
        assert_eq!(classes.indices(PeakGroup::AnnotatedNotMatched), &[3]);

        let summary = record.summary().unwrap();
        assert_eq!(summary.recall, 0.5);
        assert!((summary.weighted_recall.unwrap() - 0.75).abs() < 1e-12);

        assert!(matches!(
            read_bracketed_pair("[(1,2)]", "(1,2)", "C", "x", Tolerance::default()),
            Err(BracketedParseError::MissingBrackets(_))
        ));
    }
}
