//! The in-memory form of a comparison results file: one parent structure and any
//! number of measured/predicted spectrum pairs.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{ClassifyError, SpectrumSummary};
use crate::peaks::{MeasuredPeak, PeakLike, PredictedPeak};

/// Reported statistics further than this from the recomputed value are flagged
const STATISTIC_AGREEMENT: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Spectrum {spectrum:?}, {side} peak {index}: {reason}")]
pub struct PeakValidationError {
    pub spectrum: String,
    pub side: &'static str,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_recall: Option<f64>,
    #[serde(default)]
    pub msrd_spectrum: Vec<MeasuredPeak>,
    #[serde(default)]
    pub pred_spectrum: Vec<PredictedPeak>,
}

impl SpectrumRecord {
    pub fn new(
        name: String,
        msrd_spectrum: Vec<MeasuredPeak>,
        pred_spectrum: Vec<PredictedPeak>,
    ) -> Self {
        Self {
            name,
            recall: None,
            weighted_recall: None,
            msrd_spectrum,
            pred_spectrum,
        }
    }

    /// Recompute the summary statistics from the measured peaks
    pub fn summary(&self) -> Result<SpectrumSummary, ClassifyError> {
        SpectrumSummary::from_peaks(&self.msrd_spectrum)
    }

    /// Fill in `recall` and `weighted_recall` from the measured peaks
    pub fn update_statistics(&mut self) -> Result<SpectrumSummary, ClassifyError> {
        let summary = self.summary()?;
        self.recall = Some(summary.recall);
        self.weighted_recall = summary.weighted_recall;
        Ok(summary)
    }

    /// Compare the statistics stored with the record against the recomputed ones,
    /// logging every disagreement. Returns whether they all agree.
    pub fn check_reported_statistics(&self, summary: &SpectrumSummary) -> bool {
        let mut agree = true;
        let pairs = [
            ("recall", self.recall, Some(summary.recall)),
            ("weighted_recall", self.weighted_recall, summary.weighted_recall),
        ];
        for (label, reported, computed) in pairs {
            match (reported, computed) {
                (Some(reported), Some(computed)) => {
                    if (reported - computed).abs() > STATISTIC_AGREEMENT {
                        log::warn!(
                            "Spectrum {:?} reports {label} = {reported} but its peaks give {computed}",
                            self.name
                        );
                        agree = false;
                    }
                }
                (Some(reported), None) => {
                    log::warn!(
                        "Spectrum {:?} reports {label} = {reported} but its peaks carry no intensity",
                        self.name
                    );
                    agree = false;
                }
                (None, _) => {}
            }
        }
        agree
    }

    pub fn validate(&self) -> Result<(), PeakValidationError> {
        let check = |side: &'static str, index: usize, outcome: Result<(), String>| {
            outcome.map_err(|reason| PeakValidationError {
                spectrum: self.name.clone(),
                side,
                index,
                reason,
            })
        };
        for (i, peak) in self.msrd_spectrum.iter().enumerate() {
            check("measured", i, peak.validate())?;
        }
        for (i, peak) in self.pred_spectrum.iter().enumerate() {
            check("predicted", i, peak.validate())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    /// The parent structure every spectrum's atom indices refer to
    #[serde(default)]
    pub smiles: String,
    #[serde(default)]
    pub spectra: Vec<SpectrumRecord>,
}

impl ResultsFile {
    pub fn new(smiles: String, spectra: Vec<SpectrumRecord>) -> Self {
        Self { smiles, spectra }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SpectrumRecord> {
        self.spectra.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.spectra.iter().map(|s| s.name.as_str())
    }

    pub fn validate(&self) -> Result<(), PeakValidationError> {
        self.spectra.iter().try_for_each(|s| s.validate())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::peaks::AtomIndices;

    fn record() -> SpectrumRecord {
        SpectrumRecord::new(
            "scan=1".into(),
            vec![
                MeasuredPeak::new(100.0, 0.5, true, AtomIndices::new(vec![1, 2])),
                MeasuredPeak::new(200.0, 0.3, false, AtomIndices::default()),
            ],
            vec![PredictedPeak::new(100.0, 1.0, AtomIndices::new(vec![1, 2]))],
        )
    }

    #[test_log::test]
    fn test_reported_statistics() {
        let mut rec = record();
        let summary = rec.summary().unwrap();
        assert!(rec.check_reported_statistics(&summary));
        rec.recall = Some(0.9);
        assert!(!rec.check_reported_statistics(&summary));
        rec.update_statistics().unwrap();
        assert_eq!(rec.recall, Some(0.5));
        assert!(rec.check_reported_statistics(&summary));
    }

    #[test_log::test]
    fn test_statistics_without_intensity() {
        let mut rec = record();
        for peak in rec.msrd_spectrum.iter_mut() {
            peak.intensity = 0.0;
        }
        rec.weighted_recall = Some(0.625);
        let summary = rec.summary().unwrap();
        assert_eq!(summary.recall, 0.5);
        assert!(!rec.check_reported_statistics(&summary));
        rec.update_statistics().unwrap();
        assert_eq!(rec.recall, Some(0.5));
        assert_eq!(rec.weighted_recall, None);
        assert!(rec.check_reported_statistics(&summary));
    }

    #[test]
    fn test_validate() {
        let mut rec = record();
        assert!(rec.validate().is_ok());
        rec.pred_spectrum[0].mz = -4.0;
        let err = rec.validate().unwrap_err();
        assert_eq!(err.side, "predicted");
        assert_eq!(err.index, 0);
        let results = ResultsFile::new("CCO".into(), vec![rec]);
        assert!(results.validate().is_err());
    }
}
