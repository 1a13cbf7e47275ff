//! Pairing measured peaks with predicted peaks by m/z.
use serde::Serialize;

use crate::mass_error::Tolerance;
use crate::peaks::{MeasuredPeak, PeakIndex, PeakLike, PredictedPeak};

/// One measured peak paired with the predicted peak that explains it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakMatch {
    pub measured_index: usize,
    pub predicted_index: usize,
    /// Signed mass error of the measured peak, in the unit of the matcher's tolerance
    pub error: f64,
}

/// Pairs each measured peak with the most intense predicted peak within a [`Tolerance`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PeakMatcher {
    pub tolerance: Tolerance,
}

impl PeakMatcher {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Find the partner of every measured peak that has one. Several measured peaks may
    /// share a predicted partner.
    pub fn match_peaks<M: PeakLike, P: PeakLike>(
        &self,
        measured: &[M],
        predicted: &[P],
    ) -> Vec<PeakMatch> {
        let index = PeakIndex::new(predicted);
        measured
            .iter()
            .enumerate()
            .filter_map(|(i, peak)| {
                index
                    .most_intense_peak_for(peak.mz(), self.tolerance)
                    .map(|j| PeakMatch {
                        measured_index: i,
                        predicted_index: j,
                        error: self.tolerance.call(peak.mz(), predicted[j].mz()),
                    })
            })
            .collect()
    }

    /// Set the match flag of each measured peak from `predicted`. A matched peak that
    /// carries no annotation of its own takes its partner's atom indices.
    pub fn label<M: PeakLike>(&self, measured: &[M], predicted: &[PredictedPeak]) -> Vec<MeasuredPeak> {
        let mut labeled: Vec<MeasuredPeak> = measured
            .iter()
            .map(|p| MeasuredPeak::new(p.mz(), p.intensity(), false, p.atom_indices().clone()))
            .collect();
        let matches = self.match_peaks(measured, predicted);
        log::debug!(
            "Matched {} of {} measured peaks against {} predicted peaks within {}",
            matches.len(),
            measured.len(),
            predicted.len(),
            self.tolerance
        );
        for m in matches {
            let peak = &mut labeled[m.measured_index];
            peak.is_matched = true;
            if peak.atom_indices.is_empty() {
                peak.atom_indices = predicted[m.predicted_index].atom_indices.clone();
            }
        }
        labeled
    }
}
