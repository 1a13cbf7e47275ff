use serde::Serialize;

use crate::classify::{PeakClassification, PeakGroup};
use crate::matching::PeakMatch;
use crate::peaks::{AtomIndices, PeakLike};
use crate::results::SpectrumRecord;

/// The key of the trace holding the predicted spectrum
pub const PREDICTED_TRACE: &str = "predicted";

const PREDICTED_COLOR: &str = "#1f77b4";

/// The legend label and color each measured group is drawn with
pub const fn group_style(group: PeakGroup) -> (&'static str, &'static str) {
    match group {
        PeakGroup::AnnotatedMatched => ("Annotated, matched", "#2ca02c"),
        PeakGroup::NotAnnotatedMatched => ("Not annotated, matched", "#98df8a"),
        PeakGroup::AnnotatedNotMatched => ("Annotated, not matched", "#d62728"),
        PeakGroup::NotAnnotatedNotMatched => ("Not annotated, not matched", "#7f7f7f"),
        PeakGroup::UnknownFragment => ("Unknown fragment", "#ff7f0e"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    /// The position of the peak in its source spectrum
    pub index: usize,
    pub mz: f64,
    /// Negated for the predicted trace
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub points: Vec<TracePoint>,
}

impl Trace {
    pub fn is_predicted(&self) -> bool {
        self.key == PREDICTED_TRACE
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One trace per non-empty measured group followed by the inverted predicted spectrum,
/// which is always present even when empty.
pub fn build_traces(record: &SpectrumRecord, classification: &PeakClassification) -> Vec<Trace> {
    let mut traces: Vec<Trace> = classification
        .iter()
        .map(|(group, indices)| {
            let (label, color) = group_style(group);
            let points = indices
                .iter()
                .filter_map(|i| record.msrd_spectrum.get(*i).map(|p| (i, p)))
                .map(|(i, p)| TracePoint {
                    index: *i,
                    mz: p.mz,
                    intensity: p.intensity,
                })
                .collect();
            Trace {
                key: group.name(),
                label,
                color,
                points,
            }
        })
        .collect();

    traces.push(Trace {
        key: PREDICTED_TRACE,
        label: "Predicted",
        color: PREDICTED_COLOR,
        points: record
            .pred_spectrum
            .iter()
            .enumerate()
            .map(|(i, p)| TracePoint {
                index: i,
                mz: p.mz(),
                intensity: -p.intensity(),
            })
            .collect(),
    });
    traces
}

/// A peak on the other side of the mirror that was paired with the hovered one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerPeak {
    pub trace: String,
    pub index: usize,
    pub mz: f64,
    pub intensity: f64,
    pub atom_indices: AtomIndices,
}

/// What the viewer shows when a peak is hovered: the fragment's atoms within the
/// parent structure, and those of the peaks it was paired with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDetails {
    pub spectrum: String,
    pub trace: String,
    pub index: usize,
    pub mz: f64,
    pub intensity: f64,
    pub smiles: String,
    pub atom_indices: AtomIndices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<PeakGroup>,
    /// The predicted partner of a measured peak, or every measured peak paired with
    /// a predicted one
    pub partners: Vec<PartnerPeak>,
}

impl PeakDetails {
    /// Look up peak `index` of `trace`. A measured peak is only found under the trace
    /// of the group it was classified into. `matches` pairs the record's measured
    /// peaks with its predicted peaks.
    pub fn lookup(
        smiles: &str,
        record: &SpectrumRecord,
        classification: &PeakClassification,
        matches: &[PeakMatch],
        trace: &str,
        index: usize,
    ) -> Option<Self> {
        let (mz, intensity, atom_indices, group, partners) = if trace == PREDICTED_TRACE {
            let peak = record.pred_spectrum.get(index)?;
            let partners = matches
                .iter()
                .filter(|m| m.predicted_index == index)
                .filter_map(|m| {
                    let partner = record.msrd_spectrum.get(m.measured_index)?;
                    let group = classification.group_of(m.measured_index)?;
                    Some(PartnerPeak {
                        trace: group.name().to_string(),
                        index: m.measured_index,
                        mz: partner.mz,
                        intensity: partner.intensity,
                        atom_indices: partner.atom_indices.clone(),
                    })
                })
                .collect();
            (peak.mz(), peak.intensity(), peak.atom_indices().clone(), None, partners)
        } else {
            let group = classification.group_of(index)?;
            if group.name() != trace {
                return None;
            }
            let peak = record.msrd_spectrum.get(index)?;
            let partners = matches
                .iter()
                .filter(|m| m.measured_index == index)
                .filter_map(|m| {
                    let partner = record.pred_spectrum.get(m.predicted_index)?;
                    Some(PartnerPeak {
                        trace: PREDICTED_TRACE.to_string(),
                        index: m.predicted_index,
                        mz: partner.mz(),
                        intensity: partner.intensity(),
                        atom_indices: partner.atom_indices().clone(),
                    })
                })
                .collect();
            (peak.mz, peak.intensity, peak.atom_indices.clone(), Some(group), partners)
        };
        Some(Self {
            spectrum: record.name.clone(),
            trace: trace.to_string(),
            index,
            mz,
            intensity,
            smiles: smiles.to_string(),
            atom_indices,
            group,
            partners,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::{classify, UnannotatedPolicy};
    use crate::matching::PeakMatcher;
    use crate::peaks::{MeasuredPeak, PredictedPeak};

    fn record() -> SpectrumRecord {
        SpectrumRecord::new(
            "energy_20".into(),
            vec![
                MeasuredPeak::new(100.0, 0.5, true, AtomIndices::new(vec![1, 2])),
                MeasuredPeak::new(150.0, 0.2, true, AtomIndices::new(vec![3])),
                MeasuredPeak::new(200.0, 0.3, false, AtomIndices::default()),
            ],
            vec![
                PredictedPeak::new(100.0, 1.0, AtomIndices::new(vec![1, 2])),
                PredictedPeak::new(150.0, 0.4, AtomIndices::new(vec![3])),
            ],
        )
    }

    #[test]
    fn test_build_traces() {
        let record = record();
        let classification = classify(&record.msrd_spectrum, UnannotatedPolicy::UnknownFragment);
        let traces = build_traces(&record, &classification);
        let keys: Vec<_> = traces.iter().map(|t| t.key).collect();
        assert_eq!(keys, ["annotated_matched", "unknown_fragment", "predicted"]);

        assert_eq!(traces[0].len(), 2);
        assert_eq!(traces[0].points[1].index, 1);
        assert_eq!(traces[1].points[0].index, 2);
        assert_eq!(traces[1].color, "#ff7f0e");

        let predicted = traces.last().unwrap();
        assert!(predicted.is_predicted());
        assert!(predicted.points.iter().all(|p| p.intensity < 0.0));
        assert_eq!(predicted.points[0].intensity, -1.0);

        let measured: usize = traces.iter().filter(|t| !t.is_predicted()).map(|t| t.len()).sum();
        assert_eq!(measured, record.msrd_spectrum.len());
    }

    #[test]
    fn test_peak_details() {
        let record = record();
        let classification = classify(&record.msrd_spectrum, UnannotatedPolicy::Distinct);
        let matches = PeakMatcher::default().match_peaks(&record.msrd_spectrum, &record.pred_spectrum);
        let lookup = |trace: &str, index: usize| {
            PeakDetails::lookup("CCO", &record, &classification, &matches, trace, index)
        };

        let details = lookup("annotated_matched", 1).unwrap();
        assert_eq!(details.mz, 150.0);
        assert_eq!(details.atom_indices.as_slice(), &[3]);
        assert_eq!(details.group, Some(PeakGroup::AnnotatedMatched));
        assert_eq!(details.smiles, "CCO");

        let details = lookup("predicted", 0).unwrap();
        assert_eq!(details.intensity, 1.0);
        assert!(details.group.is_none());

        assert!(lookup("annotated_matched", 2).is_none());
        assert!(lookup("predicted", 5).is_none());
        assert!(lookup("bogus", 0).is_none());
    }

    #[test]
    fn test_peak_partners() {
        let mut record = record();
        record
            .msrd_spectrum
            .push(MeasuredPeak::new(100.0005, 0.1, true, AtomIndices::default()));
        let classification = classify(&record.msrd_spectrum, UnannotatedPolicy::Distinct);
        let matches = PeakMatcher::default().match_peaks(&record.msrd_spectrum, &record.pred_spectrum);
        let lookup = |trace: &str, index: usize| {
            PeakDetails::lookup("CCO", &record, &classification, &matches, trace, index)
        };

        // A measured peak shows the predicted fragment it was paired with
        let details = lookup("annotated_matched", 1).unwrap();
        assert_eq!(details.partners.len(), 1);
        let partner = &details.partners[0];
        assert_eq!(partner.trace, PREDICTED_TRACE);
        assert_eq!(partner.index, 1);
        assert_eq!(partner.intensity, 0.4);
        assert_eq!(partner.atom_indices.as_slice(), &[3]);

        // A predicted peak shows every measured peak paired with it
        let details = lookup(PREDICTED_TRACE, 0).unwrap();
        let partners: Vec<_> = details
            .partners
            .iter()
            .map(|p| (p.trace.as_str(), p.index))
            .collect();
        assert_eq!(
            partners,
            [("annotated_matched", 0), ("not_annotated_matched", 3)]
        );
        assert_eq!(details.partners[0].atom_indices.as_slice(), &[1, 2]);

        let details = lookup("not_annotated_not_matched", 2).unwrap();
        assert!(details.partners.is_empty());
    }
}
