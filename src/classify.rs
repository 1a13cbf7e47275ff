//! Bucketing measured peaks by whether they were matched and annotated, and the
//! recall statistics derived from those buckets.
//!
//! Every view goes through [`PeakGroup::assign`], so the treatment of peaks that are
//! neither matched nor annotated is controlled in exactly one place by an
//! [`UnannotatedPolicy`].
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::peaks::{total_intensity, MeasuredPeak, PeakLike};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("The measured spectrum contains no peaks")]
    EmptySpectrum,
    #[error("The measured spectrum's intensities sum to zero")]
    ZeroTotalIntensity,
    #[error("Unknown classification policy {0:?}, expected one of `distinct`, `unknown-fragment` or `merge`")]
    UnknownPolicy(String),
}

/// What to do with a measured peak that is neither matched nor annotated
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnannotatedPolicy {
    /// Keep them in their own [`PeakGroup::NotAnnotatedNotMatched`] bucket
    #[default]
    Distinct,
    /// Label them [`PeakGroup::UnknownFragment`]
    UnknownFragment,
    /// Fold them into [`PeakGroup::AnnotatedNotMatched`]
    MergeWithAnnotated,
}

impl FromStr for UnannotatedPolicy {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "distinct" => Ok(Self::Distinct),
            "unknown-fragment" | "unknown" => Ok(Self::UnknownFragment),
            "merge" | "merge-with-annotated" => Ok(Self::MergeWithAnnotated),
            _ => Err(ClassifyError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for UnannotatedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Distinct => "distinct",
            Self::UnknownFragment => "unknown-fragment",
            Self::MergeWithAnnotated => "merge",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakGroup {
    AnnotatedMatched,
    NotAnnotatedMatched,
    AnnotatedNotMatched,
    NotAnnotatedNotMatched,
    UnknownFragment,
}

impl PeakGroup {
    /// Every group, in the order they are reported and drawn
    pub const ALL: [PeakGroup; 5] = [
        Self::AnnotatedMatched,
        Self::NotAnnotatedMatched,
        Self::AnnotatedNotMatched,
        Self::NotAnnotatedNotMatched,
        Self::UnknownFragment,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::AnnotatedMatched => "annotated_matched",
            Self::NotAnnotatedMatched => "not_annotated_matched",
            Self::AnnotatedNotMatched => "annotated_not_matched",
            Self::NotAnnotatedNotMatched => "not_annotated_not_matched",
            Self::UnknownFragment => "unknown_fragment",
        }
    }

    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::AnnotatedMatched | Self::NotAnnotatedMatched)
    }

    pub const fn assign(is_matched: bool, is_annotated: bool, policy: UnannotatedPolicy) -> Self {
        match (is_matched, is_annotated) {
            (true, true) => Self::AnnotatedMatched,
            (true, false) => Self::NotAnnotatedMatched,
            (false, true) => Self::AnnotatedNotMatched,
            (false, false) => match policy {
                UnannotatedPolicy::Distinct => Self::NotAnnotatedNotMatched,
                UnannotatedPolicy::UnknownFragment => Self::UnknownFragment,
                UnannotatedPolicy::MergeWithAnnotated => Self::AnnotatedNotMatched,
            },
        }
    }

    pub fn of<P: PeakLike>(peak: &P, is_matched: bool, policy: UnannotatedPolicy) -> Self {
        Self::assign(is_matched, peak.is_annotated(), policy)
    }
}

impl fmt::Display for PeakGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The partition of a measured spectrum into [`PeakGroup`]s. Peaks are referred to
/// by their position in the classified slice.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakClassification {
    pub policy: UnannotatedPolicy,
    groups: IndexMap<PeakGroup, Vec<usize>>,
    assignments: Vec<PeakGroup>,
}

impl PeakClassification {
    pub fn new(peaks: &[MeasuredPeak], policy: UnannotatedPolicy) -> Self {
        let mut groups: IndexMap<PeakGroup, Vec<usize>> =
            PeakGroup::ALL.iter().map(|g| (*g, Vec::new())).collect();
        let mut assignments = Vec::with_capacity(peaks.len());
        for (i, peak) in peaks.iter().enumerate() {
            let group = PeakGroup::of(peak, peak.is_matched, policy);
            groups.entry(group).or_default().push(i);
            assignments.push(group);
        }
        Self {
            policy,
            groups,
            assignments,
        }
    }

    /// The number of classified peaks
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn group_of(&self, index: usize) -> Option<PeakGroup> {
        self.assignments.get(index).copied()
    }

    pub fn indices(&self, group: PeakGroup) -> &[usize] {
        self.groups.get(&group).map(|v| v.as_slice()).unwrap_or_default()
    }

    pub fn count(&self, group: PeakGroup) -> usize {
        self.indices(group).len()
    }

    /// The non-empty groups in drawing order
    pub fn iter(&self) -> impl Iterator<Item = (PeakGroup, &[usize])> + '_ {
        self.groups
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(g, v)| (*g, v.as_slice()))
    }

    /// Group name to peak count, for every group including empty ones
    pub fn counts(&self) -> IndexMap<&'static str, usize> {
        self.groups.iter().map(|(g, v)| (g.name(), v.len())).collect()
    }
}

pub fn classify(peaks: &[MeasuredPeak], policy: UnannotatedPolicy) -> PeakClassification {
    PeakClassification::new(peaks, policy)
}

/// The fraction of measured peaks that were matched
pub fn recall(peaks: &[MeasuredPeak]) -> Result<f64, ClassifyError> {
    if peaks.is_empty() {
        return Err(ClassifyError::EmptySpectrum);
    }
    let matched = peaks.iter().filter(|p| p.is_matched).count();
    Ok(matched as f64 / peaks.len() as f64)
}

/// The fraction of measured intensity carried by matched peaks
pub fn weighted_recall(peaks: &[MeasuredPeak]) -> Result<f64, ClassifyError> {
    if peaks.is_empty() {
        return Err(ClassifyError::EmptySpectrum);
    }
    let total = total_intensity(peaks);
    if total == 0.0 {
        return Err(ClassifyError::ZeroTotalIntensity);
    }
    Ok(matched_intensity(peaks) / total)
}

fn matched_intensity(peaks: &[MeasuredPeak]) -> f64 {
    peaks
        .iter()
        .filter(|p| p.is_matched)
        .map(|p| p.intensity)
        .sum()
}

/// Summary statistics of one measured spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumSummary {
    pub n_peaks: usize,
    pub n_matched: usize,
    pub matched_intensity: f64,
    pub total_intensity: f64,
    pub recall: f64,
    /// `None` when the measured peaks carry no intensity
    pub weighted_recall: Option<f64>,
}

impl SpectrumSummary {
    /// Summarize a non-empty measured spectrum. A spectrum whose intensities are all
    /// zero still has a recall, only its weighted recall is left undefined.
    pub fn from_peaks(peaks: &[MeasuredPeak]) -> Result<Self, ClassifyError> {
        let recall = recall(peaks)?;
        let weighted_recall = match weighted_recall(peaks) {
            Ok(value) => Some(value),
            Err(ClassifyError::ZeroTotalIntensity) => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            n_peaks: peaks.len(),
            n_matched: peaks.iter().filter(|p| p.is_matched).count(),
            matched_intensity: matched_intensity(peaks),
            total_intensity: total_intensity(peaks),
            recall,
            weighted_recall,
        })
    }
}
