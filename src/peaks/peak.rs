use std::fmt;

use serde::{Deserialize, Serialize};

use super::atoms::AtomIndices;

/// Common behavior of every peak that can be drawn on a mirror plot.
pub trait PeakLike {
    fn mz(&self) -> f64;
    fn intensity(&self) -> f64;
    fn atom_indices(&self) -> &AtomIndices;

    fn is_annotated(&self) -> bool {
        !self.atom_indices().is_empty()
    }

    /// Check the numeric invariants of a peak read from an external source,
    /// returning a description of the first violation found.
    fn validate(&self) -> Result<(), String> {
        let mz = self.mz();
        let intensity = self.intensity();
        if !mz.is_finite() || mz < 0.0 {
            return Err(format!("m/z must be a non-negative number, got {mz}"));
        }
        if !intensity.is_finite() {
            return Err(format!("intensity must be a finite number, got {intensity}"));
        }
        Ok(())
    }
}

/// A peak of the measured spectrum, carrying whether it was matched to a
/// predicted peak and the substructure it was annotated with.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredPeak {
    pub mz: f64,
    pub intensity: f64,
    #[serde(default, alias = "isMatched", alias = "matched")]
    pub is_matched: bool,
    #[serde(default, alias = "atomIndices")]
    pub atom_indices: AtomIndices,
}

impl MeasuredPeak {
    pub fn new(mz: f64, intensity: f64, is_matched: bool, atom_indices: AtomIndices) -> Self {
        Self {
            mz,
            intensity,
            is_matched,
            atom_indices,
        }
    }
}

impl PeakLike for MeasuredPeak {
    fn mz(&self) -> f64 {
        self.mz
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }

    fn atom_indices(&self) -> &AtomIndices {
        &self.atom_indices
    }
}

impl fmt::Display for MeasuredPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeasuredPeak({}, {}, {}, [{}])",
            self.mz, self.intensity, self.is_matched, self.atom_indices
        )
    }
}

/// A peak of a predicted spectrum, annotated with the fragment that produced it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPeak {
    pub mz: f64,
    pub intensity: f64,
    #[serde(default, alias = "atomIndices")]
    pub atom_indices: AtomIndices,
}

impl PredictedPeak {
    pub fn new(mz: f64, intensity: f64, atom_indices: AtomIndices) -> Self {
        Self {
            mz,
            intensity,
            atom_indices,
        }
    }
}

impl PeakLike for PredictedPeak {
    fn mz(&self) -> f64 {
        self.mz
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }

    fn atom_indices(&self) -> &AtomIndices {
        &self.atom_indices
    }
}

impl fmt::Display for PredictedPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PredictedPeak({}, {}, [{}])",
            self.mz, self.intensity, self.atom_indices
        )
    }
}
