//! Compare measured fragmentation spectra against model predictions.
//!
//! Measured peaks are bucketed by whether they were matched to a predicted peak and
//! whether a fragment annotation explains them ([`classify`]), summarized by recall and
//! intensity-weighted recall, and drawn as mirror plots ([`render`], [`viewer`]). The
//! [`predict`] module drives an external fragmentation model and writes its fragments
//! with their atom indices.
pub mod classify;
pub mod error;
pub mod io;
pub mod mass_error;
pub mod matching;
pub mod peaks;
pub mod predict;
pub mod render;
pub mod results;
pub mod similarity;
pub mod viewer;

pub use crate::classify::{
    classify, recall, weighted_recall, ClassifyError, PeakClassification, PeakGroup,
    SpectrumSummary, UnannotatedPolicy,
};
pub use crate::error::MirrorError;
pub use crate::mass_error::Tolerance;
pub use crate::matching::{PeakMatch, PeakMatcher};
pub use crate::peaks::{AtomIndices, MeasuredPeak, PeakLike, PredictedPeak};
pub use crate::results::{ResultsFile, SpectrumRecord};
pub use crate::similarity::{cosine_similarity, SpectralSimilarity};
