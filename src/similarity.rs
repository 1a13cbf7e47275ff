//! Cosine similarity between two centroided spectra.
use serde::Serialize;

use crate::mass_error::Tolerance;
use crate::peaks::{PeakIndex, PeakLike};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralSimilarity {
    pub similarity: f64,
    pub shared_peaks: usize,
}

/// Square-root transform the intensities and scale them to unit length
fn prepare<P: PeakLike>(peaks: &[P]) -> Vec<f64> {
    let transformed: Vec<f64> = peaks.iter().map(|p| p.intensity().max(0.0).sqrt()).collect();
    let norm = transformed.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return transformed;
    }
    transformed.into_iter().map(|v| v / norm).collect()
}

/// Compute the cosine similarity of `left` and `right`.
///
/// Every pair of peaks within `tolerance` is a candidate; pairs are accepted greedily by
/// descending intensity product so that each peak is used at most once.
pub fn cosine_similarity<L: PeakLike, R: PeakLike>(
    left: &[L],
    right: &[R],
    tolerance: Tolerance,
) -> SpectralSimilarity {
    let left_weights = prepare(left);
    let right_weights = prepare(right);
    let index = PeakIndex::new(right);

    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (i, peak) in left.iter().enumerate() {
        for j in index.all_peaks_for(peak.mz(), tolerance) {
            let product = left_weights[i] * right_weights[j];
            if product > 0.0 {
                candidates.push((i, j, product));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut left_used = vec![false; left.len()];
    let mut right_used = vec![false; right.len()];
    let mut result = SpectralSimilarity::default();
    for (i, j, product) in candidates {
        if left_used[i] || right_used[j] {
            continue;
        }
        left_used[i] = true;
        right_used[j] = true;
        result.similarity += product;
        result.shared_peaks += 1;
    }
    result.similarity = result.similarity.clamp(0.0, 1.0);
    result
}
