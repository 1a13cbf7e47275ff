use crate::mass_error::Tolerance;

use super::peak::PeakLike;

/// An m/z-ordered view over a borrowed peak list that answers tolerance queries
/// in terms of the positions of peaks in the original, unsorted list.
#[derive(Debug, Clone)]
pub struct PeakIndex<'a, P: PeakLike> {
    peaks: &'a [P],
    order: Vec<usize>,
}

impl<'a, P: PeakLike> PeakIndex<'a, P> {
    pub fn new(peaks: &'a [P]) -> Self {
        let mut order: Vec<usize> = (0..peaks.len()).collect();
        order.sort_by(|a, b| peaks[*a].mz().total_cmp(&peaks[*b].mz()));
        Self { peaks, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a P> {
        self.peaks.get(index)
    }

    fn _search_by(&self, query: f64) -> usize {
        self.order
            .partition_point(|i| self.peaks[*i].mz() < query)
    }

    /// All positions of peaks whose m/z lies within `tolerance` of `query`, in m/z order
    pub fn all_peaks_for(&self, query: f64, tolerance: Tolerance) -> Vec<usize> {
        let (lower_bound, upper_bound) = tolerance.reference_bounds(query);
        let start = self._search_by(lower_bound);
        self.order[start..]
            .iter()
            .copied()
            .take_while(|i| self.peaks[*i].mz() <= upper_bound)
            .filter(|i| tolerance.test(query, self.peaks[*i].mz()))
            .collect()
    }

    /// The most intense peak within `tolerance` of `query`. Ties go to the lower m/z.
    pub fn most_intense_peak_for(&self, query: f64, tolerance: Tolerance) -> Option<usize> {
        let mut best: Option<usize> = None;
        for i in self.all_peaks_for(query, tolerance) {
            match best {
                Some(j) if self.peaks[j].intensity() >= self.peaks[i].intensity() => {}
                _ => best = Some(i),
            }
        }
        best
    }
}

pub fn total_intensity<P: PeakLike>(peaks: &[P]) -> f64 {
    peaks.iter().map(|p| p.intensity()).sum()
}
