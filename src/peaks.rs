//! The peak data model shared by every input format and view.
mod atoms;
mod peak;
mod peak_list;

pub use atoms::AtomIndices;
pub use peak::{MeasuredPeak, PeakLike, PredictedPeak};
pub use peak_list::{total_intensity, PeakIndex};
