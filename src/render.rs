//! Turning a classified spectrum pair into mirror-plot traces, SVG and HTML.
//!
//! Measured peaks are drawn above the axis, one trace per [`PeakGroup`](crate::classify::PeakGroup),
//! and predicted peaks are drawn inverted below it.
use std::borrow::Cow;
use std::fmt::{self, Write};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::classify::{classify, PeakClassification, SpectrumSummary, UnannotatedPolicy};
use crate::mass_error::Tolerance;
use crate::results::SpectrumRecord;
use crate::similarity::{cosine_similarity, SpectralSimilarity};

mod page;
mod svg;
mod traces;

pub use page::{peak_key, Page};
pub use svg::MirrorPlot;
pub use traces::{
    build_traces, group_style, PartnerPeak, PeakDetails, Trace, TracePoint, PREDICTED_TRACE,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write markup: {0}")]
    Format(
        #[from]
        #[source]
        fmt::Error,
    ),
    #[error("Failed to encode embedded data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Spectrum {index} requested but only {len} are loaded")]
    SpectrumOutOfRange { index: usize, len: usize },
}

/// Escape text for inclusion in HTML or SVG content and attribute values
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// How spectra are classified, compared and drawn
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderOptions {
    pub policy: UnannotatedPolicy,
    pub tolerance: Tolerance,
    pub plot: MirrorPlot,
}

impl RenderOptions {
    pub fn new(policy: UnannotatedPolicy, tolerance: Tolerance) -> Self {
        Self {
            policy,
            tolerance,
            plot: MirrorPlot::default(),
        }
    }
}

/// Everything shown for one spectrum pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSpectrum {
    pub index: usize,
    pub name: String,
    /// Missing when the measured spectrum is empty
    pub summary: Option<SpectrumSummary>,
    pub similarity: SpectralSimilarity,
    pub counts: IndexMap<&'static str, usize>,
    pub traces: Vec<Trace>,
    #[serde(skip)]
    pub svg: String,
}

impl RenderedSpectrum {
    pub fn new(
        index: usize,
        record: &SpectrumRecord,
        options: &RenderOptions,
    ) -> Result<Self, RenderError> {
        let classification = classify(&record.msrd_spectrum, options.policy);
        Self::from_classification(index, record, &classification, options)
    }

    pub fn from_classification(
        index: usize,
        record: &SpectrumRecord,
        classification: &PeakClassification,
        options: &RenderOptions,
    ) -> Result<Self, RenderError> {
        let summary = match record.summary() {
            Ok(summary) => {
                record.check_reported_statistics(&summary);
                Some(summary)
            }
            Err(e) => {
                log::warn!("No statistics for spectrum {:?}: {e}", record.name);
                None
            }
        };
        let similarity = cosine_similarity(
            &record.msrd_spectrum,
            &record.pred_spectrum,
            options.tolerance,
        );
        let traces = build_traces(record, classification);
        let mut svg = String::new();
        options.plot.write_svg(&record.name, &traces, &mut svg)?;
        Ok(Self {
            index,
            name: record.name.clone(),
            summary,
            similarity,
            counts: classification.counts(),
            traces,
            svg,
        })
    }

    /// Write the summary table followed by the plot, wrapped in one element that
    /// the page swaps out when another spectrum is selected.
    pub fn write_fragment<W: Write>(&self, mut output: W) -> Result<(), RenderError> {
        write!(
            output,
            "<div class=\"spectrum\" data-spectrum=\"{}\"><table class=\"summary\">",
            self.index
        )?;
        match &self.summary {
            Some(summary) => {
                write!(
                    output,
                    "<tr><th>Peaks</th><td>{}</td></tr><tr><th>Matched</th><td>{}</td></tr>",
                    summary.n_peaks, summary.n_matched
                )?;
                write!(output, "<tr><th>Recall</th><td>{:.4}</td></tr>", summary.recall)?;
                match summary.weighted_recall {
                    Some(value) => write!(
                        output,
                        "<tr><th>Weighted recall</th><td>{value:.4}</td></tr>"
                    )?,
                    None => write!(output, "<tr><th>Weighted recall</th><td>n/a</td></tr>")?,
                }
            }
            None => write!(output, "<tr><th>Recall</th><td>n/a</td></tr>")?,
        }
        write!(
            output,
            "<tr><th>Cosine</th><td>{:.4} ({} shared)</td></tr>",
            self.similarity.similarity, self.similarity.shared_peaks
        )?;
        for (group, count) in self.counts.iter().filter(|(_, c)| **c > 0) {
            write!(output, "<tr><th>{group}</th><td>{count}</td></tr>")?;
        }
        write!(output, "</table>{}</div>", self.svg)?;
        Ok(())
    }

    pub fn to_fragment(&self) -> Result<String, RenderError> {
        let mut buffer = String::new();
        self.write_fragment(&mut buffer)?;
        Ok(buffer)
    }
}
