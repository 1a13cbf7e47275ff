use indexmap::IndexMap;

use crate::classify::classify;
use crate::matching::{PeakMatch, PeakMatcher};
use crate::render::{
    peak_key, Page, PeakDetails, RenderError, RenderOptions, RenderedSpectrum,
};
use crate::results::{ResultsFile, SpectrumRecord};

/// The single dataset a viewer shows. Every request is answered by recomputing from
/// the loaded results, nothing is cached between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSession {
    pub title: String,
    pub results: ResultsFile,
    pub options: RenderOptions,
}

impl ViewerSession {
    pub fn new(title: String, results: ResultsFile, options: RenderOptions) -> Self {
        Self {
            title,
            results,
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn record(&self, index: usize) -> Result<&SpectrumRecord, RenderError> {
        self.results
            .get(index)
            .ok_or(RenderError::SpectrumOutOfRange {
                index,
                len: self.len(),
            })
    }

    fn match_peaks(&self, record: &SpectrumRecord) -> Vec<PeakMatch> {
        PeakMatcher::new(self.options.tolerance)
            .match_peaks(&record.msrd_spectrum, &record.pred_spectrum)
    }

    /// Classify and draw spectrum `index`
    pub fn render_spectrum(&self, index: usize) -> Result<RenderedSpectrum, RenderError> {
        let record = self.record(index)?;
        log::debug!("Rendering spectrum {index} ({:?})", record.name);
        RenderedSpectrum::new(index, record, &self.options)
    }

    /// The fragment behind peak `peak` of trace `trace` in spectrum `index`
    pub fn peak_details(&self, index: usize, trace: &str, peak: usize) -> Option<PeakDetails> {
        let record = self.results.get(index)?;
        let classification = classify(&record.msrd_spectrum, self.options.policy);
        let matches = self.match_peaks(record);
        PeakDetails::lookup(
            &self.results.smiles,
            record,
            &classification,
            &matches,
            trace,
            peak,
        )
    }

    /// A page showing spectrum `index`, which fetches other spectra and peak details
    /// from the server
    pub fn page(&self, index: usize) -> Result<String, RenderError> {
        let spectrum = self.render_spectrum(index)?;
        Page::served(
            &self.title,
            &self.results.smiles,
            self.results.names().collect(),
            spectrum,
        )
        .to_html()
    }

    /// A self-contained page holding every spectrum and the details of every peak
    pub fn static_page(&self) -> Result<String, RenderError> {
        let mut spectra = Vec::with_capacity(self.len());
        let mut peak_data = IndexMap::new();
        for (i, record) in self.results.spectra.iter().enumerate() {
            let classification = classify(&record.msrd_spectrum, self.options.policy);
            let rendered =
                RenderedSpectrum::from_classification(i, record, &classification, &self.options)?;
            let matches = self.match_peaks(record);
            for trace in rendered.traces.iter() {
                for point in trace.points.iter() {
                    if let Some(details) = PeakDetails::lookup(
                        &self.results.smiles,
                        record,
                        &classification,
                        &matches,
                        trace.key,
                        point.index,
                    ) {
                        peak_data.insert(peak_key(i, trace.key, point.index), details);
                    }
                }
            }
            spectra.push(rendered);
        }
        log::debug!(
            "Embedding {} spectra and {} peaks in a static page",
            spectra.len(),
            peak_data.len()
        );
        Page::embedded(
            &self.title,
            &self.results.smiles,
            self.results.names().collect(),
            spectra,
            peak_data,
        )
        .to_html()
    }
}
