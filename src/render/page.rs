use std::fmt::Write;

use indexmap::IndexMap;

use super::traces::PeakDetails;
use super::{escape_html, RenderError, RenderedSpectrum};

const STYLE: &str = "body{font-family:sans-serif;margin:1em 2em}\
.layout{display:flex;gap:2em;align-items:flex-start}\
table.summary{border-collapse:collapse;margin-bottom:1em}\
table.summary th{text-align:left;padding-right:1em;font-weight:normal;color:#555}\
#details{min-width:18em;font-family:monospace;white-space:pre-wrap}\
.mirror-plot line[data-index]:hover{stroke-width:4}";

/// Wires the spectrum selector and the peak hover. A served page asks the server for
/// each plot and peak, a static page looks them up in the embedded data.
const SCRIPT: &str = r#"
(function () {
  const select = document.getElementById('spectrum');
  const plot = document.getElementById('plot');
  const details = document.getElementById('details');
  const embedded = document.getElementById('peak-data');
  const peaks = embedded ? JSON.parse(embedded.textContent) : null;

  function current() {
    return select.value;
  }

  function describe(heading, peak, smiles) {
    return heading + '\n' +
      '  peak: ' + peak.trace + ' #' + peak.index + '\n' +
      '  m/z: ' + peak.mz + '\n' +
      '  intensity: ' + peak.intensity + '\n' +
      '  structure: ' + smiles + '\n' +
      '  atoms: [' + peak.atom_indices.join(', ') + ']';
  }

  function showDetails(data) {
    if (!data) {
      details.textContent = '';
      return;
    }
    const predicted = data.trace === 'predicted';
    const blocks = [describe(predicted ? 'predicted fragment' : 'measured fragment', data, data.smiles)];
    for (const partner of data.partners) {
      blocks.push(describe(predicted ? 'measured fragment' : 'predicted fragment', partner, data.smiles));
    }
    if (data.partners.length === 0) {
      blocks.push(predicted ? 'no measured peak paired' : 'no predicted peak paired');
    }
    details.textContent = 'spectrum: ' + data.spectrum + '\n\n' + blocks.join('\n\n');
  }

  select.addEventListener('change', function () {
    if (peaks) {
      for (const el of plot.querySelectorAll('.spectrum')) {
        el.hidden = el.dataset.spectrum !== current();
      }
      showDetails(null);
      return;
    }
    fetch('/plot/' + current())
      .then(function (r) { return r.text(); })
      .then(function (html) { plot.innerHTML = html; showDetails(null); });
  });

  plot.addEventListener('mouseover', function (event) {
    const target = event.target;
    if (!target.dataset || target.dataset.index === undefined) {
      return;
    }
    const key = current() + '/' + target.dataset.trace + '/' + target.dataset.index;
    if (peaks) {
      showDetails(peaks[key]);
      return;
    }
    fetch('/peak/' + key)
      .then(function (r) { return r.ok ? r.json() : null; })
      .then(showDetails);
  });
})();
"#;

/// The key a peak is embedded under in a static page, and the path it is requested
/// from on a served page
pub fn peak_key(spectrum: usize, trace: &str, index: usize) -> String {
    format!("{spectrum}/{trace}/{index}")
}

/// An HTML page showing one or more rendered spectra with a selector between them.
///
/// A served page holds only the selected spectrum and fetches the rest on demand. A
/// static page holds every spectrum and the details of every peak.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub title: &'a str,
    pub smiles: &'a str,
    pub names: Vec<&'a str>,
    pub selected: usize,
    pub spectra: Vec<RenderedSpectrum>,
    pub peak_data: Option<IndexMap<String, PeakDetails>>,
}

impl<'a> Page<'a> {
    pub fn served(
        title: &'a str,
        smiles: &'a str,
        names: Vec<&'a str>,
        spectrum: RenderedSpectrum,
    ) -> Self {
        Self {
            title,
            smiles,
            names,
            selected: spectrum.index,
            spectra: vec![spectrum],
            peak_data: None,
        }
    }

    pub fn embedded(
        title: &'a str,
        smiles: &'a str,
        names: Vec<&'a str>,
        spectra: Vec<RenderedSpectrum>,
        peak_data: IndexMap<String, PeakDetails>,
    ) -> Self {
        Self {
            title,
            smiles,
            names,
            selected: spectra.first().map(|s| s.index).unwrap_or_default(),
            spectra,
            peak_data: Some(peak_data),
        }
    }

    pub fn is_static(&self) -> bool {
        self.peak_data.is_some()
    }

    pub fn write_html<W: Write>(&self, mut output: W) -> Result<(), RenderError> {
        let title = escape_html(self.title);
        write!(
            output,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{STYLE}</style></head><body>"
        )?;
        write!(output, "<h1>{title}</h1>")?;
        if !self.smiles.is_empty() {
            write!(
                output,
                "<p class=\"structure\">Structure: <code>{}</code></p>",
                escape_html(self.smiles)
            )?;
        }

        write!(output, "<label for=\"spectrum\">Spectrum </label><select id=\"spectrum\">")?;
        for (i, name) in self.names.iter().enumerate() {
            let selected = if i == self.selected { " selected" } else { "" };
            write!(
                output,
                "<option value=\"{i}\"{selected}>{}</option>",
                escape_html(name)
            )?;
        }
        write!(output, "</select>")?;

        write!(output, "<div class=\"layout\"><div id=\"plot\">")?;
        for spectrum in self.spectra.iter() {
            let mut fragment = spectrum.to_fragment()?;
            if spectrum.index != self.selected {
                fragment = fragment.replacen("<div class=\"spectrum\"", "<div hidden class=\"spectrum\"", 1);
            }
            output.write_str(&fragment)?;
        }
        write!(output, "</div><div id=\"details\"></div></div>")?;

        if let Some(peak_data) = &self.peak_data {
            // `</` must not appear inside a script element
            let json = serde_json::to_string(peak_data)?.replace("</", "<\\/");
            write!(
                output,
                "<script type=\"application/json\" id=\"peak-data\">{json}</script>"
            )?;
        }
        write!(output, "<script>{SCRIPT}</script></body></html>")?;
        Ok(())
    }

    pub fn to_html(&self) -> Result<String, RenderError> {
        let mut buffer = String::new();
        self.write_html(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::{classify, UnannotatedPolicy};
    use crate::matching::PeakMatcher;
    use crate::peaks::{AtomIndices, MeasuredPeak, PredictedPeak};
    use crate::render::RenderOptions;
    use crate::results::SpectrumRecord;

    fn record(name: &str) -> SpectrumRecord {
        SpectrumRecord::new(
            name.into(),
            vec![MeasuredPeak::new(100.0, 0.5, true, AtomIndices::new(vec![1, 2]))],
            vec![PredictedPeak::new(100.0, 1.0, AtomIndices::new(vec![1, 2]))],
        )
    }

    #[test]
    fn test_served_page() -> Result<(), RenderError> {
        let spectrum = RenderedSpectrum::new(1, &record("b"), &RenderOptions::default())?;
        let page = Page::served("Viewer", "C<C", vec!["a", "b"], spectrum);
        assert!(!page.is_static());
        let html = page.to_html()?;
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<option value=\"1\" selected>b</option>"));
        assert!(html.contains("<option value=\"0\">a</option>"));
        assert!(html.contains("C&lt;C"));
        assert!(!html.contains("peak-data\">"));
        assert_eq!(html.matches("class=\"spectrum\"").count(), 1);
        Ok(())
    }

    #[test]
    fn test_static_page() -> Result<(), RenderError> {
        let options = RenderOptions::default();
        let records = [record("a"), record("b")];
        let spectra = records
            .iter()
            .enumerate()
            .map(|(i, r)| RenderedSpectrum::new(i, r, &options))
            .collect::<Result<Vec<_>, _>>()?;
        let mut peak_data = IndexMap::new();
        for (i, r) in records.iter().enumerate() {
            let classification = classify(&r.msrd_spectrum, UnannotatedPolicy::Distinct);
            let matches = PeakMatcher::default().match_peaks(&r.msrd_spectrum, &r.pred_spectrum);
            if let Some(details) = PeakDetails::lookup(
                "</script>",
                r,
                &classification,
                &matches,
                "annotated_matched",
                0,
            ) {
                peak_data.insert(peak_key(i, "annotated_matched", 0), details);
            }
        }
        assert_eq!(peak_data.len(), 2);

        let page = Page::embedded("Viewer", "CCO", vec!["a", "b"], spectra, peak_data);
        assert!(page.is_static());
        let html = page.to_html()?;
        assert_eq!(html.matches("class=\"spectrum\"").count(), 2);
        assert_eq!(html.matches("<div hidden class=\"spectrum\"").count(), 1);
        assert!(html.contains("\"1/annotated_matched/0\""));
        assert!(html.contains("<\\/script>"));
        assert!(html.contains("\"partners\":[{\"trace\":\"predicted\",\"index\":0,"));
        assert_eq!(html.matches("</script>").count(), 2);
        Ok(())
    }
}
