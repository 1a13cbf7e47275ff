use std::fmt::{self, Write};

use super::escape_html;
use super::traces::Trace;

/// Pick a step of 1, 2 or 5 times a power of ten that splits `span` into about
/// `target` intervals
fn nice_step(span: f64, target: usize) -> f64 {
    if !(span.is_finite() && span > 0.0) {
        return 1.0;
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let factor = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Round away the accumulated error of stepping through tick positions
fn tick_label(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Tick positions covering `[low, high]`. Stops early once the step no longer moves
/// the position, which happens when it is lost to rounding at large magnitudes.
fn ticks(low: f64, high: f64, target: usize) -> Vec<f64> {
    let step = nice_step(high - low, target);
    let limit = target.max(1) * 4 + 2;
    let mut value = (low / step).ceil() * step;
    let mut out = Vec::new();
    while value <= high + step * 1e-9 && out.len() < limit {
        out.push(value);
        let next = value + step;
        if next <= value {
            break;
        }
        value = next;
    }
    out
}

/// Lays out a mirror plot: measured traces grow up from the zero line, the predicted
/// trace grows down from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorPlot {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub stroke_width: f64,
}

impl Default for MirrorPlot {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
            margin: 60.0,
            stroke_width: 1.5,
        }
    }
}

impl MirrorPlot {
    /// The m/z range shown, padded so no peak sits on the frame
    pub fn mz_range(traces: &[Trace]) -> (f64, f64) {
        let (low, high) = traces
            .iter()
            .flat_map(|t| t.points.iter())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.mz), hi.max(p.mz))
            });
        if !low.is_finite() {
            return (0.0, 100.0);
        }
        let pad = ((high - low) * 0.05).max(1.0).max(high.abs() * 1e-6);
        ((low - pad).max(0.0), high + pad)
    }

    /// The largest intensity magnitude on either side of the axis
    pub fn intensity_extent(traces: &[Trace]) -> f64 {
        let extent = traces
            .iter()
            .flat_map(|t| t.points.iter())
            .fold(0.0f64, |acc, p| acc.max(p.intensity.abs()));
        if extent > 0.0 {
            extent
        } else {
            1.0
        }
    }

    fn plot_width(&self) -> f64 {
        (self.width - 2.0 * self.margin).max(1.0)
    }

    fn plot_height(&self) -> f64 {
        (self.height - 2.0 * self.margin).max(1.0)
    }

    fn x_of(&self, mz: f64, (low, high): (f64, f64)) -> f64 {
        let span = high - low;
        if !(span.is_finite() && span > 0.0) {
            return self.margin + self.plot_width() / 2.0;
        }
        self.margin + (mz - low) / span * self.plot_width()
    }

    fn y_of(&self, intensity: f64, extent: f64) -> f64 {
        let zero = self.margin + self.plot_height() / 2.0;
        zero - intensity / extent * self.plot_height() / 2.0
    }

    fn write_axes<W: Write>(
        &self,
        output: &mut W,
        mz_range: (f64, f64),
        extent: f64,
    ) -> fmt::Result {
        let left = self.margin;
        let right = self.margin + self.plot_width();
        let top = self.margin;
        let bottom = self.margin + self.plot_height();
        let zero = self.y_of(0.0, extent);

        write!(
            output,
            "<g class=\"axes\" stroke=\"#333\" font-size=\"11\" font-family=\"sans-serif\">"
        )?;
        write!(
            output,
            "<line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{bottom}\"/>"
        )?;
        write!(
            output,
            "<line class=\"zero\" x1=\"{left}\" y1=\"{zero}\" x2=\"{right}\" y2=\"{zero}\"/>"
        )?;
        write!(
            output,
            "<line x1=\"{left}\" y1=\"{bottom}\" x2=\"{right}\" y2=\"{bottom}\"/>"
        )?;

        for tick in ticks(mz_range.0, mz_range.1, 8) {
            let x = self.x_of(tick, mz_range);
            write!(
                output,
                "<line x1=\"{x:.2}\" y1=\"{bottom}\" x2=\"{x:.2}\" y2=\"{}\"/>",
                bottom + 5.0
            )?;
            write!(
                output,
                "<text x=\"{x:.2}\" y=\"{}\" text-anchor=\"middle\" stroke=\"none\">{}</text>",
                bottom + 18.0,
                tick_label(tick)
            )?;
        }
        for tick in ticks(0.0, extent, 4) {
            for signed in [tick, -tick] {
                let y = self.y_of(signed, extent);
                write!(
                    output,
                    "<line x1=\"{}\" y1=\"{y:.2}\" x2=\"{left}\" y2=\"{y:.2}\"/>",
                    left - 5.0
                )?;
                write!(
                    output,
                    "<text x=\"{}\" y=\"{y:.2}\" text-anchor=\"end\" dominant-baseline=\"middle\" stroke=\"none\">{}</text>",
                    left - 8.0,
                    tick_label(tick)
                )?;
                if tick == 0.0 {
                    break;
                }
            }
        }
        write!(
            output,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" stroke=\"none\">m/z</text>",
            left + self.plot_width() / 2.0,
            self.height - 12.0
        )?;
        write!(
            output,
            "<text x=\"14\" y=\"{}\" transform=\"rotate(-90 14 {})\" text-anchor=\"middle\" stroke=\"none\">Intensity</text>",
            self.height / 2.0,
            self.height / 2.0
        )?;
        write!(output, "</g>")
    }

    /// Render `traces` as an `<svg>` element appended to `output`. Every peak is a
    /// `<line>` carrying `data-trace` and `data-index` attributes naming where it came
    /// from, with a `<title>` tooltip.
    pub fn write_svg<W: Write>(&self, title: &str, traces: &[Trace], mut output: W) -> fmt::Result {
        let mz_range = Self::mz_range(traces);
        let extent = Self::intensity_extent(traces);

        write!(
            output,
            "<svg class=\"mirror-plot\" xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
            self.width, self.height, self.width, self.height
        )?;
        write!(
            output,
            "<text class=\"title\" x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-family=\"sans-serif\" font-size=\"14\">{}</text>",
            self.width / 2.0,
            self.margin / 2.0,
            escape_html(title)
        )?;
        self.write_axes(&mut output, mz_range, extent)?;

        let zero = self.y_of(0.0, extent);
        for trace in traces {
            write!(
                output,
                "<g class=\"trace\" data-trace=\"{}\" stroke=\"{}\" stroke-width=\"{}\">",
                trace.key, trace.color, self.stroke_width
            )?;
            for point in trace.points.iter() {
                let x = self.x_of(point.mz, mz_range);
                let y = self.y_of(point.intensity, extent);
                write!(
                    output,
                    "<line data-trace=\"{}\" data-index=\"{}\" x1=\"{x:.2}\" y1=\"{zero:.2}\" x2=\"{x:.2}\" y2=\"{y:.2}\">",
                    trace.key, point.index
                )?;
                write!(
                    output,
                    "<title>{}: m/z {:.4}, intensity {:.4}</title></line>",
                    escape_html(trace.label),
                    point.mz,
                    point.intensity.abs()
                )?;
            }
            write!(output, "</g>")?;
        }

        let mut legend_y = self.margin;
        for trace in traces {
            let x = self.width - self.margin - 170.0;
            write!(
                output,
                "<g class=\"legend\" font-family=\"sans-serif\" font-size=\"11\"><rect x=\"{x}\" y=\"{legend_y}\" width=\"10\" height=\"10\" fill=\"{}\"/><text x=\"{}\" y=\"{}\">{}</text></g>",
                trace.color,
                x + 14.0,
                legend_y + 9.0,
                escape_html(trace.label)
            )?;
            legend_y += 16.0;
        }
        write!(output, "</svg>")
    }

    pub fn to_svg(&self, title: &str, traces: &[Trace]) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        self.write_svg(title, traces, &mut buffer)?;
        Ok(buffer)
    }
}
