use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use mzmirror::io::{open_results, read_bracketed_pair};
use mzmirror::predict::{run_prediction, ExternalModel, PredictParams};
use mzmirror::render::RenderOptions;
use mzmirror::viewer::{default_port, ViewerSession};
use mzmirror::{classify, cosine_similarity, MirrorError, PeakGroup, Tolerance, UnannotatedPolicy};

/// Compare measured and predicted fragmentation spectra
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict a molecule's fragments with a pretrained model and write them as JSON.
    ///
    /// The model program is named by MZMIRROR_PREDICTOR (default `mzmirror-model`).
    Predict {
        /// The root molecule's structure string
        smiles: String,
        /// The adduct, e.g. `[M+H]+`
        ionization: String,
        /// `cpu`, `cuda` or `cuda:N`
        device: String,
        /// The largest number of fragments to expand
        max_nodes: String,
        /// The relative intensity below which fragments are dropped
        threshold: String,
        /// Whether the model writes binned intensities (`true`/`false`)
        binned: String,
        /// The directory holding `gen.ckpt` and `inten.ckpt`
        model_dir: String,
        /// The directory to write the output to, created if missing
        output_dir: String,
        /// The output file name
        output_name: String,
    },
    /// Show measured and predicted spectra as interactive mirror plots
    View {
        #[command(subcommand)]
        source: ViewSource,
    },
    /// Print classification statistics for every spectrum as tab-separated values
    Summarize {
        /// A JSON or CSV results file, optionally gzipped
        path: PathBuf,
        /// The spectrum name to use for a CSV file, defaults to the file name
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        analysis: AnalysisOptions,
    },
}

#[derive(Debug, Subcommand)]
enum ViewSource {
    /// Read many spectrum pairs from a JSON results file
    Json {
        path: PathBuf,
        #[command(flatten)]
        options: ViewOptions,
    },
    /// Read one spectrum pair from a CSV table
    Csv {
        path: PathBuf,
        /// The plot title
        title: String,
        #[command(flatten)]
        options: ViewOptions,
    },
    /// Read one spectrum pair from two bracketed peak lists, `[(mz,intensity,atom,...);...]`.
    ///
    /// Measured peaks are matched to predicted peaks within the tolerance.
    Bracketed {
        measured: String,
        predicted: String,
        /// The parent structure string
        smiles: String,
        /// The plot title
        title: String,
        #[command(flatten)]
        options: ViewOptions,
    },
}

#[derive(Debug, Clone, Args)]
struct AnalysisOptions {
    /// How measured peaks that are neither matched nor annotated are grouped:
    /// `distinct`, `unknown-fragment` or `merge`
    #[arg(long, default_value_t = UnannotatedPolicy::Distinct)]
    policy: UnannotatedPolicy,
    /// The m/z tolerance for matching and similarity, e.g. `15ppm` or `0.02da`
    #[arg(long, default_value_t = Tolerance::default())]
    tolerance: Tolerance,
}

#[derive(Debug, Clone, Args)]
struct ViewOptions {
    /// The local port to serve on, defaults to MZMIRROR_PORT or 8050
    #[arg(long)]
    port: Option<u16>,
    /// Write a self-contained page to this file instead of serving
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[command(flatten)]
    analysis: AnalysisOptions,
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn view(source: ViewSource) -> Result<(), MirrorError> {
    let (title, results, options) = match source {
        ViewSource::Json { path, options } => (file_title(&path), open_results(&path, None)?, options),
        ViewSource::Csv {
            path,
            title,
            options,
        } => {
            let results = open_results(&path, Some(&title))?;
            (title, results, options)
        }
        ViewSource::Bracketed {
            measured,
            predicted,
            smiles,
            title,
            options,
        } => {
            let results = read_bracketed_pair(
                &measured,
                &predicted,
                &smiles,
                &title,
                options.analysis.tolerance,
            )?;
            (title, results, options)
        }
    };
    if results.is_empty() {
        log::warn!("{title} holds no spectra");
    }
    let render_options = RenderOptions::new(options.analysis.policy, options.analysis.tolerance);
    let session = ViewerSession::new(title, results, render_options);

    if let Some(output) = options.output {
        let page = session.static_page()?;
        fs::write(&output, page)?;
        log::info!("Wrote {} spectra to {}", session.len(), output.display());
        return Ok(());
    }
    let port = options.port.unwrap_or_else(default_port);
    serve(session, port)
}

#[cfg(feature = "viewer")]
fn serve(session: ViewerSession, port: u16) -> Result<(), MirrorError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(mzmirror::viewer::run_server(session, port))?;
    Ok(())
}

#[cfg(not(feature = "viewer"))]
fn serve(_session: ViewerSession, _port: u16) -> Result<(), MirrorError> {
    Err(MirrorError::IO(io::Error::new(
        io::ErrorKind::Unsupported,
        "built without the `viewer` feature, pass --output to write a page instead",
    )))
}

fn summarize(
    path: &Path,
    title: Option<&str>,
    options: &AnalysisOptions,
) -> Result<(), MirrorError> {
    let results = open_results(path, title)?;
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    write!(
        out,
        "name\tn_peaks\tn_matched\trecall\tweighted_recall\tcosine\tshared_peaks"
    )?;
    for group in PeakGroup::ALL {
        write!(out, "\t{group}")?;
    }
    writeln!(out)?;

    for record in results.spectra.iter() {
        let summary = match record.summary() {
            Ok(summary) => {
                record.check_reported_statistics(&summary);
                summary
            }
            Err(e) => {
                log::warn!("Skipping spectrum {:?}: {e}", record.name);
                continue;
            }
        };
        let classification = classify(&record.msrd_spectrum, options.policy);
        let similarity =
            cosine_similarity(&record.msrd_spectrum, &record.pred_spectrum, options.tolerance);
        let weighted_recall = summary
            .weighted_recall
            .map(|v| format!("{v:.6}"))
            .unwrap_or_else(|| "n/a".to_string());
        write!(
            out,
            "{}\t{}\t{}\t{:.6}\t{}\t{:.6}\t{}",
            record.name,
            summary.n_peaks,
            summary.n_matched,
            summary.recall,
            weighted_recall,
            similarity.similarity,
            similarity.shared_peaks
        )?;
        for group in PeakGroup::ALL {
            write!(out, "\t{}", classification.count(group))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), MirrorError> {
    match cli.command {
        Command::Predict {
            smiles,
            ionization,
            device,
            max_nodes,
            threshold,
            binned,
            model_dir,
            output_dir,
            output_name,
        } => {
            let params = PredictParams::from_args([
                smiles,
                ionization,
                device,
                max_nodes,
                threshold,
                binned,
                model_dir,
                output_dir,
                output_name,
            ])?;
            let model = ExternalModel::from_env();
            run_prediction(&params, &model)?;
            Ok(())
        }
        Command::View { source } => view(source),
        Command::Summarize {
            path,
            title,
            analysis,
        } => summarize(&path, title.as_deref(), &analysis),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
