use std::env;
use std::ffi::OsString;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use serde_json::Value;

use super::params::{Device, Ionization, PredictParams};
use super::PredictError;

/// The file name of the fragment generation checkpoint inside a model directory
pub const GENERATION_CHECKPOINT: &str = "gen.ckpt";
/// The file name of the intensity checkpoint inside a model directory
pub const INTENSITY_CHECKPOINT: &str = "inten.ckpt";

/// The environment variable naming the predictor program
pub const PREDICTOR_ENV_VAR: &str = "MZMIRROR_PREDICTOR";
pub const DEFAULT_PREDICTOR: &str = "mzmirror-model";

/// The two pretrained checkpoints a model directory must hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoints {
    pub generation: PathBuf,
    pub intensity: PathBuf,
}

impl Checkpoints {
    pub fn locate<P: AsRef<Path>>(model_dir: P) -> Result<Self, PredictError> {
        let model_dir = model_dir.as_ref();
        if !model_dir.is_dir() {
            return Err(PredictError::MissingModelDirectory(model_dir.to_path_buf()));
        }
        let generation = model_dir.join(GENERATION_CHECKPOINT);
        let intensity = model_dir.join(INTENSITY_CHECKPOINT);
        for checkpoint in [&generation, &intensity] {
            if !checkpoint.is_file() {
                return Err(PredictError::MissingCheckpoint(checkpoint.clone()));
            }
        }
        log::debug!(
            "Found checkpoints {} and {}",
            generation.display(),
            intensity.display()
        );
        Ok(Self {
            generation,
            intensity,
        })
    }
}

/// What the model is asked to predict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest<'a> {
    pub smiles: &'a str,
    pub ionization: &'a Ionization,
    pub device: Device,
    pub max_nodes: usize,
    pub threshold: f64,
    pub binned_output: bool,
    pub checkpoints: &'a Checkpoints,
}

impl<'a> ModelRequest<'a> {
    pub fn new(params: &'a PredictParams, checkpoints: &'a Checkpoints) -> Self {
        Self {
            smiles: &params.smiles,
            ionization: &params.ionization,
            device: params.device,
            max_nodes: params.max_nodes,
            threshold: params.threshold,
            binned_output: params.binned,
            checkpoints,
        }
    }
}

/// A pretrained fragmentation and intensity model. Its output is a JSON object mapping
/// each fragment's key to a description holding at least the atom bitmask `frag`.
pub trait FragmentationModel {
    fn predict(&self, request: &ModelRequest<'_>) -> Result<Value, PredictError>;
}

/// A model run as a separate program that reads a [`ModelRequest`] as JSON on its
/// standard input and writes its predictions as JSON to its standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModel {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Default for ExternalModel {
    fn default() -> Self {
        Self::new(DEFAULT_PREDICTOR)
    }
}

impl ExternalModel {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program named by `MZMIRROR_PREDICTOR`, or `mzmirror-model` when unset
    pub fn from_env() -> Self {
        match env::var_os(PREDICTOR_ENV_VAR) {
            Some(program) if !program.is_empty() => Self::new(program),
            _ => Self::default(),
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl FragmentationModel for ExternalModel {
    fn predict(&self, request: &ModelRequest<'_>) -> Result<Value, PredictError> {
        let payload = serde_json::to_vec(request)?;
        log::debug!("Running predictor {}", self.program_name());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PredictError::ModelUnavailable {
                program: self.program_name(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            // A predictor may exit without reading its input, its exit status says why
            if let Err(e) = stdin.write_all(&payload) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
                log::debug!("Predictor closed its input early: {e}");
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(PredictError::ModelFailed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.stderr.is_empty() {
            log::debug!(
                "Predictor said: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| PredictError::InvalidModelOutput(format!("not valid JSON: {e}")))
    }
}
