//! Driving a pretrained fragmentation model: validate the run's parameters, find the
//! model's checkpoints, run inference and write the annotated fragments as JSON.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod fragments;
mod model;
mod params;

pub use fragments::{FragmentRecord, Prediction};
pub use model::{
    Checkpoints, ExternalModel, FragmentationModel, ModelRequest, DEFAULT_PREDICTOR,
    GENERATION_CHECKPOINT, INTENSITY_CHECKPOINT, PREDICTOR_ENV_VAR,
};
pub use params::{Device, Ionization, PredictParams, PREDICT_ARGUMENT_COUNT};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Expected 9 arguments, got {0}")]
    WrongArgumentCount(usize),
    #[error("Invalid {name} {value:?}: {reason}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("Model directory {0} does not exist")]
    MissingModelDirectory(PathBuf),
    #[error("Model checkpoint {0} does not exist")]
    MissingCheckpoint(PathBuf),
    #[error("Could not start predictor {program}: {source}")]
    ModelUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Predictor {program} failed ({status}): {stderr}")]
    ModelFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Predictor output is malformed: {0}")]
    InvalidModelOutput(String),
    #[error("Fragment {key:?} is malformed: {reason}")]
    InvalidFragment { key: String, reason: String },
    #[error("An IO error occurred: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PredictError {
    /// Whether the error stems from the model rather than from how it was invoked
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingModelDirectory(_)
                | Self::MissingCheckpoint(_)
                | Self::ModelUnavailable { .. }
                | Self::ModelFailed { .. }
                | Self::InvalidModelOutput(_)
                | Self::InvalidFragment { .. }
        )
    }
}

/// Run `model` as configured by `params` and write its fragments to
/// [`PredictParams::output_path`]
pub fn run_prediction<M: FragmentationModel + ?Sized>(
    params: &PredictParams,
    model: &M,
) -> Result<Prediction, PredictError> {
    let checkpoints = Checkpoints::locate(&params.model_dir)?;
    let request = ModelRequest::new(params, &checkpoints);
    log::info!(
        "Predicting fragments of {} as {} on {} (max nodes {}, threshold {}, binned {})",
        params.smiles,
        params.ionization,
        params.device,
        params.max_nodes,
        params.threshold,
        params.binned
    );
    let output = model.predict(&request)?;
    let prediction = Prediction::from_model_output(output)?;
    if prediction.is_empty() {
        log::warn!("The model predicted no fragments for {}", params.smiles);
    }
    prediction.write_to_path(params.output_path())?;
    Ok(prediction)
}
