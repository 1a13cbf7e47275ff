use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::classify::ClassifyError;
use crate::io::{BracketedParseError, ResultsReadError};
use crate::mass_error::ToleranceParseError;
use crate::predict::PredictError;
use crate::render::RenderError;

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// The ways a command can fail. Every error raised by the library converts into one
/// of these.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Malformed input: {0}")]
    MalformedInput(#[source] BoxedError),
    #[error("Empty spectrum: {0}")]
    EmptySpectrum(#[source] ClassifyError),
    #[error("Failed to load the model: {0}")]
    ModelLoadFailure(#[source] PredictError),
    #[error("Failed to render: {0}")]
    RenderFailure(#[from] RenderError),
    #[error("An IO error occurred: {0}")]
    IO(#[from] io::Error),
}

impl MirrorError {
    pub fn malformed<E: Into<BoxedError>>(error: E) -> Self {
        Self::MalformedInput(error.into())
    }
}

impl From<ResultsReadError> for MirrorError {
    fn from(value: ResultsReadError) -> Self {
        match value {
            ResultsReadError::IOError(e) => Self::IO(e),
            e => Self::malformed(e),
        }
    }
}

impl From<BracketedParseError> for MirrorError {
    fn from(value: BracketedParseError) -> Self {
        Self::malformed(value)
    }
}

impl From<ToleranceParseError> for MirrorError {
    fn from(value: ToleranceParseError) -> Self {
        Self::malformed(value)
    }
}

impl From<ClassifyError> for MirrorError {
    fn from(value: ClassifyError) -> Self {
        match value {
            ClassifyError::UnknownPolicy(_) => Self::malformed(value),
            e => Self::EmptySpectrum(e),
        }
    }
}

impl From<PredictError> for MirrorError {
    fn from(value: PredictError) -> Self {
        match value {
            PredictError::IOError(e) => Self::IO(e),
            e if e.is_model_failure() => Self::ModelLoadFailure(e),
            e => Self::malformed(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: MirrorError = ClassifyError::EmptySpectrum.into();
        assert!(matches!(err, MirrorError::EmptySpectrum(_)));
        let err: MirrorError = ClassifyError::UnknownPolicy("x".into()).into();
        assert!(matches!(err, MirrorError::MalformedInput(_)));

        let err: MirrorError = PredictError::MissingCheckpoint("m/gen.ckpt".into()).into();
        assert!(matches!(err, MirrorError::ModelLoadFailure(_)));
        let err: MirrorError = PredictError::WrongArgumentCount(3).into();
        assert!(matches!(err, MirrorError::MalformedInput(_)));
        let err: MirrorError =
            PredictError::IOError(io::Error::new(io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(err, MirrorError::IO(_)));

        let err: MirrorError =
            ResultsReadError::IOError(io::Error::new(io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(err, MirrorError::IO(_)));
        let err: MirrorError = ResultsReadError::UnknownFormat("a.txt".into()).into();
        assert!(matches!(err, MirrorError::MalformedInput(_)));
        assert!(err.source().is_some());
    }
}
