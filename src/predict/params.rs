use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::PredictError;

/// The number of positional arguments a prediction is configured by
pub const PREDICT_ARGUMENT_COUNT: usize = 9;

static ADDUCT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[M(?:[+-]\d*[A-Za-z][A-Za-z0-9]*)*\]\d*[+-]$").unwrap()
});

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> PredictError {
    PredictError::InvalidArgument {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// An adduct notation such as `[M+H]+` or `[M-H2O+H]+`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ionization(String);

impl Ionization {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Ionization {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if ADDUCT_PATTERN.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(invalid(
                "ionization",
                s,
                "expected an adduct like [M+H]+ or [M-H]-",
            ))
        }
    }
}

impl fmt::Display for Ionization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the model runs inference
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(Option<u32>),
}

impl FromStr for Device {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(None)),
            _ => match lower.strip_prefix("cuda:") {
                Some(ordinal) => ordinal
                    .parse()
                    .map(|i| Self::Cuda(Some(i)))
                    .map_err(|e| invalid("device", s, format!("bad device ordinal: {e}"))),
                None => Err(invalid("device", s, "expected cpu, cuda or cuda:N")),
            },
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(None) => f.write_str("cuda"),
            Self::Cuda(Some(i)) => write!(f, "cuda:{i}"),
        }
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn parse_flag(name: &'static str, value: &str) -> Result<bool, PredictError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "t" => Ok(true),
        "false" | "0" | "no" | "f" => Ok(false),
        _ => Err(invalid(name, value, "expected true or false")),
    }
}

/// Everything one prediction run is configured by
#[derive(Debug, Clone, PartialEq)]
pub struct PredictParams {
    /// The root molecule as a structure string
    pub smiles: String,
    pub ionization: Ionization,
    pub device: Device,
    /// The largest number of fragments the model may expand
    pub max_nodes: usize,
    /// Fragments predicted below this relative intensity are dropped by the model
    pub threshold: f64,
    pub binned: bool,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
}

impl PredictParams {
    /// Read the parameters from the nine positional arguments: root molecule,
    /// ionization, device, max nodes, threshold, binned flag, model directory, output
    /// directory and output file name.
    pub fn from_args<I, S>(args: I) -> Result<Self, PredictError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        if args.len() != PREDICT_ARGUMENT_COUNT {
            return Err(PredictError::WrongArgumentCount(args.len()));
        }
        let arg = |i: usize| args[i].as_ref();

        let smiles = arg(0).trim();
        if smiles.is_empty() {
            return Err(invalid("smiles", smiles, "the root molecule is empty"));
        }
        let max_nodes: usize = arg(3)
            .trim()
            .parse()
            .map_err(|e| invalid("max_nodes", arg(3), format!("{e}")))?;
        let threshold: f64 = arg(4)
            .trim()
            .parse()
            .map_err(|e| invalid("threshold", arg(4), format!("{e}")))?;
        let output_name = arg(8).trim();

        let params = Self {
            smiles: smiles.to_string(),
            ionization: arg(1).parse()?,
            device: arg(2).parse()?,
            max_nodes,
            threshold,
            binned: parse_flag("binned", arg(5))?,
            model_dir: PathBuf::from(arg(6)),
            output_dir: PathBuf::from(arg(7)),
            output_name: output_name.to_string(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if self.max_nodes == 0 {
            return Err(invalid("max_nodes", "0", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid(
                "threshold",
                &self.threshold.to_string(),
                "must lie between 0 and 1",
            ));
        }
        if self.output_name.is_empty() || self.output_name.contains(['/', '\\']) {
            return Err(invalid(
                "output_name",
                &self.output_name,
                "must be a plain file name",
            ));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}
