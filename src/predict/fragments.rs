use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::PredictError;
use crate::peaks::{AtomIndices, PredictedPeak};

fn serialize_frag<S: Serializer>(frag: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    match u64::try_from(*frag) {
        Ok(small) => serializer.serialize_u64(small),
        Err(_) => serializer.collect_str(frag),
    }
}

/// Read a fragment's atom bitmask, given either as a JSON integer or as a decimal
/// string for masks too wide for one
fn decode_frag(key: &str, value: &Value) -> Result<u128, PredictError> {
    let invalid = |reason: String| PredictError::InvalidFragment {
        key: key.to_string(),
        reason,
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| invalid(format!("`frag` {n} is not a non-negative integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|e| invalid(format!("`frag` {s:?} is not a bitmask: {e}"))),
        other => Err(invalid(format!("`frag` has unexpected type: {other}"))),
    }
}

/// One fragment of the root molecule predicted by the model
/// Compare atom indices a model reported alongside `frag` with the mask itself,
/// warning when they describe different atoms. The mask is authoritative either way.
fn reported_atoms_agree(key: &str, frag: u128, reported: Value) -> bool {
    match serde_json::from_value::<AtomIndices>(reported) {
        Ok(atoms) if atoms.to_bitmask() == Some(frag) => true,
        Ok(atoms) => {
            log::warn!(
                "Fragment {key} reports atoms [{atoms}] that disagree with its `frag` {frag}, using the atoms decoded from `frag`"
            );
            false
        }
        Err(e) => {
            log::warn!("Fragment {key} reports unreadable atom indices: {e}");
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentRecord {
    /// Bit `i` is set when atom `i` of the root molecule belongs to the fragment
    #[serde(serialize_with = "serialize_frag")]
    pub frag: u128,
    pub atom_indices: AtomIndices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    /// Any other fields the model reported, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FragmentRecord {
    pub fn new(frag: u128) -> Self {
        Self {
            frag,
            atom_indices: AtomIndices::from_bitmask(frag),
            mz: None,
            intensity: None,
            extra: Map::new(),
        }
    }

    /// Build a record from the model's description of fragment `key`. The atom indices
    /// are always decoded from `frag`.
    pub fn from_model(key: &str, mut fields: Map<String, Value>) -> Result<Self, PredictError> {
        let frag = match fields.remove("frag") {
            Some(value) => decode_frag(key, &value)?,
            None => {
                return Err(PredictError::InvalidFragment {
                    key: key.to_string(),
                    reason: "missing `frag`".into(),
                })
            }
        };
        let mut record = Self::new(frag);
        if let Some(reported) = fields.remove("atom_indices") {
            reported_atoms_agree(key, frag, reported);
        }
        record.mz = fields.remove("mz").and_then(|v| v.as_f64());
        record.intensity = fields.remove("intensity").and_then(|v| v.as_f64());
        record.extra = fields;
        Ok(record)
    }

    pub fn to_peak(&self) -> Option<PredictedPeak> {
        match (self.mz, self.intensity) {
            (Some(mz), Some(intensity)) => Some(PredictedPeak::new(
                mz,
                intensity,
                self.atom_indices.clone(),
            )),
            _ => None,
        }
    }
}

/// The fragments of one prediction, keyed by the model's fragment identifiers in the
/// order the model reported them
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Prediction {
    pub fragments: IndexMap<String, FragmentRecord>,
}

impl Prediction {
    pub fn from_model_output(output: Value) -> Result<Self, PredictError> {
        let entries = match output {
            Value::Object(entries) => entries,
            other => {
                return Err(PredictError::InvalidModelOutput(format!(
                    "expected a JSON object of fragments, got {}",
                    kind_of(&other)
                )))
            }
        };
        let mut fragments = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let fields = match value {
                Value::Object(fields) => fields,
                other => {
                    return Err(PredictError::InvalidFragment {
                        key,
                        reason: format!("expected an object, got {}", kind_of(&other)),
                    })
                }
            };
            let record = FragmentRecord::from_model(&key, fields)?;
            fragments.insert(key, record);
        }
        Ok(Self { fragments })
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The fragments that carry both an m/z and an intensity, as a predicted spectrum
    /// sorted by m/z
    pub fn predicted_peaks(&self) -> Vec<PredictedPeak> {
        let mut peaks: Vec<PredictedPeak> =
            self.fragments.values().filter_map(|f| f.to_peak()).collect();
        peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        peaks
    }

    pub fn write_json<W: io::Write>(&self, writer: W) -> Result<(), PredictError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Write the prediction to `path`, creating its directory if needed
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), PredictError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = io::BufWriter::new(fs::File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        log::info!("Wrote {} fragments to {}", self.len(), path.display());
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_fragments() -> Result<(), PredictError> {
        let output = json!({
            "b3": {"frag": 7, "mz": 43.0178, "intensity": 0.5, "score": 1.25},
            "a1": {"frag": "340282366920938463463374607431768211455"},
            "c9": {"frag": 10, "atom_indices": [9, 9]}
        });
        let prediction = Prediction::from_model_output(output)?;
        let keys: Vec<&str> = prediction.fragments.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["b3", "a1", "c9"]);

        let b3 = &prediction.fragments["b3"];
        assert_eq!(b3.atom_indices.as_slice(), &[0, 1, 2]);
        assert_eq!(b3.extra["score"], json!(1.25));
        assert_eq!(prediction.fragments["a1"].atom_indices.len(), 128);
        assert_eq!(prediction.fragments["c9"].atom_indices.as_slice(), &[1, 3]);

        let peaks = prediction.predicted_peaks();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].mz, 43.0178);
        Ok(())
    }

    #[test_log::test]
    fn test_reported_atoms() {
        assert!(reported_atoms_agree("c9", 10, json!([3, 1])));
        assert!(reported_atoms_agree("c0", 0, json!([])));
        assert!(!reported_atoms_agree("c9", 10, json!([9, 9])));
        assert!(!reported_atoms_agree("c9", 10, json!([1, 3, 200])));
        assert!(!reported_atoms_agree("c9", 10, json!("1,3")));
    }

    #[test]
    fn test_serialize() -> Result<(), PredictError> {
        let mut prediction = Prediction::default();
        prediction.fragments.insert("x".into(), FragmentRecord::new(5));
        prediction.fragments.insert("y".into(), FragmentRecord::new(1 << 100));
        let mut buffer = Vec::new();
        prediction.write_json(&mut buffer)?;
        let value: Value = serde_json::from_slice(&buffer)?;
        assert_eq!(value["x"], json!({"frag": 5, "atom_indices": [0, 2]}));
        assert_eq!(value["y"]["frag"], json!((1u128 << 100).to_string()));
        assert!(value["x"].get("mz").is_none());

        let reread = Prediction::from_model_output(value)?;
        assert_eq!(reread, prediction);
        Ok(())
    }

    #[test]
    fn test_bad_output() {
        assert!(matches!(
            Prediction::from_model_output(json!([1, 2])),
            Err(PredictError::InvalidModelOutput(_))
        ));
        assert!(matches!(
            Prediction::from_model_output(json!({"a": {"mz": 1.0}})),
            Err(PredictError::InvalidFragment { .. })
        ));
        assert!(matches!(
            Prediction::from_model_output(json!({"a": {"frag": -3}})),
            Err(PredictError::InvalidFragment { .. })
        ));
        assert!(matches!(
            Prediction::from_model_output(json!({"a": 3})),
            Err(PredictError::InvalidFragment { .. })
        ));
    }

    #[test]
    fn test_write_to_path() -> Result<(), PredictError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("out.json");
        let mut prediction = Prediction::default();
        prediction.fragments.insert("x".into(), FragmentRecord::new(3));
        prediction.write_to_path(&path)?;
        let value: Value = serde_json::from_reader(fs::File::open(&path)?)?;
        assert_eq!(value["x"]["atom_indices"], json!([0, 1]));
        Ok(())
    }
}
