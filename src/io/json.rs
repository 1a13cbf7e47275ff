//! Reading and writing comparison results stored as JSON:
//!
//! ```json
//! {
//!   "smiles": "CCO",
//!   "spectra": [
//!     {
//!       "name": "collision energy 20",
//!       "recall": 0.5,
//!       "weighted_recall": 0.625,
//!       "msrd_spectrum": [{"mz": 100.0, "intensity": 0.5, "is_matched": true, "atom_indices": [1, 2]}],
//!       "pred_spectrum": [{"mz": 100.0, "intensity": 1.0, "atom_indices": [1, 2]}]
//!     }
//!   ]
//! }
//! ```
use std::io;

use super::ResultsReadError;
use crate::results::ResultsFile;

pub fn read_results<R: io::Read>(reader: R) -> Result<ResultsFile, ResultsReadError> {
    let results: ResultsFile = serde_json::from_reader(reader)?;
    results.validate()?;
    log::debug!(
        "Read {} spectra for {:?} from JSON",
        results.len(),
        results.smiles
    );
    Ok(results)
}

pub fn write_results<W: io::Write>(writer: W, results: &ResultsFile) -> Result<(), ResultsReadError> {
    serde_json::to_writer_pretty(writer, results)?;
    Ok(())
}
