use std::io::{self, prelude::*};
use std::path;

use thiserror::Error;

use super::bracketed::BracketedParseError;
use super::compression::{is_gzipped, is_gzipped_extension, open_decompressed};
use super::json::read_results;
use super::table::{read_table, TableError};
use crate::results::{PeakValidationError, ResultsFile};

#[derive(Debug, Error)]
pub enum ResultsReadError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("Malformed JSON results: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed CSV results: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Malformed spectrum string: {0}")]
    Bracketed(#[from] BracketedParseError),
    #[error(transparent)]
    InvalidPeak(#[from] PeakValidationError),
    #[error("Could not determine the format of {0}")]
    UnknownFormat(path::PathBuf),
}

/// The results file formats that can be loaded from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultsFormat {
    JSON,
    CSV,
    Unknown,
}

/// Given a path, infer the file format and whether or not the file at that path is
/// GZIP compressed
pub fn infer_from_path<P: Into<path::PathBuf>>(path: P) -> (ResultsFormat, bool) {
    let path: path::PathBuf = path.into();
    let (is_gzipped, path) = is_gzipped_extension(path);
    let form = match path
        .extension()
        .and_then(|ext| ext.to_ascii_lowercase().to_str().map(|s| s.to_string()))
        .as_deref()
    {
        Some("json") => ResultsFormat::JSON,
        Some("csv") => ResultsFormat::CSV,
        _ => ResultsFormat::Unknown,
    };
    (form, is_gzipped)
}

/// Given the leading bytes of a decompressed stream, guess its format
pub fn infer_from_buffer(buf: &[u8]) -> ResultsFormat {
    let text = String::from_utf8_lossy(buf);
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        return ResultsFormat::JSON;
    }
    let header = trimmed.lines().next().unwrap_or_default().to_ascii_lowercase();
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns.contains(&"type") && columns.contains(&"mz") {
        ResultsFormat::CSV
    } else {
        ResultsFormat::Unknown
    }
}

/// Given a stream of bytes, infer the file format and whether or not the stream
/// is GZIP compressed.
pub fn infer_from_stream<R: BufRead>(stream: &mut R) -> io::Result<(ResultsFormat, bool)> {
    let buf = stream.fill_buf()?;
    if is_gzipped(buf) {
        let mut decoder = flate2::bufread::GzDecoder::new(buf).take(512);
        let mut head = Vec::with_capacity(512);
        // Only the buffered prefix of the stream is available, so running out of input is expected
        if let Err(e) = decoder.read_to_end(&mut head) {
            log::trace!("Stopped decompressing header after {} bytes: {e}", head.len());
        }
        Ok((infer_from_buffer(&head), true))
    } else {
        Ok((infer_from_buffer(buf), false))
    }
}

/// Given a path, infer the file format and whether or not the file at that path is
/// GZIP compressed, using both the file name and by trying to open and read the file
/// header
pub fn infer_format<P: Into<path::PathBuf>>(path: P) -> io::Result<(ResultsFormat, bool)> {
    let path: path::PathBuf = path.into();
    let (format, is_gzipped) = infer_from_path(&path);
    match format {
        ResultsFormat::Unknown => {
            let mut stream = io::BufReader::new(std::fs::File::open(&path)?);
            infer_from_stream(&mut stream)
        }
        _ => Ok((format, is_gzipped)),
    }
}

/// Open a results file of any supported format. A table holds a single spectrum,
/// which is named `title`, defaulting to the file's stem.
pub fn open_results<P: AsRef<path::Path>>(
    path: P,
    title: Option<&str>,
) -> Result<ResultsFile, ResultsReadError> {
    let path = path.as_ref();
    let (format, _) = infer_format(path)?;
    log::info!("Reading {format:?} results from {}", path.display());
    let stream = open_decompressed(path)?;
    match format {
        ResultsFormat::JSON => read_results(stream),
        ResultsFormat::CSV => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            read_table(stream, title.unwrap_or(&stem))
        }
        ResultsFormat::Unknown => Err(ResultsReadError::UnknownFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    use flate2::{write::GzEncoder, Compression};

    #[test]
    fn test_infer_from_path() {
        assert_eq!(infer_from_path("a/b.json"), (ResultsFormat::JSON, false));
        assert_eq!(infer_from_path("a/b.CSV.gz"), (ResultsFormat::CSV, true));
        assert_eq!(infer_from_path("a/b.txt"), (ResultsFormat::Unknown, false));
    }

    #[test]
    fn test_infer_from_buffer() {
        assert_eq!(infer_from_buffer(b"  \n{\"smiles\": \"C\"}"), ResultsFormat::JSON);
        assert_eq!(
            infer_from_buffer(b"type, mz, intensity, matchedMsrdPeak, atomIndices\nmsrd,1,1,,\n"),
            ResultsFormat::CSV
        );
        assert_eq!(infer_from_buffer(b"BEGIN IONS\n"), ResultsFormat::Unknown);
    }

    #[test]
    fn test_open_sniffed_and_compressed() -> Result<(), ResultsReadError> {
        let dir = tempfile::tempdir()?;
        let source = fs::read("./test/data/results.json")?;

        let unlabeled = dir.path().join("results.dat");
        fs::write(&unlabeled, &source)?;
        let results = open_results(&unlabeled, None)?;
        assert_eq!(results.len(), 2);

        let packed = dir.path().join("results.bin");
        let mut encoder = GzEncoder::new(fs::File::create(&packed)?, Compression::default());
        encoder.write_all(&source)?;
        encoder.finish()?;
        assert_eq!(infer_format(&packed)?, (ResultsFormat::JSON, true));
        assert_eq!(open_results(&packed, None)?, results);

        let table = open_results("./test/data/peaks.csv", None)?;
        assert_eq!(table.spectra[0].name, "peaks");

        let junk = dir.path().join("junk.txt");
        fs::write(&junk, "nothing to see")?;
        assert!(matches!(
            open_results(&junk, None),
            Err(ResultsReadError::UnknownFormat(_))
        ));
        Ok(())
    }
}
