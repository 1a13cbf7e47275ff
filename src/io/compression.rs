use std::fs;
use std::io::{self, prelude::*, BufReader};
use std::path;

use flate2::bufread::GzDecoder;

pub fn is_gzipped(header: &[u8]) -> bool {
    header.starts_with(b"\x1f\x8b")
}

pub fn is_gzipped_extension(path: path::PathBuf) -> (bool, path::PathBuf) {
    if let Some(ext) = path.extension() {
        if ext.to_ascii_lowercase() == "gz" {
            (true, path.with_extension(""))
        } else {
            (false, path)
        }
    } else {
        (false, path)
    }
}

/// Open a file for buffered reading, transparently decompressing it if it starts
/// with the GZIP magic bytes.
pub fn open_decompressed<P: AsRef<path::Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let handle = fs::File::open(path.as_ref())?;
    let mut stream = BufReader::new(handle);
    let header = stream.fill_buf()?;
    if is_gzipped(header) {
        log::debug!("Decompressing {}", path.as_ref().display());
        Ok(Box::new(BufReader::new(GzDecoder::new(stream))))
    } else {
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use flate2::{write::GzEncoder, Compression};

    #[test]
    fn test_extension() {
        let (gz, stem) = is_gzipped_extension("results.json.gz".into());
        assert!(gz);
        assert_eq!(stem, path::PathBuf::from("results.json"));
        let (gz, stem) = is_gzipped_extension("results.csv".into());
        assert!(!gz);
        assert_eq!(stem, path::PathBuf::from("results.csv"));
    }

    #[test]
    fn test_open_decompressed() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, "hello\n")?;

        let packed = dir.path().join("packed.txt.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&packed)?, Compression::default());
        encoder.write_all(b"hello\n")?;
        encoder.finish()?;

        for p in [plain, packed] {
            let mut text = String::new();
            open_decompressed(&p)?.read_to_string(&mut text)?;
            assert_eq!(text, "hello\n");
        }
        Ok(())
    }
}
