//! Reading and writing the formats comparison results are exchanged in.
//!
//! Results arrive as a JSON document holding many spectrum pairs, a CSV table holding
//! one pair, or a pair of compact bracketed spectrum strings.

pub mod bracketed;
pub(crate) mod compression;
mod infer_format;
pub mod json;
pub mod table;

pub use crate::io::bracketed::{
    format_peaks, parse_peaks, read_bracketed_pair, write_peaks, BracketedParseError,
};
pub use crate::io::compression::open_decompressed;
pub use crate::io::infer_format::{
    infer_format, infer_from_buffer, infer_from_path, infer_from_stream, open_results,
    ResultsFormat, ResultsReadError,
};
pub use crate::io::json::{read_results, write_results};
pub use crate::io::table::{read_table, write_table, TableError};
