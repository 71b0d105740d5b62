//! Parsers for genomic file formats.

pub mod bed;
pub mod gtf;
pub mod util;

pub use bed::PeakReader;
pub use gtf::{parse_attributes, parse_gtf};
