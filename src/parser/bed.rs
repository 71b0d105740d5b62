//! BED peak file parser with gzip support.
//!
//! Parses BED (Browser Extensible Data) files containing genomic peaks.

use anyhow::{Context, Result};
use log::warn;
use std::io::BufRead;
use std::path::Path;

use crate::parser::util::open_reader;
use crate::types::{Peak, Strand};

/// Streaming BED peak reader for chunked processing.
///
/// Provides an iterator-like interface for reading peaks in chunks,
/// enabling memory-efficient processing of large files.
pub struct PeakReader {
    reader: Box<dyn BufRead + Send>,
}

impl PeakReader {
    /// Create a new PeakReader from a file path (supports .gz).
    pub fn new(path: &Path) -> Result<Self> {
        let reader = open_reader(path).context("Failed to open BED file")?;
        Ok(PeakReader { reader })
    }

    /// Read the next chunk of peaks from the BED file.
    ///
    /// Returns `None` when EOF is reached. Peaks are returned in file order,
    /// preserving the original ordering for deterministic output.
    pub fn read_chunk(&mut self, size: usize) -> Result<Option<Vec<Peak>>> {
        let mut peaks = Vec::with_capacity(size);
        let mut line = String::new();

        while peaks.len() < size {
            line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .context("Failed to read BED line")?;

            if bytes_read == 0 {
                // EOF reached
                break;
            }

            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(peak) = parse_line(trimmed) {
                peaks.push(peak);
            }
        }

        if peaks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(peaks))
        }
    }
}

/// Parse a single BED line into a Peak.
///
/// Needs at least chrom/start/end; name, score and strand are optional and
/// default to `chrom:start-end`, `.` and unknown strand. Header lines and
/// zero-length intervals are dropped (the latter with a warning, since the
/// overlap calculator requires positive lengths).
fn parse_line(line: &str) -> Option<Peak> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 3 {
        return None;
    }

    let chrom = fields[0].to_string();

    // Parse failures indicate a header line; skip silently
    let start: i64 = fields[1].parse().ok()?;
    let end: i64 = fields[2].parse().ok()?;

    if end <= start {
        warn!("Skipping zero-length peak {}:{}-{}", chrom, start, end);
        return None;
    }

    let name = fields
        .get(3)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}:{}-{}", chrom, start, end));
    let score = fields
        .get(4)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| ".".to_string());
    let strand = fields
        .get(5)
        .and_then(|s| s.parse::<Strand>().ok())
        .unwrap_or(Strand::Unknown);

    Some(Peak::new(chrom, start, end, name, score, strand))
}
