//! GTF file parser with gzip support.
//!
//! Parses GTF (Gene Transfer Format) annotation files into flat feature
//! records organized by chromosome. Every feature type is kept; queries
//! decide later which types they accept.

use ahash::AHashMap;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::warn;
use std::io::BufRead;
use std::path::Path;

use crate::parser::util::open_reader;
use crate::types::{Feature, Strand};

/// Parse a GTF file into features grouped by chromosome.
///
/// Supports both plain text and gzip-compressed GTF files. Start
/// coordinates are shifted from GTF's 1-based closed convention to the
/// half-open convention used throughout the crate.
pub fn parse_gtf(path: &Path) -> Result<AHashMap<String, Vec<Feature>>> {
    let reader = open_reader(path)?;
    parse_gtf_reader(reader)
}

/// Parse GTF data from a reader.
pub fn parse_gtf_reader<R: BufRead>(reader: R) -> Result<AHashMap<String, Vec<Feature>>> {
    let mut features_by_chrom: AHashMap<String, Vec<Feature>> = AHashMap::new();

    for line_result in reader.lines() {
        let line = line_result.context("Failed to read GTF line")?;

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            continue;
        }

        let chrom = fields[0];
        let feature_type = fields[2];
        let start: i64 = fields[3]
            .parse()
            .context("Failed to parse start coordinate")?;
        let end: i64 = fields[4]
            .parse()
            .context("Failed to parse end coordinate")?;
        let strand_str = fields[6];
        let raw_attributes = fields[8];

        let strand = match strand_str.parse::<Strand>() {
            Ok(s) => s,
            Err(_) => continue, // Skip entries without valid strand
        };

        if end < start {
            warn!(
                "Skipping GTF entry with end before start {}:{}-{}",
                chrom, start, end
            );
            continue;
        }

        // GTF coordinates are 1-based and end-inclusive; shift the start so
        // features share the half-open convention peaks already use. A 1-bp
        // entry (start == end) then has length 1.
        let start = start - 1;

        let attributes = match parse_attributes(raw_attributes) {
            Some(attributes) => attributes,
            None => {
                warn!("Malformed GTF attribute string: {}", raw_attributes);
                IndexMap::new()
            }
        };

        let feature = Feature::new(
            feature_type.to_string(),
            start,
            end,
            strand,
            raw_attributes.to_string(),
            attributes,
        );
        features_by_chrom
            .entry(chrom.to_string())
            .or_default()
            .push(feature);
    }

    Ok(features_by_chrom)
}

/// Parse a GTF attribute column into an insertion-ordered key/value mapping.
///
/// GTF attributes are in the format: key "value"; key "value"; ...
/// Duplicate keys keep the last value. Returns `None` when any non-empty
/// pair lacks a value token, in which case the whole string is considered
/// malformed.
pub fn parse_attributes(raw: &str) -> Option<IndexMap<String, String>> {
    let mut attributes = IndexMap::new();

    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let cleaned = pair.replace('"', "");
        let mut tokens = cleaned.split_whitespace();
        let key = tokens.next()?;
        let value = tokens.next()?;
        attributes.insert(key.to_string(), value.to_string());
    }

    Some(attributes)
}
