//! Chromosome-indexed feature lookup.
//!
//! The annotation engine retrieves candidate features through the
//! [`FeatureIndex`] trait; [`GtfIndex`] is the in-memory implementation
//! backed by a parsed GTF file. An unknown chromosome is a distinguishable
//! error rather than an empty result, because it terminates a peak's query
//! loop early.

use std::fmt;
use std::path::Path;

use ahash::AHashMap;
use anyhow::Result;

use crate::parser::gtf::parse_gtf;
use crate::types::Feature;

/// Error returned when the index cannot service a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The requested chromosome is not present in the annotation source.
    UnknownChromosome(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::UnknownChromosome(chrom) => {
                write!(f, "chromosome not found in annotation index: {}", chrom)
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Read-only source of candidate features overlapping a genomic range.
pub trait FeatureIndex {
    /// Fetch all features overlapping `[start, end]` (closed) on `chrom`.
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<&Feature>, IndexError>;
}

/// Find the first feature that could overlap a range starting at
/// `search_start`, given features sorted by start coordinate.
fn find_search_start_index(features: &[Feature], search_start: i64) -> usize {
    features.partition_point(|f| f.start < search_start)
}

/// In-memory feature index built from a GTF file.
///
/// Features are grouped per chromosome and sorted by start. The maximum
/// feature length per chromosome bounds how far back of the query start a
/// potentially overlapping feature can begin, which makes a binary-search
/// window stab correct.
pub struct GtfIndex {
    features_by_chrom: AHashMap<String, Vec<Feature>>,
    max_lengths: AHashMap<String, i64>,
}

impl GtfIndex {
    /// Build an index from features grouped by chromosome.
    pub fn new(mut features_by_chrom: AHashMap<String, Vec<Feature>>) -> Self {
        let mut max_lengths = AHashMap::new();

        for (chrom, features) in features_by_chrom.iter_mut() {
            features.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
            let max_len = features.iter().map(|f| f.end - f.start).max().unwrap_or(0);
            max_lengths.insert(chrom.clone(), max_len);
        }

        GtfIndex {
            features_by_chrom,
            max_lengths,
        }
    }

    /// Parse a GTF file (plain or gzipped) and build an index from it.
    pub fn from_gtf(path: &Path) -> Result<Self> {
        let features_by_chrom = parse_gtf(path)?;
        Ok(Self::new(features_by_chrom))
    }

    /// Number of indexed chromosomes.
    pub fn num_chromosomes(&self) -> usize {
        self.features_by_chrom.len()
    }

    /// Total number of indexed features.
    pub fn num_features(&self) -> usize {
        self.features_by_chrom.values().map(Vec::len).sum()
    }
}

impl FeatureIndex for GtfIndex {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<&Feature>, IndexError> {
        let features = self
            .features_by_chrom
            .get(chrom)
            .ok_or_else(|| IndexError::UnknownChromosome(chrom.to_string()))?;

        let max_len = *self.max_lengths.get(chrom).unwrap_or(&0);
        let search_start = start.saturating_sub(max_len);
        let first = find_search_start_index(features, search_start);

        let mut hits = Vec::new();
        for feature in &features[first..] {
            if feature.start > end {
                break;
            }
            if feature.end >= start {
                hits.push(feature);
            }
        }

        Ok(hits)
    }
}
