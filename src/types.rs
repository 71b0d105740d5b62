//! Core data structures for peakanno.
//!
//! This module contains the fundamental types used throughout the peak
//! annotation process.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

/// Strand orientation for peaks and features.
///
/// `Unknown` corresponds to the `.` placeholder used by BED and GTF files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Positive,
    Negative,
    Unknown,
}

/// Error type for parsing strand from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandError;

impl fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strand: expected '+', '-' or '.'")
    }
}

impl std::error::Error for ParseStrandError {}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Positive),
            "-" => Ok(Strand::Negative),
            "." => Ok(Strand::Unknown),
            _ => Err(ParseStrandError),
        }
    }
}

impl Strand {
    /// Convert strand to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Positive => "+",
            Strand::Negative => "-",
            Strand::Unknown => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A representative point on a feature used to measure distance from a peak.
///
/// `Start` and `End` are strand-corrected: for minus-strand features the
/// physical coordinates are swapped so that `Start` always denotes the
/// transcription-start-like anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    Center,
    End,
}

impl Anchor {
    /// Fixed evaluation order for anchor resolution and tie-breaking.
    pub const ALL: [Anchor; 3] = [Anchor::Start, Anchor::Center, Anchor::End];

    /// Convert anchor to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Center => "center",
            Anchor::End => "end",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorical label for the geometric relationship between peak and feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RelativeLocation {
    FeatureInsidePeak,
    PeakInsideFeature,
    OverlapStart,
    OverlapEnd,
    Upstream,
    Downstream,
    #[serde(rename = "NA")]
    NotAvailable,
}

impl RelativeLocation {
    /// Convert location to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeLocation::FeatureInsidePeak => "FeatureInsidePeak",
            RelativeLocation::PeakInsideFeature => "PeakInsideFeature",
            RelativeLocation::OverlapStart => "OverlapStart",
            RelativeLocation::OverlapEnd => "OverlapEnd",
            RelativeLocation::Upstream => "Upstream",
            RelativeLocation::Downstream => "Downstream",
            RelativeLocation::NotAvailable => "NA",
        }
    }
}

impl fmt::Display for RelativeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A genomic peak from a BED file (half-open, 0-based coordinates).
#[derive(Debug, Clone)]
pub struct Peak {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub name: String,
    pub score: String,
    pub strand: Strand,
}

impl Peak {
    /// Create a new peak.
    pub fn new(
        chrom: String,
        start: i64,
        end: i64,
        name: String,
        score: String,
        strand: Strand,
    ) -> Self {
        Peak {
            chrom,
            start,
            end,
            name,
            score,
            strand,
        }
    }

    /// Get the peak center (integer division).
    pub fn center(&self) -> i64 {
        (self.start + self.end) / 2
    }

    /// Get the peak length (end - start, half-open).
    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

/// A genomic feature entry from the annotation source. Coordinates are
/// half-open, converted from GTF's 1-based closed form at parse time.
#[derive(Debug, Clone)]
pub struct Feature {
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// The unparsed GTF attribute column.
    pub raw_attributes: String,
    /// Parsed key/value attributes, insertion-ordered, last-value-wins.
    /// Empty when the raw attribute string was malformed.
    pub attributes: IndexMap<String, String>,
}

impl Feature {
    /// Create a new feature.
    pub fn new(
        feature_type: String,
        start: i64,
        end: i64,
        strand: Strand,
        raw_attributes: String,
        attributes: IndexMap<String, String>,
    ) -> Self {
        Feature {
            feature_type,
            start,
            end,
            strand,
            raw_attributes,
            attributes,
        }
    }

    /// Get the feature center (integer division).
    pub fn center(&self) -> i64 {
        (self.start + self.end) / 2
    }

    /// Get the feature length (end - start).
    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    /// Get the strand-corrected position of the given anchor.
    ///
    /// Unknown-strand features are oriented like plus-strand ones.
    pub fn anchor_position(&self, anchor: Anchor) -> i64 {
        match anchor {
            Anchor::Start => {
                if self.strand == Strand::Negative {
                    self.end
                } else {
                    self.start
                }
            }
            Anchor::Center => self.center(),
            Anchor::End => {
                if self.strand == Strand::Negative {
                    self.start
                } else {
                    self.end
                }
            }
        }
    }
}

/// A feature matched to a peak by one query, enriched with geometry.
#[derive(Debug, Clone)]
pub struct FeatureHit {
    pub feature: Feature,
    /// Index of the query this hit was valid for (priority rank).
    pub query_index: usize,
    pub query_name: String,
    /// Anchor that minimized the distance to the peak center.
    pub anchor: Anchor,
    /// Signed distance from peak center to the chosen anchor.
    pub raw_distance: i64,
    /// Absolute value of `raw_distance`.
    pub distance: i64,
    /// Fraction of the peak covered by the feature, rounded to 3 decimals.
    pub ovl_peak: f64,
    /// Fraction of the feature covered by the peak, rounded to 3 decimals.
    pub ovl_feature: f64,
    pub location: RelativeLocation,
}

/// One annotation result for a peak.
///
/// A record with `hit == None` is the degenerate "no feature found" record
/// emitted for peaks without any valid annotation.
#[derive(Debug, Clone)]
pub struct AnnotationRecord {
    pub peak: Peak,
    pub hit: Option<FeatureHit>,
    pub best_hit: bool,
}

impl AnnotationRecord {
    /// Create a record for a peak/hit pair.
    pub fn new(peak: Peak, hit: FeatureHit) -> Self {
        AnnotationRecord {
            peak,
            hit: Some(hit),
            best_hit: false,
        }
    }

    /// Create the degenerate record for an unannotated peak.
    pub fn unannotated(peak: Peak) -> Self {
        AnnotationRecord {
            peak,
            hit: None,
            best_hit: true,
        }
    }

    /// Absolute distance of this record, used for best-hit selection.
    /// Degenerate records have no distance and sort last.
    pub fn distance(&self) -> i64 {
        self.hit.as_ref().map_or(i64::MAX, |h| h.distance)
    }
}
