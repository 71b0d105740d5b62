//! Per-query validity checks for candidate annotations.
//!
//! A candidate is judged by a fixed, ordered list of named checks. Checks
//! that do not apply to a query are skipped rather than silently passed, and
//! overall validity is the AND over the checks that did run.

use std::fmt;

use crate::config::{Query, StrandRelation};
use crate::types::{FeatureHit, Peak, Strand};

/// Identity of a validity check, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Distance,
    FeatureAnchor,
    Strand,
    RelativeLocation,
    Attribute,
}

impl CheckKind {
    /// Convert check kind to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Distance => "distance",
            CheckKind::FeatureAnchor => "feature_anchor",
            CheckKind::Strand => "strand",
            CheckKind::RelativeLocation => "relative_location",
            CheckKind::Attribute => "attribute",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one applicable check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub passed: bool,
}

/// Distance window check, always applicable.
///
/// The asymmetric `[upstream_max, downstream_max]` window applies to the
/// signed distance; for non-plus-strand features the bounds are swapped.
/// A configured `internals` threshold > 0 relaxes the check when the mutual
/// overlap is large enough.
fn check_distance(hit: &FeatureHit, query: &Query) -> bool {
    let raw = hit.raw_distance;
    let [upstream, downstream] = query.distance;

    let mut passed = if hit.feature.strand == Strand::Positive {
        raw > -upstream && raw < downstream
    } else {
        raw > -downstream && raw < upstream
    };

    if let Some(internals) = query.internals {
        let max_ovl = hit.ovl_peak.max(hit.ovl_feature);
        passed = passed || (internals > 0.0 && max_ovl >= internals);
    }

    passed
}

/// Run every applicable check for a candidate hit against one query.
///
/// The returned list preserves evaluation order; checks whose preconditions
/// are not met by the query (or, for strand, by an unknown peak strand) are
/// absent entirely.
pub fn run_checks(peak: &Peak, hit: &FeatureHit, query: &Query) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(5);

    outcomes.push(CheckOutcome {
        kind: CheckKind::Distance,
        passed: check_distance(hit, query),
    });

    if !query.feature_anchor.is_empty() {
        outcomes.push(CheckOutcome {
            kind: CheckKind::FeatureAnchor,
            passed: query.feature_anchor.contains(&hit.anchor),
        });
    }

    if query.strand != StrandRelation::Ignore && peak.strand != Strand::Unknown {
        let same = peak.strand == hit.feature.strand;
        outcomes.push(CheckOutcome {
            kind: CheckKind::Strand,
            passed: match query.strand {
                StrandRelation::Same => same,
                StrandRelation::Opposite => !same,
                StrandRelation::Ignore => unreachable!(),
            },
        });
    }

    if let Some(ref allowed) = query.relative_location {
        outcomes.push(CheckOutcome {
            kind: CheckKind::RelativeLocation,
            passed: allowed.contains(&hit.location),
        });
    }

    if let Some(ref key) = query.filter_attribute {
        if !query.attribute_values.is_empty() {
            let value = hit.feature.attributes.get(key).cloned();
            outcomes.push(CheckOutcome {
                kind: CheckKind::Attribute,
                passed: query.attribute_values.contains(&value),
            });
        }
    }

    outcomes
}

/// A hit is valid iff every applicable check passed.
pub fn is_valid(peak: &Peak, hit: &FeatureHit, query: &Query) -> bool {
    run_checks(peak, hit, query).iter().all(|c| c.passed)
}
