//! Query configuration for peakanno.
//!
//! Queries are loaded from a JSON config file and validated up front, before
//! any peak is processed. Invalid configurations abort the run immediately.

use std::fs;
use std::path::Path;

use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::types::{Anchor, RelativeLocation};

/// Requested relation between peak strand and feature strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrandRelation {
    Same,
    Opposite,
    Ignore,
}

/// Distance window as written in the config file: either a single number
/// (symmetric window) or an `[upstream, downstream]` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DistanceSpec {
    Symmetric(i64),
    Pair([i64; 2]),
}

/// One query as written in the config file, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuerySpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    feature: Option<Vec<String>>,
    distance: DistanceSpec,
    #[serde(default)]
    feature_anchor: Option<Vec<Anchor>>,
    #[serde(default)]
    strand: Option<StrandRelation>,
    #[serde(default)]
    internals: Option<f64>,
    #[serde(default)]
    relative_location: Option<Vec<RelativeLocation>>,
    #[serde(default)]
    filter_attribute: Option<String>,
    #[serde(default)]
    attribute_values: Option<Vec<Option<String>>>,
}

/// The config file as a whole.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigSpec {
    queries: Vec<QuerySpec>,
    #[serde(default)]
    priority: bool,
    #[serde(default)]
    show_attributes: Vec<String>,
}

/// A validated matching rule. The position in [`AnnotationConfig::queries`]
/// is the priority rank (index 0 first).
#[derive(Debug, Clone)]
pub struct Query {
    pub name: String,
    /// Allowed feature types; `None` accepts every type.
    pub feature_types: Option<AHashSet<String>>,
    /// Asymmetric distance window `[upstream_max, downstream_max]`.
    pub distance: [i64; 2],
    /// Anchors to consider; empty means all three.
    pub feature_anchor: Vec<Anchor>,
    pub strand: StrandRelation,
    /// Overlap fraction that validates a hit despite a failing distance
    /// window, when > 0.
    pub internals: Option<f64>,
    /// Allowed relative locations; `None` accepts every label.
    pub relative_location: Option<Vec<RelativeLocation>>,
    /// Attribute filter: feature attribute `key` must map to one of the
    /// values. A `None` value accepts the absence of the key.
    pub filter_attribute: Option<String>,
    pub attribute_values: Vec<Option<String>>,
}

impl Query {
    /// Maximal search radius for candidate retrieval.
    pub fn max_distance(&self) -> i64 {
        self.distance[0].max(self.distance[1])
    }
}

/// Validated run configuration: ordered queries plus the run-level
/// priority flag.
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub queries: Vec<Query>,
    /// Stop trying lower-priority queries for a peak once a higher-priority
    /// query yields any valid hit.
    pub priority: bool,
    /// Attribute keys appended as output columns.
    pub show_attributes: Vec<String>,
}

impl AnnotationConfig {
    /// Load and validate a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: ConfigSpec =
            serde_json::from_str(json).context("Failed to parse config JSON")?;
        Self::from_spec(spec)
    }

    fn from_spec(spec: ConfigSpec) -> Result<Self> {
        if spec.queries.is_empty() {
            bail!("Config must contain at least one query");
        }

        let mut queries = Vec::with_capacity(spec.queries.len());
        for (i, q) in spec.queries.into_iter().enumerate() {
            queries.push(validate_query(q, i)?);
        }

        Ok(AnnotationConfig {
            queries,
            priority: spec.priority,
            show_attributes: spec.show_attributes,
        })
    }
}

fn validate_query(spec: QuerySpec, index: usize) -> Result<Query> {
    let name = spec.name.unwrap_or_else(|| format!("query_{}", index));

    let distance = match spec.distance {
        DistanceSpec::Symmetric(d) => [d, d],
        DistanceSpec::Pair(pair) => pair,
    };
    if distance[0] < 0 || distance[1] < 0 {
        bail!(
            "Query '{}': distance window bounds must be non-negative, got [{}, {}]",
            name,
            distance[0],
            distance[1]
        );
    }

    if let Some(internals) = spec.internals {
        if internals < 0.0 {
            bail!(
                "Query '{}': internals threshold must be >= 0, got {}",
                name,
                internals
            );
        }
    }

    if let Some(ref types) = spec.feature {
        if types.is_empty() {
            bail!("Query '{}': feature type list must not be empty", name);
        }
    }

    // The attribute filter needs both a key and at least one value.
    let attribute_values = match (&spec.filter_attribute, &spec.attribute_values) {
        (Some(_), Some(values)) if values.is_empty() => {
            bail!(
                "Query '{}': filter_attribute given but attribute_values is empty",
                name
            );
        }
        (Some(_), None) => {
            bail!(
                "Query '{}': filter_attribute given without attribute_values",
                name
            );
        }
        (None, Some(_)) => {
            bail!(
                "Query '{}': attribute_values given without filter_attribute",
                name
            );
        }
        (Some(_), Some(values)) => values.clone(),
        (None, None) => Vec::new(),
    };

    let feature_types = spec
        .feature
        .map(|types| types.into_iter().collect::<AHashSet<String>>());

    // Anchor restrictions are normalized to the canonical evaluation order
    // so tie-breaking never depends on config file ordering.
    let feature_anchor = match spec.feature_anchor {
        Some(requested) => {
            let requested: AHashSet<Anchor> = requested.into_iter().collect();
            Anchor::ALL
                .iter()
                .copied()
                .filter(|a| requested.contains(a))
                .collect()
        }
        None => Vec::new(),
    };

    Ok(Query {
        name,
        feature_types,
        distance,
        feature_anchor,
        strand: spec.strand.unwrap_or(StrandRelation::Ignore),
        internals: spec.internals,
        relative_location: spec.relative_location,
        filter_attribute: spec.filter_attribute,
        attribute_values,
    })
}
