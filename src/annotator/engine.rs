//! Per-peak annotation engine.
//!
//! For each peak the engine walks the configured queries in priority order,
//! fetches candidate features from the index, pipes every candidate through
//! geometry and validity evaluation, and finally hands the accumulated valid
//! annotations to the best-hit selector.

use log::debug;

use crate::annotator::geometry::{overlap, relative_location, resolve_anchor};
use crate::annotator::select::mark_best_hit;
use crate::annotator::validity::is_valid;
use crate::config::{AnnotationConfig, Query};
use crate::index::FeatureIndex;
use crate::types::{AnnotationRecord, Feature, FeatureHit, Peak};

/// Search state of the per-peak query loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Queries remain to be tried.
    Searching,
    /// Priority mode found a valid hit; later queries were abandoned.
    StoppedPriority,
    /// The index could not service a fetch; later queries were abandoned.
    StoppedNoIndex,
    /// Every query was tried.
    Exhausted,
}

/// An event observed by the query loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEvent {
    /// The index reported an unservable fetch (e.g. unknown chromosome).
    IndexUnavailable,
    /// One query finished; `any_valid` tells whether the peak's accumulator
    /// holds at least one valid annotation.
    QueryFinished { any_valid: bool },
    /// No queries are left.
    QueriesExhausted,
}

impl SearchState {
    /// Whether the loop should attempt the next query.
    pub fn is_searching(&self) -> bool {
        matches!(self, SearchState::Searching)
    }

    /// Apply one event. Stop states are terminal; the priority flag only
    /// matters for `QueryFinished`.
    pub fn transition(self, event: SearchEvent, priority: bool) -> SearchState {
        if !self.is_searching() {
            return self;
        }
        match event {
            SearchEvent::IndexUnavailable => SearchState::StoppedNoIndex,
            SearchEvent::QueryFinished { any_valid } => {
                if priority && any_valid {
                    SearchState::StoppedPriority
                } else {
                    SearchState::Searching
                }
            }
            SearchEvent::QueriesExhausted => SearchState::Exhausted,
        }
    }
}

/// Result of annotating a single peak.
#[derive(Debug, Clone)]
pub struct PeakAnnotation {
    /// Valid annotations in accumulation order, with exactly one marked as
    /// best hit. Contains the degenerate unannotated record when no query
    /// yielded a valid annotation.
    pub records: Vec<AnnotationRecord>,
    /// Terminal state of the query loop.
    pub outcome: SearchState,
}

impl PeakAnnotation {
    /// The single best-hit record for this peak.
    pub fn best(&self) -> &AnnotationRecord {
        self.records
            .iter()
            .find(|r| r.best_hit)
            .expect("every finalized peak annotation has a best hit")
    }
}

/// Build a geometry-enriched hit for a (peak, candidate feature) pair.
pub fn build_hit(peak: &Peak, feature: &Feature, query_index: usize, query: &Query) -> FeatureHit {
    let choice = resolve_anchor(peak, feature, &query.feature_anchor);
    let (ovl_peak, ovl_feature) = overlap(peak, feature);
    let location = relative_location(peak, feature, ovl_peak, choice.anchor);

    FeatureHit {
        feature: feature.clone(),
        query_index,
        query_name: query.name.clone(),
        anchor: choice.anchor,
        raw_distance: choice.raw_distance,
        distance: choice.distance,
        ovl_peak,
        ovl_feature,
        location,
    }
}

/// Annotate one peak against the full query list.
///
/// Valid annotations accumulate across queries; the accumulator is never
/// reset, so priority stopping abandons later queries but never retracts
/// hits that earlier queries already produced. A failed index fetch is
/// recoverable at peak granularity: the peak keeps whatever was accumulated.
pub fn annotate_peak<I: FeatureIndex>(
    peak: &Peak,
    config: &AnnotationConfig,
    index: &I,
) -> PeakAnnotation {
    let mut valid: Vec<AnnotationRecord> = Vec::new();
    let mut state = SearchState::Searching;

    for (query_index, query) in config.queries.iter().enumerate() {
        if !state.is_searching() {
            break;
        }

        let radius = query.max_distance();
        let fetch_start = (peak.start - radius).max(1);
        let fetch_end = peak.end + radius;
        debug!(
            "peak {}: query {} ({}) fetching {}:{}-{}",
            peak.name, query_index, query.name, peak.chrom, fetch_start, fetch_end
        );

        let candidates = match index.fetch(&peak.chrom, fetch_start, fetch_end) {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!("peak {}: stopping search, {}", peak.name, err);
                state = state.transition(SearchEvent::IndexUnavailable, config.priority);
                break;
            }
        };

        for feature in candidates {
            // Type filtering happens before geometry so rejected candidates
            // never pay for distance and overlap arithmetic.
            if let Some(ref types) = query.feature_types {
                if !types.contains(&feature.feature_type) {
                    continue;
                }
            }

            let hit = build_hit(peak, feature, query_index, query);
            if is_valid(peak, &hit, query) {
                valid.push(AnnotationRecord::new(peak.clone(), hit));
            }
        }

        state = state.transition(
            SearchEvent::QueryFinished {
                any_valid: !valid.is_empty(),
            },
            config.priority,
        );
    }

    let outcome = state.transition(SearchEvent::QueriesExhausted, config.priority);
    debug!(
        "peak {}: {} valid annotation(s), outcome {:?}",
        peak.name,
        valid.len(),
        outcome
    );

    let records = mark_best_hit(peak, valid);
    PeakAnnotation { records, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrandRelation;
    use crate::index::IndexError;
    use crate::types::{RelativeLocation, Strand};
    use ahash::AHashMap;
    use indexmap::IndexMap;
    use std::cell::Cell;

    struct TestIndex {
        features_by_chrom: AHashMap<String, Vec<Feature>>,
        /// Fail every fetch after this many successful calls.
        fail_after: Cell<Option<usize>>,
        calls: Cell<usize>,
    }

    impl TestIndex {
        fn new(features: Vec<Feature>) -> Self {
            let mut features_by_chrom = AHashMap::new();
            features_by_chrom.insert("chr1".to_string(), features);
            TestIndex {
                features_by_chrom,
                fail_after: Cell::new(None),
                calls: Cell::new(0),
            }
        }
    }

    impl FeatureIndex for TestIndex {
        fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<&Feature>, IndexError> {
            let calls = self.calls.get();
            self.calls.set(calls + 1);
            if let Some(limit) = self.fail_after.get() {
                if calls >= limit {
                    return Err(IndexError::UnknownChromosome(chrom.to_string()));
                }
            }
            let features = self
                .features_by_chrom
                .get(chrom)
                .ok_or_else(|| IndexError::UnknownChromosome(chrom.to_string()))?;
            Ok(features
                .iter()
                .filter(|f| f.start <= end && f.end >= start)
                .collect())
        }
    }

    fn make_peak(start: i64, end: i64) -> Peak {
        Peak::new(
            "chr1".to_string(),
            start,
            end,
            format!("chr1:{}-{}", start, end),
            ".".to_string(),
            Strand::Unknown,
        )
    }

    fn make_feature(feature_type: &str, start: i64, end: i64, strand: Strand) -> Feature {
        Feature::new(
            feature_type.to_string(),
            start,
            end,
            strand,
            String::new(),
            IndexMap::new(),
        )
    }

    fn make_query(name: &str, distance: [i64; 2]) -> Query {
        Query {
            name: name.to_string(),
            feature_types: None,
            distance,
            feature_anchor: Vec::new(),
            strand: StrandRelation::Ignore,
            internals: None,
            relative_location: None,
            filter_attribute: None,
            attribute_values: Vec::new(),
        }
    }

    fn make_config(queries: Vec<Query>, priority: bool) -> AnnotationConfig {
        AnnotationConfig {
            queries,
            priority,
            show_attributes: Vec::new(),
        }
    }

    #[test]
    fn test_state_transitions() {
        let s = SearchState::Searching;
        assert_eq!(
            s.transition(SearchEvent::IndexUnavailable, false),
            SearchState::StoppedNoIndex
        );
        assert_eq!(
            s.transition(SearchEvent::QueryFinished { any_valid: true }, true),
            SearchState::StoppedPriority
        );
        assert_eq!(
            s.transition(SearchEvent::QueryFinished { any_valid: true }, false),
            SearchState::Searching
        );
        assert_eq!(
            s.transition(SearchEvent::QueryFinished { any_valid: false }, true),
            SearchState::Searching
        );
        assert_eq!(
            s.transition(SearchEvent::QueriesExhausted, false),
            SearchState::Exhausted
        );

        // Stop states are terminal
        let stopped = SearchState::StoppedNoIndex;
        assert_eq!(
            stopped.transition(SearchEvent::QueriesExhausted, false),
            SearchState::StoppedNoIndex
        );
    }

    #[test]
    fn test_feature_inside_peak_scenario() {
        let index = TestIndex::new(vec![make_feature("gene", 150, 160, Strand::Positive)]);
        let mut query = make_query("genes", [1000, 1000]);
        query.feature_types = Some(["gene".to_string()].into_iter().collect());
        let config = make_config(vec![query], false);

        let peak = make_peak(100, 200);
        let annotation = annotate_peak(&peak, &config, &index);

        assert_eq!(annotation.outcome, SearchState::Exhausted);
        assert_eq!(annotation.records.len(), 1);
        let record = &annotation.records[0];
        assert!(record.best_hit);
        let hit = record.hit.as_ref().unwrap();
        assert_eq!(hit.location, RelativeLocation::FeatureInsidePeak);
        assert_eq!(hit.distance, hit.raw_distance.abs());
    }

    #[test]
    fn test_no_candidates_yields_degenerate_record() {
        let index = TestIndex::new(vec![]);
        let config = make_config(vec![make_query("genes", [100, 100])], false);

        let peak = make_peak(100, 200);
        let annotation = annotate_peak(&peak, &config, &index);

        assert_eq!(annotation.records.len(), 1);
        assert!(annotation.records[0].best_hit);
        assert!(annotation.records[0].hit.is_none());
    }

    #[test]
    fn test_unknown_chromosome_is_recoverable() {
        let index = TestIndex::new(vec![]);
        let config = make_config(vec![make_query("genes", [100, 100])], false);

        let mut peak = make_peak(100, 200);
        peak.chrom = "chrUn".to_string();
        let annotation = annotate_peak(&peak, &config, &index);

        assert_eq!(annotation.outcome, SearchState::StoppedNoIndex);
        assert_eq!(annotation.records.len(), 1);
        assert!(annotation.records[0].hit.is_none());
    }

    #[test]
    fn test_priority_stops_later_queries() {
        let index = TestIndex::new(vec![
            make_feature("gene", 300, 400, Strand::Positive),
            make_feature("exon", 300, 350, Strand::Positive),
        ]);

        let mut q0 = make_query("genes", [1000, 1000]);
        q0.feature_types = Some(["gene".to_string()].into_iter().collect());
        let mut q1 = make_query("exons", [1000, 1000]);
        q1.feature_types = Some(["exon".to_string()].into_iter().collect());

        let peak = make_peak(100, 200);

        // Priority on: only query 0 hits appear
        let config = make_config(vec![q0.clone(), q1.clone()], true);
        let annotation = annotate_peak(&peak, &config, &index);
        assert_eq!(annotation.outcome, SearchState::StoppedPriority);
        assert!(annotation
            .records
            .iter()
            .all(|r| r.hit.as_ref().unwrap().query_index == 0));

        // Priority off: both queries contribute
        let config = make_config(vec![q0, q1], false);
        let annotation = annotate_peak(&peak, &config, &index);
        assert_eq!(annotation.outcome, SearchState::Exhausted);
        let query_indices: Vec<usize> = annotation
            .records
            .iter()
            .map(|r| r.hit.as_ref().unwrap().query_index)
            .collect();
        assert_eq!(query_indices, vec![0, 1]);
    }

    #[test]
    fn test_index_failure_preserves_earlier_accumulation() {
        let index = TestIndex::new(vec![make_feature("gene", 300, 400, Strand::Positive)]);
        // Second fetch fails
        index.fail_after.set(Some(1));

        let config = make_config(
            vec![make_query("first", [1000, 1000]), make_query("second", [1000, 1000])],
            false,
        );

        let peak = make_peak(100, 200);
        let annotation = annotate_peak(&peak, &config, &index);

        // Hits from the first query survive the failing second query
        assert_eq!(annotation.outcome, SearchState::StoppedNoIndex);
        assert_eq!(annotation.records.len(), 1);
        let hit = annotation.records[0].hit.as_ref().unwrap();
        assert_eq!(hit.query_index, 0);
        assert_eq!(hit.query_name, "first");
    }

    #[test]
    fn test_type_filter_skips_candidates() {
        let index = TestIndex::new(vec![make_feature("exon", 150, 160, Strand::Positive)]);
        let mut query = make_query("genes", [1000, 1000]);
        query.feature_types = Some(["gene".to_string()].into_iter().collect());
        let config = make_config(vec![query], false);

        let peak = make_peak(100, 200);
        let annotation = annotate_peak(&peak, &config, &index);
        assert!(annotation.records[0].hit.is_none());
    }

    #[test]
    fn test_best_hit_is_minimum_distance() {
        let index = TestIndex::new(vec![
            make_feature("gene", 2000, 3000, Strand::Positive),
            make_feature("gene", 220, 320, Strand::Positive),
        ]);
        let config = make_config(vec![make_query("genes", [5000, 5000])], false);

        let peak = make_peak(100, 200);
        let annotation = annotate_peak(&peak, &config, &index);

        assert_eq!(annotation.records.len(), 2);
        let best = annotation.best();
        assert_eq!(best.hit.as_ref().unwrap().feature.start, 220);
        assert_eq!(
            annotation.records.iter().filter(|r| r.best_hit).count(),
            1
        );
    }
}
