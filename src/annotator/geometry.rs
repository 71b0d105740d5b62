//! Pure geometry for peak/feature pairs.
//!
//! Anchor resolution, overlap fractions and relative-location labels. These
//! functions carry no configuration state beyond their arguments, which keeps
//! the distance and overlap arithmetic independently testable.

use crate::types::{Anchor, Feature, Peak, RelativeLocation, Strand};

/// The anchor chosen for a peak/feature pair, with its distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorChoice {
    pub anchor: Anchor,
    /// Signed distance from peak center to the anchor position.
    pub raw_distance: i64,
    /// Absolute value of `raw_distance`.
    pub distance: i64,
}

/// Round an overlap fraction to 3 decimal places.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Pick the feature anchor closest to the peak center.
///
/// When `requested` is empty, all three anchors are considered. Candidates
/// are always evaluated in the fixed order start, center, end; ties on
/// absolute distance resolve to the earliest anchor in that order.
pub fn resolve_anchor(peak: &Peak, feature: &Feature, requested: &[Anchor]) -> AnchorChoice {
    let peak_center = peak.center();

    let candidates: &[Anchor] = if requested.is_empty() {
        &Anchor::ALL
    } else {
        requested
    };

    let mut best: Option<AnchorChoice> = None;
    for &anchor in candidates {
        let raw_distance = peak_center - feature.anchor_position(anchor);
        let distance = raw_distance.abs();
        // Strict comparison keeps the first anchor on ties
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(AnchorChoice {
                anchor,
                raw_distance,
                distance,
            });
        }
    }

    // `candidates` is never empty, so `best` is always set.
    best.expect("anchor candidate list must not be empty")
}

/// Compute the mutual overlap fractions of a peak and a feature.
///
/// Returns `(overlap_vs_peak, overlap_vs_feature)`: the fraction of the peak
/// covered by the feature and vice versa, both rounded to 3 decimals. Peaks
/// and features share half-open coordinates, so the intersection length is
/// the difference of the inner bounds, clamped at zero.
///
/// Zero-length peaks or features violate the upstream validation contract.
pub fn overlap(peak: &Peak, feature: &Feature) -> (f64, f64) {
    let peak_length = peak.length();
    let feat_length = feature.length();
    assert!(
        peak_length > 0 && feat_length > 0,
        "overlap requires positive-length intervals (peak {}:{}-{}, feature {}-{})",
        peak.chrom,
        peak.start,
        peak.end,
        feature.start,
        feature.end
    );

    let lo = peak.start.max(feature.start);
    let hi = peak.end.min(feature.end);
    let ovl_bp = (hi - lo).max(0);

    if ovl_bp == 0 {
        return (0.0, 0.0);
    }

    let ovl_peak = round3(ovl_bp as f64 / peak_length as f64);
    let ovl_feature = round3(ovl_bp as f64 / feat_length as f64);
    (ovl_peak, ovl_feature)
}

/// Label the geometric relationship between a peak and a feature.
///
/// Containment wins over anchor-based labels; a center anchor that is not a
/// containment case has no meaningful direction and maps to `NA`. Only
/// plus-strand features get the plus direction labels; unknown strands fall
/// into the non-plus branch, like the distance-window check.
pub fn relative_location(
    peak: &Peak,
    feature: &Feature,
    ovl_peak: f64,
    anchor: Anchor,
) -> RelativeLocation {
    if peak.start <= feature.start && peak.end >= feature.end {
        return RelativeLocation::FeatureInsidePeak;
    }
    if peak.start > feature.start && peak.end < feature.end {
        return RelativeLocation::PeakInsideFeature;
    }

    match anchor {
        Anchor::Start => {
            if ovl_peak > 0.0 {
                RelativeLocation::OverlapStart
            } else if feature.strand == Strand::Positive {
                RelativeLocation::Upstream
            } else {
                RelativeLocation::Downstream
            }
        }
        Anchor::End => {
            if ovl_peak > 0.0 {
                RelativeLocation::OverlapEnd
            } else if feature.strand == Strand::Positive {
                RelativeLocation::Downstream
            } else {
                RelativeLocation::Upstream
            }
        }
        Anchor::Center => RelativeLocation::NotAvailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn make_peak(start: i64, end: i64) -> Peak {
        Peak::new(
            "chr1".to_string(),
            start,
            end,
            "p1".to_string(),
            ".".to_string(),
            Strand::Unknown,
        )
    }

    fn make_feature(start: i64, end: i64, strand: Strand) -> Feature {
        Feature::new(
            "gene".to_string(),
            start,
            end,
            strand,
            String::new(),
            IndexMap::new(),
        )
    }

    #[test]
    fn test_resolve_anchor_picks_closest() {
        // Peak center at 150, feature 1000-2000 (+): start is closest
        let peak = make_peak(100, 200);
        let feat = make_feature(1000, 2000, Strand::Positive);

        let choice = resolve_anchor(&peak, &feat, &[]);
        assert_eq!(choice.anchor, Anchor::Start);
        assert_eq!(choice.raw_distance, 150 - 1000);
        assert_eq!(choice.distance, 850);
    }

    #[test]
    fn test_resolve_anchor_minus_strand() {
        // Same coordinates, minus strand: the "start" anchor is now at 2000,
        // so the physical 1000 coordinate is the "end" anchor.
        let peak = make_peak(100, 200);
        let feat = make_feature(1000, 2000, Strand::Negative);

        let choice = resolve_anchor(&peak, &feat, &[]);
        assert_eq!(choice.anchor, Anchor::End);
        assert_eq!(choice.distance, 850);
    }

    #[test]
    fn test_resolve_anchor_tie_prefers_start() {
        // Peak center at 1500 is equidistant from start (1000) and end (2000)
        // but center (1500) wins with distance 0. Force a tie by restricting
        // to start and end only.
        let peak = make_peak(1450, 1550);
        let feat = make_feature(1000, 2000, Strand::Positive);

        let choice = resolve_anchor(&peak, &feat, &[Anchor::Start, Anchor::End]);
        assert_eq!(choice.anchor, Anchor::Start);
        assert_eq!(choice.distance, 500);
    }

    #[test]
    fn test_resolve_anchor_restricted() {
        let peak = make_peak(100, 200);
        let feat = make_feature(1000, 2000, Strand::Positive);

        let choice = resolve_anchor(&peak, &feat, &[Anchor::End]);
        assert_eq!(choice.anchor, Anchor::End);
        assert_eq!(choice.raw_distance, 150 - 2000);
        assert_eq!(choice.distance, 1850);
    }

    #[test]
    fn test_strand_symmetry_of_anchor_resolution() {
        // Mirror a plus-strand layout around the peak center and flip the
        // strand: anchor label and absolute distance must be unchanged.
        let peak = make_peak(4900, 5100); // center 5000
        let plus = make_feature(6000, 8000, Strand::Positive); // start at 6000, 1000 away
        let minus = make_feature(2000, 4000, Strand::Negative); // start at 4000, 1000 away

        let plus_choice = resolve_anchor(&peak, &plus, &[]);
        let minus_choice = resolve_anchor(&peak, &minus, &[]);

        assert_eq!(plus_choice.anchor, minus_choice.anchor);
        assert_eq!(plus_choice.distance, minus_choice.distance);
        assert_eq!(plus_choice.raw_distance, -minus_choice.raw_distance);
    }

    #[test]
    fn test_overlap_partial() {
        // Peak 100-200 (length 100), feature 150-250 (length 100)
        // Closed intersection [151, 200] -> 50 bp
        let peak = make_peak(100, 200);
        let feat = make_feature(150, 250, Strand::Positive);

        let (ovl_peak, ovl_feature) = overlap(&peak, &feat);
        assert_eq!(ovl_peak, 0.5);
        assert_eq!(ovl_feature, 0.5);
    }

    #[test]
    fn test_overlap_contained() {
        // Feature 150-160 fully inside peak 100-200
        let peak = make_peak(100, 200);
        let feat = make_feature(150, 160, Strand::Positive);

        let (ovl_peak, ovl_feature) = overlap(&peak, &feat);
        assert_eq!(ovl_peak, 0.1);
        assert_eq!(ovl_feature, 1.0);
    }

    #[test]
    fn test_overlap_disjoint_is_zero() {
        let peak = make_peak(100, 200);
        let feat = make_feature(500, 600, Strand::Positive);

        assert_eq!(overlap(&peak, &feat), (0.0, 0.0));

        // Adjacent but not overlapping
        let feat2 = make_feature(200, 300, Strand::Positive);
        assert_eq!(overlap(&peak, &feat2), (0.0, 0.0));
    }

    #[test]
    fn test_overlap_rounding() {
        // Peak length 3, intersection 1 bp -> 1/3 rounds to 0.333
        let peak = make_peak(100, 103);
        let feat = make_feature(102, 300, Strand::Positive);

        let (ovl_peak, _) = overlap(&peak, &feat);
        assert_eq!(ovl_peak, 0.333);
    }

    #[test]
    #[should_panic(expected = "positive-length")]
    fn test_overlap_zero_length_peak_panics() {
        let peak = make_peak(100, 100);
        let feat = make_feature(100, 200, Strand::Positive);
        overlap(&peak, &feat);
    }

    #[test]
    fn test_relative_location_containment() {
        let peak = make_peak(100, 200);
        let inside = make_feature(150, 160, Strand::Positive);
        assert_eq!(
            relative_location(&peak, &inside, 0.1, Anchor::Start),
            RelativeLocation::FeatureInsidePeak
        );

        let outside = make_feature(50, 300, Strand::Positive);
        assert_eq!(
            relative_location(&peak, &outside, 1.0, Anchor::Center),
            RelativeLocation::PeakInsideFeature
        );
    }

    #[test]
    fn test_relative_location_start_anchor() {
        let peak = make_peak(100, 200);
        let feat = make_feature(150, 300, Strand::Positive);

        assert_eq!(
            relative_location(&peak, &feat, 0.5, Anchor::Start),
            RelativeLocation::OverlapStart
        );

        // No overlap: upstream for plus strand, downstream for minus
        let far = make_feature(500, 800, Strand::Positive);
        assert_eq!(
            relative_location(&peak, &far, 0.0, Anchor::Start),
            RelativeLocation::Upstream
        );

        let far_minus = make_feature(500, 800, Strand::Negative);
        assert_eq!(
            relative_location(&peak, &far_minus, 0.0, Anchor::Start),
            RelativeLocation::Downstream
        );
    }

    #[test]
    fn test_relative_location_end_anchor() {
        let peak = make_peak(100, 200);
        let feat = make_feature(50, 150, Strand::Positive);

        assert_eq!(
            relative_location(&peak, &feat, 0.5, Anchor::End),
            RelativeLocation::OverlapEnd
        );

        let far = make_feature(10, 50, Strand::Positive);
        assert_eq!(
            relative_location(&peak, &far, 0.0, Anchor::End),
            RelativeLocation::Downstream
        );

        let far_minus = make_feature(10, 50, Strand::Negative);
        assert_eq!(
            relative_location(&peak, &far_minus, 0.0, Anchor::End),
            RelativeLocation::Upstream
        );
    }

    #[test]
    fn test_relative_location_unknown_strand_takes_non_plus_branch() {
        let peak = make_peak(100, 200);

        let ahead = make_feature(500, 800, Strand::Unknown);
        assert_eq!(
            relative_location(&peak, &ahead, 0.0, Anchor::Start),
            RelativeLocation::Downstream
        );

        let behind = make_feature(10, 50, Strand::Unknown);
        assert_eq!(
            relative_location(&peak, &behind, 0.0, Anchor::End),
            RelativeLocation::Upstream
        );
    }

    #[test]
    fn test_relative_location_center_anchor_is_na() {
        let peak = make_peak(100, 200);
        let feat = make_feature(180, 400, Strand::Positive);
        assert_eq!(
            relative_location(&peak, &feat, 0.2, Anchor::Center),
            RelativeLocation::NotAvailable
        );
    }
}
