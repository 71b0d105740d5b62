//! Best-hit selection for a peak's accumulated valid annotations.

use crate::types::{AnnotationRecord, Peak};

/// Mark the best hit among a peak's valid annotations.
///
/// The best hit is the record with minimum absolute distance; ties resolve
/// to the earliest record in accumulation order (first query tried, then
/// first candidate returned within that query). An empty accumulator yields
/// the degenerate unannotated record, already marked best.
pub fn mark_best_hit(peak: &Peak, mut records: Vec<AnnotationRecord>) -> Vec<AnnotationRecord> {
    if records.is_empty() {
        return vec![AnnotationRecord::unannotated(peak.clone())];
    }

    let mut best_index = 0;
    let mut best_distance = records[0].distance();
    for (i, record) in records.iter().enumerate().skip(1) {
        let distance = record.distance();
        // Strict comparison keeps the earliest record on ties
        if distance < best_distance {
            best_index = i;
            best_distance = distance;
        }
    }

    records[best_index].best_hit = true;
    records
}
