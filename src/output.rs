//! Output formatting for annotation results.
//!
//! Two TSV streams are produced: "all hits" with every valid annotation and
//! "final hits" with the single best annotation per peak. Both share the
//! same columns; missing feature fields render as NA.

use anyhow::Result;
use std::io::Write;

use crate::types::AnnotationRecord;

const NA: &str = "NA";

/// Write the output header. `show_attributes` keys become extra columns
/// between the overlap fractions and the query columns.
pub fn write_header<W: Write>(writer: &mut W, show_attributes: &[String]) -> Result<()> {
    let base_header = "peak_chr\tpeak_start\tpeak_end\tpeak_id\tpeak_score\tpeak_strand\t\
                       feature\tfeat_start\tfeat_end\tfeat_strand\tfeat_anchor\t\
                       distance\traw_distance\tgenomic_location\tfeat_ovl_peak\tpeak_ovl_feat";

    write!(writer, "{}", base_header)?;
    for key in show_attributes {
        write!(writer, "\t{}", key)?;
    }
    writeln!(writer, "\tquery\tquery_name\tbest_hit")?;

    Ok(())
}

/// Format a single output line for an annotation record.
pub fn format_record(record: &AnnotationRecord, show_attributes: &[String]) -> String {
    let peak = &record.peak;
    let mut line = format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        peak.chrom, peak.start, peak.end, peak.name, peak.score, peak.strand
    );

    match &record.hit {
        Some(hit) => {
            line.push_str(&format!(
                "\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.3}\t{:.3}",
                hit.feature.feature_type,
                hit.feature.start,
                hit.feature.end,
                hit.feature.strand,
                hit.anchor,
                hit.distance,
                hit.raw_distance,
                hit.location,
                hit.ovl_feature,
                hit.ovl_peak,
            ));
            for key in show_attributes {
                let value = hit.feature.attributes.get(key).map_or(NA, String::as_str);
                line.push('\t');
                line.push_str(value);
            }
            line.push_str(&format!(
                "\t{}\t{}\t{}",
                hit.query_index,
                hit.query_name,
                record.best_hit as u8
            ));
        }
        None => {
            // Degenerate unannotated record: every feature field is NA
            for _ in 0..(10 + show_attributes.len() + 2) {
                line.push('\t');
                line.push_str(NA);
            }
            line.push_str(&format!("\t{}", record.best_hit as u8));
        }
    }

    line
}
