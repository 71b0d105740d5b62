//! peakanno - Genomic peak annotation library.
//!
//! This library annotates genomic peaks (e.g. from a ChIP-seq experiment)
//! with the most relevant nearby features from a GTF annotation, following
//! an ordered list of user-defined matching rules.
//!
//! # Features
//!
//! - Parse GTF and BED files (with gzip support)
//! - Chromosome-indexed feature lookup with binary-search window stabs
//! - Distance-, overlap-, strand-, location- and attribute-based validity
//! - Priority-based early termination across queries
//! - Best-hit selection with deterministic tie-breaking
//!
//! # Example
//!
//! ```ignore
//! use peakanno::annotator::annotate_peak;
//! use peakanno::config::AnnotationConfig;
//! use peakanno::index::GtfIndex;
//! use peakanno::parser::PeakReader;
//! use std::path::Path;
//!
//! let config = AnnotationConfig::from_file(Path::new("queries.json"))?;
//! let index = GtfIndex::from_gtf(Path::new("annotation.gtf"))?;
//!
//! let mut reader = PeakReader::new(Path::new("peaks.bed"))?;
//! while let Some(peaks) = reader.read_chunk(5000)? {
//!     for peak in &peaks {
//!         let annotation = annotate_peak(peak, &config, &index);
//!         // Process annotation.records...
//!     }
//! }
//! ```

pub mod annotator;
pub mod config;
pub mod index;
pub mod output;
pub mod parser;
pub mod types;

pub use annotator::{annotate_peak, PeakAnnotation, SearchState};
pub use config::{AnnotationConfig, Query, StrandRelation};
pub use index::{FeatureIndex, GtfIndex, IndexError};
pub use parser::PeakReader;
pub use types::{Anchor, AnnotationRecord, Feature, FeatureHit, Peak, RelativeLocation, Strand};
