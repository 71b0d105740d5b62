//! Annotation matching engine for peaks against indexed features.

pub mod engine;
pub mod geometry;
pub mod select;
pub mod validity;

pub use engine::{annotate_peak, build_hit, PeakAnnotation, SearchEvent, SearchState};
pub use geometry::{overlap, relative_location, resolve_anchor, AnchorChoice};
pub use select::mark_best_hit;
pub use validity::{is_valid, run_checks, CheckKind, CheckOutcome};
