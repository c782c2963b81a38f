//! Source features: collecting organism attributes, checking that they
//! cover the sequence, and choosing the record's descriptor.

pub mod attrs;
pub mod collector;
pub mod consolidate;
pub mod coverage;

pub use collector::SourceFeatureCollector;
pub use consolidate::{
    Consolidation,
    SourceConsolidator,
};
pub use coverage::{
    is_synthetic,
    simple_spans,
    CoverageValidator,
};
