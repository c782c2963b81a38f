//! Services the pipeline calls out to. Each is a narrow trait with a
//! default implementation that works without any outside resources.

pub mod grammar;
pub mod location;
pub mod taxonomy;

pub use grammar::{
    QualifierGrammar,
    QualifierSet,
    StaticQualifierGrammar,
    DEFAULT_GRAMMAR,
};
pub use location::{
    InsdcLocationResolver,
    LocationResolver,
    ResolvedLocation,
};
pub use taxonomy::{
    OfflineTaxonomy,
    StaticTaxonomy,
    TaxonLookup,
    TaxonomyService,
};
