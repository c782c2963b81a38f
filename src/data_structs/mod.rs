//! Core data model: raw blocks, qualifiers, parsed features, source and gap
//! records, organism descriptors, and the coordinate types they share.

pub mod coords;
pub mod enums;
pub mod feature;
pub mod gap;
pub mod organism;
pub mod qualifier;
pub mod typedef;

pub use coords::{
    SeqRange,
    Span,
    SpanIndex,
};
pub use feature::{
    FeatureFlags,
    ParsedFeature,
    RawFeatureBlock,
};
pub use gap::{
    GapFeatureRecord,
    GapLength,
};
pub use organism::{
    CollectionDate,
    ModifierKind,
    ModifierUseSet,
    OrganismDescriptor,
    PartialDate,
    PcrPrimerSet,
    SourceFeatureRecord,
};
pub use qualifier::{
    Qualifier,
    QualifierKind,
    QualifierList,
};
