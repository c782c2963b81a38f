//! Organism name to canonical name and lineage.

use hashbrown::HashMap;
use serde::Serialize;

use crate::data_structs::typedef::TaxonId;

/// Answer of the taxonomy service for one organism name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonLookup {
    pub canonical_name: String,
    /// `None` when the organism is known but has no lineage on file.
    pub lineage:        Option<String>,
    pub taxon_id:       Option<TaxonId>,
}

impl TaxonLookup {
    pub fn new<S: Into<String>>(
        canonical_name: S,
        lineage: Option<String>,
        taxon_id: Option<TaxonId>,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            lineage,
            taxon_id,
        }
    }
}

pub trait TaxonomyService: Send + Sync {
    /// Looks an organism up; `None` when it is not known.
    fn resolve(
        &self,
        name: &str,
    ) -> Option<TaxonLookup>;

    /// `false` when there is nothing to ask; lookups are then skipped
    /// without reporting the organism as unknown.
    fn is_available(&self) -> bool {
        true
    }
}

/// Never finds anything. Used when no taxonomy source is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTaxonomy;

impl TaxonomyService for OfflineTaxonomy {
    fn resolve(
        &self,
        _name: &str,
    ) -> Option<TaxonLookup> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Taxonomy backed by an in-memory map; names match case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct StaticTaxonomy {
    entries: HashMap<String, TaxonLookup>,
}

impl StaticTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: &str,
        lookup: TaxonLookup,
    ) {
        self.entries
            .insert(name.to_ascii_lowercase(), lookup);
    }

    pub fn with_entry(
        mut self,
        name: &str,
        lookup: TaxonLookup,
    ) -> Self {
        self.insert(name, lookup);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, TaxonLookup)> for StaticTaxonomy {
    fn from_iter<T: IntoIterator<Item = (String, TaxonLookup)>>(iter: T) -> Self {
        let mut taxonomy = Self::new();
        for (name, lookup) in iter {
            taxonomy.insert(&name, lookup);
        }
        taxonomy
    }
}

impl TaxonomyService for StaticTaxonomy {
    fn resolve(
        &self,
        name: &str,
    ) -> Option<TaxonLookup> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup_ignores_case() {
        let tax = StaticTaxonomy::new().with_entry(
            "Homo sapiens",
            TaxonLookup::new("Homo sapiens", Some("Eukaryota; Metazoa".into()), Some(9606)),
        );
        assert_eq!(tax.resolve("homo SAPIENS").unwrap().taxon_id, Some(9606));
        assert!(tax.resolve("Mus musculus").is_none());
        assert!(OfflineTaxonomy.resolve("Homo sapiens").is_none());
        assert!(!OfflineTaxonomy.is_available());
        assert!(tax.is_available());
    }
}
