//! Feature-key and qualifier legality.

use hashbrown::{
    HashMap,
    HashSet,
};
use once_cell::sync::Lazy;
use serde::Deserialize;

const BUNDLED_GRAMMAR: &str = include_str!("../../assets/qualifier_grammar.json");

/// Grammar table shipped with the crate.
pub static DEFAULT_GRAMMAR: Lazy<StaticQualifierGrammar> = Lazy::new(|| {
    StaticQualifierGrammar::from_json(BUNDLED_GRAMMAR).expect("Bundled qualifier grammar is invalid")
});

/// Qualifiers allowed on one feature key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifierSet {
    pub mandatory: HashSet<String>,
    pub optional:  HashSet<String>,
}

impl QualifierSet {
    pub fn is_legal(
        &self,
        name: &str,
    ) -> bool {
        self.mandatory.contains(name) || self.optional.contains(name)
    }
}

pub trait QualifierGrammar: Send + Sync {
    /// Legal qualifiers for `key`, or `None` when the key is unknown.
    fn legal_qualifiers(
        &self,
        key: &str,
    ) -> Option<QualifierSet>;

    /// Whether `name` is a qualifier name of any feature.
    fn is_known_qualifier(
        &self,
        name: &str,
    ) -> bool;

    fn is_known_key(
        &self,
        key: &str,
    ) -> bool {
        self.legal_qualifiers(key).is_some()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    mandatory: Vec<String>,
    optional:  Vec<String>,
}

#[derive(Deserialize)]
struct RawGrammar {
    qualifiers: Vec<String>,
    features:   std::collections::BTreeMap<String, RawEntry>,
}

/// Grammar backed by an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct StaticQualifierGrammar {
    features:   HashMap<String, QualifierSet>,
    qualifiers: HashSet<String>,
}

impl StaticQualifierGrammar {
    /// Reads a table of the form
    /// `{"qualifiers": [...], "features": {"CDS": {"mandatory": [...], "optional": [...]}}}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: RawGrammar = serde_json::from_str(json)?;
        let mut qualifiers: HashSet<String> = raw.qualifiers.into_iter().collect();
        let mut features = HashMap::with_capacity(raw.features.len());
        for (key, entry) in raw.features {
            qualifiers.extend(entry.mandatory.iter().cloned());
            qualifiers.extend(entry.optional.iter().cloned());
            features.insert(key, QualifierSet {
                mandatory: entry.mandatory.into_iter().collect(),
                optional:  entry.optional.into_iter().collect(),
            });
        }
        Ok(Self {
            features,
            qualifiers,
        })
    }

    /// Adds or replaces the entry for one key.
    pub fn insert<S: Into<String>>(
        &mut self,
        key: S,
        set: QualifierSet,
    ) {
        self.qualifiers
            .extend(set.mandatory.iter().cloned());
        self.qualifiers
            .extend(set.optional.iter().cloned());
        self.features.insert(key.into(), set);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}

impl QualifierGrammar for StaticQualifierGrammar {
    fn legal_qualifiers(
        &self,
        key: &str,
    ) -> Option<QualifierSet> {
        self.features.get(key).cloned()
    }

    fn is_known_qualifier(
        &self,
        name: &str,
    ) -> bool {
        self.qualifiers.contains(name)
    }
}

impl<G: QualifierGrammar + ?Sized> QualifierGrammar for &G {
    fn legal_qualifiers(
        &self,
        key: &str,
    ) -> Option<QualifierSet> {
        (**self).legal_qualifiers(key)
    }

    fn is_known_qualifier(
        &self,
        name: &str,
    ) -> bool {
        (**self).is_known_qualifier(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_grammar() {
        let grammar = &*DEFAULT_GRAMMAR;
        let source = grammar.legal_qualifiers("source").unwrap();
        assert!(source.mandatory.contains("organism"));
        assert!(source.is_legal("strain"));
        assert!(!source.is_legal("translation"));
        assert!(grammar.is_known_qualifier("translation"));
        assert!(grammar.is_known_qualifier("evidence"));
        assert!(!grammar.is_known_qualifier("organsim"));
        assert!(grammar.legal_qualifiers("promoter").is_none());
        assert!(grammar.is_known_key("regulatory"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(StaticQualifierGrammar::from_json("{\"features\": 1}").is_err());
    }
}
