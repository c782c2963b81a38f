//! `/locus_tag` and `/old_locus_tag` consistency across a record.

use hashbrown::HashMap;
use itertools::Itertools;

use crate::data_structs::{
    ParsedFeature,
    QualifierKind,
    QualifierList,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};

/// Drops locus tags containing whitespace.
fn drop_blank_tags(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) {
    let bad = feature
        .qualifiers
        .iter()
        .filter(|q| matches!(q.kind, QualifierKind::LocusTag | QualifierKind::OldLocusTag))
        .filter(|q| q.value_str().chars().any(char::is_whitespace))
        .map(|q| q.to_string())
        .collect_vec();
    if bad.is_empty() {
        return;
    }
    let ctx = diags.feature_context(feature);
    for q in &bad {
        diags.error(
            ErrorCode::InvalidLocusTag,
            ctx.clone(),
            format!("{} contains whitespace, dropped", q),
        );
    }
    feature.qualifiers.retain(|q| {
        !(matches!(q.kind, QualifierKind::LocusTag | QualifierKind::OldLocusTag)
            && q.value_str().chars().any(char::is_whitespace))
    });
}

pub fn check_locus_tags(
    features: &mut [ParsedFeature],
    diags: &mut Diagnostics,
) -> anyhow::Result<()> {
    for feature in features.iter_mut() {
        drop_blank_tags(feature, diags);
    }

    // Every locus_tag in the record, with the first feature carrying it.
    let mut owners: HashMap<&str, &ParsedFeature> = HashMap::new();
    for feature in features.iter() {
        let ctx = diags.feature_context(feature);
        let tags = feature.values_of(QualifierKind::LocusTag);
        if tags.len() > 1 {
            return Err(diags.reject(
                ErrorCode::MultipleLocusTags,
                ctx,
                format!(
                    "{} at {} carries {} /locus_tag qualifiers",
                    feature.key,
                    feature.location,
                    tags.len()
                ),
            ));
        }
        if let Some(&tag) = tags.first() {
            owners.entry(tag).or_insert(feature);
        }
    }

    let mut gene_tags: HashMap<&str, &ParsedFeature> = HashMap::new();
    for feature in features.iter() {
        let ctx = diags.feature_context(feature);
        let own = feature.value_of(QualifierKind::LocusTag);

        for old in feature.values_of(QualifierKind::OldLocusTag) {
            let Some(own) = own
            else {
                return Err(diags.reject(
                    ErrorCode::OldLocusTagWithoutNew,
                    ctx,
                    format!(
                        "{} at {} has /old_locus_tag=\"{}\" but no /locus_tag",
                        feature.key, feature.location, old
                    ),
                ));
            };
            if old == own {
                return Err(diags.reject(
                    ErrorCode::OldLocusTagMatchesNew,
                    ctx,
                    format!(
                        "{} at {} has /old_locus_tag equal to its /locus_tag \"{}\"",
                        feature.key, feature.location, own
                    ),
                ));
            }
            if let Some(other) = owners.get(old) {
                return Err(diags.reject(
                    ErrorCode::OldLocusTagCollision,
                    ctx,
                    format!(
                        "/old_locus_tag=\"{}\" at {} is the /locus_tag of {} at {}",
                        old, feature.location, other.key, other.location
                    ),
                ));
            }
        }

        if feature.key != "gene" {
            continue;
        }
        if let Some(own) = own {
            if let Some(first) = gene_tags.insert(own, feature) {
                return Err(diags.reject(
                    ErrorCode::DuplicateLocusTag,
                    ctx,
                    format!(
                        "gene features at {} and {} share /locus_tag=\"{}\"",
                        first.location, feature.location, own
                    ),
                ));
            }
        }
    }
    Ok(())
}
