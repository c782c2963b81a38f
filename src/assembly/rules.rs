//! Per-feature qualifier rules.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::collaborators::QualifierSet;
use crate::data_structs::{
    ParsedFeature,
    Qualifier,
    QualifierKind,
    QualifierList,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};

pub const EXPERIMENT_PLACEHOLDER: &str = "experimental evidence, no additional details recorded";
pub const INFERENCE_PLACEHOLDER: &str = "non-experimental evidence, no additional details recorded";

const PSEUDOGENE_VALUES: [&str; 5] = ["processed", "unprocessed", "unitary", "allelic", "unknown"];

/// Keys whose own validators report missing mandatory qualifiers.
const SELF_CHECKED_KEYS: [&str; 4] = ["source", "gap", "assembly_gap", "operon"];

/// Legacy `/evidence` may not be combined with `/experiment` or
/// `/inference`; on its own it becomes one of them.
pub fn convert_evidence(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) -> anyhow::Result<()> {
    let Some(evidence) = feature
        .value_of(QualifierKind::Evidence)
        .map(str::to_string)
    else {
        return Ok(());
    };
    let ctx = diags.feature_context(feature);
    if feature.has(QualifierKind::Experiment) || feature.has(QualifierKind::Inference) {
        return Err(diags.reject(
            ErrorCode::EvidenceConflict,
            ctx,
            format!(
                "{} at {} has /evidence together with /experiment or /inference",
                feature.key, feature.location
            ),
        ));
    }

    feature.remove_all(QualifierKind::Evidence);
    let replacement = match evidence.as_str() {
        "experimental" => Qualifier::quoted("experiment", EXPERIMENT_PLACEHOLDER),
        "not_experimental" => Qualifier::quoted("inference", INFERENCE_PLACEHOLDER),
        other => {
            diags.error(
                ErrorCode::InvalidEvidence,
                ctx,
                format!("/evidence={} is not a legal value, dropped", other),
            );
            return Ok(());
        },
    };
    diags.info(
        ErrorCode::LegacyEvidenceConverted,
        ctx,
        format!("/evidence={} converted to /{}", evidence, replacement.name),
    );
    feature.qualifiers.push(replacement);
    Ok(())
}

/// Drops qualifiers not legal for the feature's key. Returns `false` when a
/// mandatory qualifier is missing and the feature has to go.
pub fn check_grammar(
    feature: &mut ParsedFeature,
    legal: &QualifierSet,
    diags: &mut Diagnostics,
) -> bool {
    let ctx = diags.feature_context(feature);
    let illegal = feature
        .qualifiers
        .iter()
        .filter(|q| !legal.is_legal(&q.name))
        .map(|q| q.name.clone())
        .unique()
        .collect_vec();
    for name in &illegal {
        diags.error(
            ErrorCode::IllegalQualifier,
            ctx.clone(),
            format!("/{} is not legal on {}, dropped", name, feature.key),
        );
    }
    feature
        .qualifiers
        .retain(|q| legal.is_legal(&q.name));

    if SELF_CHECKED_KEYS.contains(&feature.key.as_str()) {
        return true;
    }
    let missing = legal
        .mandatory
        .iter()
        .filter(|m| !feature.qualifiers.iter().any(|q| &q.name == *m))
        .sorted()
        .collect_vec();
    if missing.is_empty() {
        return true;
    }
    diags.error(
        ErrorCode::MissingMandatoryQualifier,
        ctx,
        format!(
            "{} at {} lacks mandatory /{}, feature dropped",
            feature.key,
            feature.location,
            missing.iter().join(", /")
        ),
    );
    false
}

/// `/pseudogene` supersedes the legacy `/pseudo`.
pub fn resolve_pseudo(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) {
    let ctx = diags.feature_context(feature);
    let invalid = feature
        .values_of(QualifierKind::Pseudogene)
        .into_iter()
        .filter(|v| !PSEUDOGENE_VALUES.contains(v))
        .map(str::to_string)
        .collect_vec();
    for value in &invalid {
        diags.error(
            ErrorCode::InvalidPseudogene,
            ctx.clone(),
            format!("/pseudogene=\"{}\" is not a legal value, dropped", value),
        );
    }
    feature.qualifiers.retain(|q| {
        q.kind != QualifierKind::Pseudogene || !invalid.iter().any(|v| Some(v.as_str()) == q.value.as_deref())
    });

    if feature.has(QualifierKind::Pseudogene) && feature.has(QualifierKind::Pseudo) {
        feature.remove_all(QualifierKind::Pseudo);
        diags.info(
            ErrorCode::PseudoAndPseudogene,
            ctx,
            "/pseudo dropped in favour of /pseudogene",
        );
    }
    feature.flags.pseudo = feature.has(QualifierKind::Pseudo) || feature.has(QualifierKind::Pseudogene);
}

/// Removes later copies of a qualifier with the same name and value.
pub fn dedupe_qualifiers(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut dropped = Vec::new();
    feature.qualifiers.retain(|q| {
        let fresh = seen.insert((q.name.clone(), q.value.clone()));
        if !fresh {
            dropped.push(q.to_string());
        }
        fresh
    });
    if dropped.is_empty() {
        return;
    }
    let ctx = diags.feature_context(feature);
    for q in dropped {
        diags.warn(
            ErrorCode::DuplicateQualifier,
            ctx.clone(),
            format!("Duplicate {} dropped", q),
        );
    }
}

/// Removes later features with the same key, location and qualifiers.
pub fn dedupe_features(
    features: Vec<ParsedFeature>,
    diags: &mut Diagnostics,
) -> Vec<ParsedFeature> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(features.len());
    for feature in features {
        let signature = (
            feature.key.clone(),
            feature.location.clone(),
            feature.qualifier_signature(),
        );
        if seen.insert(signature) {
            kept.push(feature);
        }
        else {
            let ctx = diags.feature_context(&feature);
            diags.warn(
                ErrorCode::DuplicateFeature,
                ctx,
                format!("Duplicate {} at {} dropped", feature.key, feature.location),
            );
        }
    }
    kept
}
