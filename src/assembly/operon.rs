//! `operon` features and the features that name them.
//!
//! Runs after location resolution: containment is decided on the resolved
//! extents. Features whose location did not resolve take no part in the
//! containment check.

use hashbrown::HashMap;

use crate::data_structs::{
    ParsedFeature,
    QualifierKind,
    QualifierList,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};

pub fn check_operons(
    features: &[ParsedFeature],
    diags: &mut Diagnostics,
) -> anyhow::Result<()> {
    let mut operons: HashMap<&str, &ParsedFeature> = HashMap::new();
    for feature in features.iter().filter(|f| f.key == "operon") {
        let ctx = diags.feature_context(feature);
        let names = feature.values_of(QualifierKind::Operon);
        let name = match names.as_slice() {
            [] => {
                return Err(diags.reject(
                    ErrorCode::OperonMissingName,
                    ctx,
                    format!("operon at {} has no /operon", feature.location),
                ))
            },
            [name] => *name,
            [..] => {
                return Err(diags.reject(
                    ErrorCode::MultipleOperonNames,
                    ctx,
                    format!(
                        "operon at {} carries {} /operon qualifiers",
                        feature.location,
                        names.len()
                    ),
                ))
            },
        };
        if let Some(first) = operons.insert(name, feature) {
            return Err(diags.reject(
                ErrorCode::DuplicateOperon,
                ctx,
                format!(
                    "operon \"{}\" defined at {} and {}",
                    name, first.location, feature.location
                ),
            ));
        }
    }

    for feature in features.iter().filter(|f| f.key != "operon") {
        for name in feature.values_of(QualifierKind::Operon) {
            let ctx = diags.feature_context(feature);
            let Some(operon) = operons.get(name)
            else {
                diags.warn(
                    ErrorCode::OperonNotFound,
                    ctx,
                    format!(
                        "{} at {} names operon \"{}\", which is not in the record",
                        feature.key, feature.location, name
                    ),
                );
                continue;
            };
            let (Some(inner), Some(outer)) = (feature.extent(), operon.extent())
            else {
                continue;
            };
            if !inner.is_in(&outer) {
                return Err(diags.reject(
                    ErrorCode::OperonLocationMismatch,
                    ctx,
                    format!(
                        "{} at {} lies outside operon \"{}\" at {}",
                        feature.key, feature.location, name, operon.location
                    ),
                ));
            }
        }
    }
    Ok(())
}
