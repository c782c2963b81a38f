//! Legacy regulatory feature keys and `/regulatory_class`.

use crate::data_structs::{
    ParsedFeature,
    QualifierKind,
    QualifierList,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};

/// INSDC `/regulatory_class` vocabulary.
pub const REGULATORY_CLASSES: [&str; 25] = [
    "attenuator",
    "CAAT_signal",
    "DNase_I_hypersensitive_site",
    "enhancer",
    "enhancer_blocking_element",
    "GC_signal",
    "imprinting_control_region",
    "insulator",
    "locus_control_region",
    "matrix_attachment_region",
    "minus_35_signal",
    "minus_10_signal",
    "polyA_signal_sequence",
    "promoter",
    "recoding_stimulatory_region",
    "replication_regulatory_region",
    "response_element",
    "ribosome_binding_site",
    "riboswitch",
    "silencer",
    "TATA_box",
    "terminator",
    "transcriptional_cis_regulatory_region",
    "uORF",
    "other",
];

/// Class implied by a retired regulatory feature key.
pub fn legacy_class(key: &str) -> Option<&'static str> {
    let class = match key {
        "promoter" => "promoter",
        "enhancer" => "enhancer",
        "CAAT_signal" => "CAAT_signal",
        "TATA_signal" => "TATA_box",
        "-35_signal" => "minus_35_signal",
        "-10_signal" => "minus_10_signal",
        "RBS" => "ribosome_binding_site",
        "GC_signal" => "GC_signal",
        "polyA_signal" => "polyA_signal_sequence",
        "attenuator" => "attenuator",
        "terminator" => "terminator",
        "misc_signal" => "other",
        _ => return None,
    };
    Some(class)
}

pub fn is_regulatory_class(value: &str) -> bool {
    REGULATORY_CLASSES.contains(&value)
}

/// Rewrites a legacy regulatory feature as `regulatory` with the implied
/// class, and checks the class of `regulatory` features. Returns `false`
/// when the feature has to be dropped.
pub fn convert_regulatory(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) -> bool {
    let ctx = diags.feature_context(feature);

    if let Some(class) = legacy_class(&feature.key) {
        if let Some(given) = feature.value_of(QualifierKind::RegulatoryClass) {
            if given != class {
                diags.error(
                    ErrorCode::RegulatoryClassConflict,
                    ctx.clone(),
                    format!(
                        "/regulatory_class=\"{}\" contradicts key {}, replaced by \"{}\"",
                        given, feature.key, class
                    ),
                );
            }
        }
        diags.info(
            ErrorCode::RegulatoryConverted,
            ctx,
            format!("{} converted to regulatory/{}", feature.key, class),
        );
        feature.key = "regulatory".to_string();
        feature.remove_all(QualifierKind::RegulatoryClass);
        feature.set_value(QualifierKind::RegulatoryClass, "regulatory_class", class);
        return true;
    }

    if feature.key == "regulatory" {
        let bad = feature
            .values_of(QualifierKind::RegulatoryClass)
            .into_iter()
            .find(|v| !is_regulatory_class(v))
            .map(str::to_string);
        if let Some(bad) = bad {
            diags.error(
                ErrorCode::InvalidRegulatoryClass,
                ctx,
                format!(
                    "/regulatory_class=\"{}\" at {} is not a legal class, feature dropped",
                    bad, feature.location
                ),
            );
            return false;
        }
    }
    true
}
