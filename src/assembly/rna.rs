//! Product names of rRNA and tRNA features.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::data_structs::{
    ParsedFeature,
    QualifierKind,
    QualifierList,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};
use crate::utils::collapse_blanks;

/// Three-letter amino acid codes accepted in tRNA products.
pub const AMINO_ACIDS: [&str; 23] = [
    "Ala", "Arg", "Asn", "Asp", "Cys", "Gln", "Glu", "Gly", "His", "Ile", "Leu", "Lys", "Met",
    "Phe", "Pro", "Ser", "Thr", "Trp", "Tyr", "Val", "Sec", "Pyl", "Xaa",
];

static RRNA_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\brRNA\b").unwrap());
static RIBOSOMAL_RNA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bribosomal\s+rna\b").unwrap());
static SVEDBERG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)s\b").unwrap());
static TRNA_PRODUCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:tRNA|transfer RNA)[- ]?([A-Za-z]{3})$").unwrap());
static ANTICODON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(pos:([^,()]+(?:\([^()]*\))?[^,()]*),aa:([A-Za-z]{3}),seq:([ACGTUacgtu]{3})\)$").unwrap()
});
static NOTE_TRNA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btRNA-([A-Za-z]{3})\b").unwrap());

/// `Xxx` casing of a three-letter code.
fn title_case(code: &str) -> String {
    let lower = code.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn normalize_rrna_product(product: &str) -> String {
    let text = RRNA_WORD_RE.replace_all(product, "ribosomal RNA");
    let text = RIBOSOMAL_RNA_RE.replace_all(&text, "ribosomal RNA");
    let text = SVEDBERG_RE.replace_all(&text, "${1}S");
    let text = collapse_blanks(&text);
    match text.strip_suffix(" gene") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// `tRNA-Xxx` form of a tRNA product, if it names an amino acid.
pub fn normalize_trna_product(product: &str) -> Option<String> {
    let caps = TRNA_PRODUCT_RE.captures(product.trim())?;
    let code = title_case(&caps[1]);
    AMINO_ACIDS
        .contains(&code.as_str())
        .then(|| format!("tRNA-{}", code))
}

/// Amino acid of a normalized `tRNA-Xxx` product.
fn product_amino_acid(product: &str) -> Option<&str> {
    product.strip_prefix("tRNA-")
}

pub fn normalize_rrna(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) {
    if feature.key != "rRNA" {
        return;
    }
    let ctx = diags.feature_context(feature);
    let Some(product) = feature
        .value_of(QualifierKind::Product)
        .map(str::to_string)
    else {
        diags.warn(ErrorCode::MissingRrnaProduct, ctx, "rRNA feature without /product");
        return;
    };
    let normalized = normalize_rrna_product(&product);
    if normalized != product {
        diags.warn(
            ErrorCode::RrnaProductNormalized,
            ctx,
            format!("rRNA /product \"{}\" changed to \"{}\"", product, normalized),
        );
        feature.set_value(QualifierKind::Product, "product", normalized);
    }
}

/// Normalizes the product of a tRNA feature and cross-checks it against
/// `/anticodon` and any `tRNA-Xxx` mention in `/note`.
pub fn check_trna(
    feature: &mut ParsedFeature,
    diags: &mut Diagnostics,
) {
    if feature.key != "tRNA" {
        return;
    }
    let ctx = diags.feature_context(feature);

    let mut product = feature
        .value_of(QualifierKind::Product)
        .map(str::to_string);
    if let Some(current) = product.clone() {
        match normalize_trna_product(&current) {
            Some(normalized) if normalized != current => {
                diags.info(
                    ErrorCode::TrnaProductNormalized,
                    ctx.clone(),
                    format!("tRNA /product \"{}\" changed to \"{}\"", current, normalized),
                );
                feature.set_value(QualifierKind::Product, "product", normalized.clone());
                product = Some(normalized);
            },
            Some(_) => {},
            None => {
                diags.warn(
                    ErrorCode::TrnaProductUnrecognized,
                    ctx.clone(),
                    format!("tRNA /product \"{}\" names no amino acid", current),
                );
                product = None;
            },
        }
    }
    let product_aa = product
        .as_deref()
        .and_then(product_amino_acid)
        .map(str::to_string);

    if let Some(anticodon) = feature
        .value_of(QualifierKind::Anticodon)
        .map(str::to_string)
    {
        let compact: String = anticodon
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match ANTICODON_RE.captures(&compact) {
            Some(caps) => {
                let aa = title_case(&caps[2]);
                if let Some(expected) = &product_aa {
                    if &aa != expected {
                        diags.warn(
                            ErrorCode::AnticodonProductMismatch,
                            ctx.clone(),
                            format!("/anticodon amino acid {} differs from /product tRNA-{}", aa, expected),
                        );
                    }
                }
            },
            None => {
                diags.error(
                    ErrorCode::InvalidAnticodon,
                    ctx.clone(),
                    format!("/anticodon=\"{}\" is malformed, dropped", anticodon),
                );
                feature.remove_all(QualifierKind::Anticodon);
            },
        }
    }

    if let (Some(expected), Some(note)) = (&product_aa, feature.value_of(QualifierKind::Note)) {
        let conflicting = NOTE_TRNA_RE
            .captures_iter(note)
            .map(|c| title_case(&c[1]))
            .find(|aa| aa != expected);
        if let Some(aa) = conflicting {
            diags.warn(
                ErrorCode::TrnaNoteMismatch,
                ctx,
                format!("/note mentions tRNA-{} but /product is tRNA-{}", aa, expected),
            );
        }
    }
}
