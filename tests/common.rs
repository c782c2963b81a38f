#![allow(dead_code)]
use std::path::PathBuf;

use gbfeat::prelude::*;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Cuts a flat-file feature table into blocks. A block starts on every line
/// indented by exactly five blanks.
pub fn split_blocks(table: &str) -> anyhow::Result<Vec<RawFeatureBlock>> {
    let mut texts: Vec<Vec<&str>> = Vec::new();
    for line in table.lines() {
        let starts_block = line.len() > 5 && line.starts_with("     ") && !line[5..].starts_with(' ');
        if starts_block {
            texts.push(vec![line]);
        }
        else if let Some(current) = texts.last_mut() {
            current.push(line);
        }
    }
    texts
        .into_iter()
        .enumerate()
        .map(|(order, lines)| RawFeatureBlock::parse(order, &lines.join("\n")))
        .collect()
}

pub fn load_blocks(name: &str) -> anyhow::Result<Vec<RawFeatureBlock>> {
    let table = std::fs::read_to_string(fixture_path(name))?;
    split_blocks(&table)
}

/// Source block covering `from..to` for `organism`, with extra qualifier
/// lines appended.
pub fn source_block(
    order: usize,
    from: u32,
    to: u32,
    organism: &str,
    extra: &[&str],
) -> RawFeatureBlock {
    let mut qualifiers = vec![
        format!("/organism=\"{}\"", organism),
        "/mol_type=\"genomic DNA\"".to_string(),
    ];
    qualifiers.extend(extra.iter().map(|s| s.to_string()));
    RawFeatureBlock::new(order, "source", format!("{}..{}", from, to), qualifiers.join("\n"))
}
