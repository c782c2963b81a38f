//! Helpers shared by the tokenizer, the validators and the assembler.
//!
//! - Builder-style `with_*` and getter macros used by configuration structs.
//! - The rayon pool used by
//!   [`crate::assembly::FeatureAssembler::assemble_batch`]; its size is read
//!   from the `GBFEAT_NUM_THREADS` environment variable.
//! - Small text utilities: blank collapsing, quote escaping and truncation of
//!   location strings for diagnostic context.

use itertools::Itertools;
use once_cell::sync::Lazy;
use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};

pub const NUM_THREADS_ENV: &str = "GBFEAT_NUM_THREADS";

/// Longest location string carried in a diagnostic context.
pub const CONTEXT_LOCATION_MAX: usize = 50;

pub static THREAD_POOL: Lazy<ThreadPool> = Lazy::new(|| {
    let num_threads: Option<usize> = std::env::var(NUM_THREADS_ENV)
        .ok()
        .and_then(|str| str.parse::<usize>().ok());
    ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .expect("Failed to create thread pool")
});

pub fn n_threads() -> usize {
    THREAD_POOL.current_num_threads()
}

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
}
pub use getter_fn;

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
            self.$field_name = value;
            self
            }
        }
    };
}
pub use with_field_fn;

/// Collapses every run of whitespace into a single blank and trims the ends.
pub fn collapse_blanks(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Removes every whitespace character.
pub fn strip_blanks(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Cuts a location string down to [`CONTEXT_LOCATION_MAX`] characters,
/// marking the cut with `...`.
pub fn truncate_location(location: &str) -> String {
    if location.chars().count() <= CONTEXT_LOCATION_MAX {
        return location.to_string();
    }
    let mut out: String = location
        .chars()
        .take(CONTEXT_LOCATION_MAX - 3)
        .collect();
    out.push_str("...");
    out
}

/// Whether `text` contains `word` bounded by non-alphanumeric characters,
/// ignoring ASCII case. Returns the byte offset of the first such match.
pub fn find_word_ci(
    text: &str,
    word: &str,
) -> Option<usize> {
    let hay = text.to_ascii_lowercase();
    let needle = word.to_ascii_lowercase();
    let bytes = hay.as_bytes();
    let mut from = 0;
    while let Some(rel) = hay[from..].find(&needle) {
        let start = from + rel;
        let end = start + needle.len();
        let left_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let right_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if left_ok && right_ok {
            return Some(start);
        }
        from = start + 1;
    }
    None
}

/// Escapes embedded quotes the flat-file way (`"` becomes `""`).
pub fn escape_quotes(value: &str) -> String {
    value.replace('"', "\"\"")
}
