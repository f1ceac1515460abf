//! Name normalization shared by the reconciler and the importer.
//!
//! Two rows are duplicates when their [`normalize_key`] values are equal.
//! [`canonical_name`] is the display form stored for types and abilities.

fn words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
}

/// Partition key for duplicate detection: separators folded to single
/// spaces, lower-cased. `"Run-Away "` and `"run away"` share a key.
pub fn normalize_key(name: &str) -> String {
    words(name)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-cased display form: `"static-electricity"` becomes
/// `"Static Electricity"`.
pub fn canonical_name(name: &str) -> String {
    words(name).map(title_case).collect::<Vec<_>>().join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
