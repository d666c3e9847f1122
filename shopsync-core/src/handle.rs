//! Handle (URL slug) normalization shared by themes, blogs and articles.

use unicode_normalization::UnicodeNormalization;

/// Normalize a display name into a handle.
///
/// NFD-decomposes, drops combining diacritics (U+0300..=U+036F), lowercases,
/// replaces each run of characters outside `[a-z0-9-_]` with a single `_` and
/// strips leading/trailing underscores. Idempotent.
pub fn handle_name(name: &str) -> String {
    let stripped: String = name
        .nfd()
        .filter(|c| !('\u{300}'..='\u{36f}').contains(c))
        .collect();
    let lowered = stripped.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut in_run = false;
    for c in lowered.trim().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out.trim_matches('_').to_string()
}
