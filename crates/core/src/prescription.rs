//! Prescription text editing.
//!
//! A prescription is free text made of comma-separated entries. The last entry is the
//! in-progress entry: it is what the operator is currently typing and doubles as the remedy
//! search term. Every earlier entry is committed and is never rewritten by a remedy selection.
//!
//! Both operations are pure: they take the current text and return derived text.

/// The search term carried by the in-progress entry.
///
/// Returns the last comma-separated segment, trimmed. Text ending in a comma (or empty text)
/// has no search term.
pub fn current_search_term(text: &str) -> &str {
    text.rsplit(',').next().unwrap_or("").trim()
}

/// Render a remedy as it appears in a prescription entry.
///
/// An empty potency leaves just the name, without a dangling space.
pub fn remedy_entry(name: &str, potency: &str) -> String {
    format!("{} {}", name.trim(), potency.trim())
        .trim()
        .to_string()
}

/// Put a remedy into the in-progress slot and open a fresh, empty slot after it.
///
/// - A non-blank in-progress entry (a partial search term) is replaced by the remedy.
/// - A blank trailing slot (text ending in a comma, or empty/whitespace-only text) is filled
///   by the remedy.
///
/// The joined text is trimmed and `", "` is appended, so the result always ends with an empty
/// in-progress entry and [`current_search_term`] of the result is empty.
pub fn apply_selection(text: &str, name: &str, potency: &str) -> String {
    let mut segments: Vec<&str> = text.split(',').collect();
    let entry = format!(" {}", remedy_entry(name, potency));

    // `split` always yields at least one segment; the last one is the in-progress slot.
    segments.pop();

    let mut joined = segments.join(",");
    if !segments.is_empty() {
        joined.push(',');
    }
    joined.push_str(&entry);

    let mut result = joined.trim().to_string();
    result.push_str(", ");
    result
}

/// Committed entries of a prescription, trimmed, with blank entries skipped.
pub fn committed_entries(text: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = text.split(',').collect();
    segments.pop();
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
