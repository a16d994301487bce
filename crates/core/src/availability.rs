//! Availability marker classification.
//!
//! The inventory sheet records stock with whatever the person updating it typed: `Y`, `yes`,
//! `1`, `TRUE`, `Available`... This only decides whether the remedy finder offers the add
//! action; it is not a correctness boundary.

use crate::constants::AVAILABLE_MARKERS;

/// Returns true when the marker normalises to one of the "in stock" tokens.
pub fn is_available(raw: &str) -> bool {
    let normalised = raw.trim().to_lowercase();
    AVAILABLE_MARKERS.contains(&normalised.as_str())
}
