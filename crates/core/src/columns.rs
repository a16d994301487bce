//! Loose column lookup over externally-labelled rows.
//!
//! The remedy sheet is maintained by hand, so its header wording drifts between exports
//! ("Remedy Name", "remedy name ", "Name of remedy"...). Columns are therefore found by
//! case-insensitive substring match against a list of candidate names instead of by exact
//! label. A missing column is a normal outcome and resolves to empty text.

use std::sync::Arc;

/// One record from a labelled table, keeping the source's column order.
///
/// Labels are shared between all rows of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    labels: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Create a row. Missing trailing values read as empty text; surplus values are dropped.
    pub fn new(labels: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(labels.len(), String::new());
        Self { labels, values }
    }

    /// Convenience constructor for literal rows.
    pub fn from_pairs<L, V>(pairs: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        let (labels, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(l, v)| (l.into(), v.into()))
            .unzip();
        Self::new(labels.into(), values)
    }

    /// Value at a column position, if the position exists.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Resolve a loosely-labelled column; see [`resolve`].
    pub fn resolve(&self, candidates: &[&str]) -> &str {
        resolve_index(&self.labels, candidates)
            .and_then(|idx| self.get(idx))
            .unwrap_or("")
    }
}

/// Find the value of the first column matching the first matching candidate.
///
/// Candidates are tried in order. For each candidate, the first column (in row order) whose
/// lower-cased, trimmed label contains the lower-cased, trimmed candidate wins. The value is
/// returned even when it is empty. If no candidate matches any column, the result is `""`.
pub fn resolve<'a, I>(row: I, candidates: &[&str]) -> &'a str
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let columns: Vec<(&'a str, &'a str)> = row.into_iter().collect();
    let labels: Vec<&str> = columns.iter().map(|(label, _)| *label).collect();

    resolve_index(&labels, candidates)
        .map(|idx| columns[idx].1)
        .unwrap_or("")
}

/// Label-only form of [`resolve`]: the position of the resolved column.
///
/// A table can resolve each field once per header and reuse the position for every row.
pub fn resolve_index<L: AsRef<str>>(labels: &[L], candidates: &[&str]) -> Option<usize> {
    let normalised: Vec<String> = labels.iter().map(|l| normalise(l.as_ref())).collect();

    candidates.iter().find_map(|candidate| {
        let needle = normalise(candidate);
        normalised.iter().position(|label| label.contains(&needle))
    })
}

fn normalise(text: &str) -> String {
    text.trim().to_lowercase()
}
