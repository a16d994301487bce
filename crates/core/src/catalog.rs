//! Remedy inventory catalog.
//!
//! The catalog is a snapshot of the inventory sheet: its header labels plus every data row, in
//! sheet order. It is replaced wholesale on each sync and never edited in place, so a loaded
//! catalog can be shared freely between sessions.

use std::sync::Arc;

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{info, warn};

use crate::availability::is_available;
use crate::columns::{resolve_index, Row};
use crate::constants::{
    AVAILABILITY_COLUMNS, BOX_COLUMNS, NAME_COLUMNS, POTENCY_COLUMNS, SEARCH_LIMIT,
};
use crate::source::RemedySource;
use crate::DeskResult;

/// One inventory entry, materialised from a sheet row through the column resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemedyRecord {
    pub name: String,
    pub potency: String,
    pub box_number: Option<String>,
    pub availability_raw: String,
    pub available: bool,
}

impl RemedyRecord {
    pub fn from_row(row: &Row) -> Self {
        let box_number = row.resolve(BOX_COLUMNS).trim();
        let availability_raw = row.resolve(AVAILABILITY_COLUMNS).to_string();

        Self {
            name: row.resolve(NAME_COLUMNS).trim().to_string(),
            potency: row.resolve(POTENCY_COLUMNS).trim().to_string(),
            box_number: (!box_number.is_empty()).then(|| box_number.to_string()),
            available: is_available(&availability_raw),
            availability_raw,
        }
    }
}

/// Result of a remedy finder search, as the finder panel needs to render it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Nothing typed yet; the finder shows its prompt.
    NoTerm,
    /// A term was typed but nothing matched.
    NoMatches,
    /// Up to [`SEARCH_LIMIT`] matches in catalog order.
    Matches(Vec<RemedyRecord>),
}

impl SearchOutcome {
    pub fn into_records(self) -> Vec<RemedyRecord> {
        match self {
            Self::Matches(records) => records,
            Self::NoTerm | Self::NoMatches => Vec::new(),
        }
    }
}

/// An in-memory snapshot of the remedy inventory.
#[derive(Clone, Debug)]
pub struct RemedyCatalog {
    labels: Arc<[String]>,
    rows: Vec<Row>,
    name_column: Option<usize>,
}

impl Default for RemedyCatalog {
    fn default() -> Self {
        Self::from_rows(Arc::from(Vec::new()), Vec::new())
    }
}

impl RemedyCatalog {
    /// Build a catalog from rows sharing one header.
    pub fn from_rows(labels: Arc<[String]>, rows: Vec<Row>) -> Self {
        let name_column = resolve_index(&labels, NAME_COLUMNS);
        Self {
            labels,
            rows,
            name_column,
        }
    }

    /// Fetch and parse the inventory.
    ///
    /// # Errors
    /// Returns [`crate::DeskError::SourceUnavailable`] when the source cannot be read or is not
    /// a CSV table with a header row.
    pub fn load(source: &RemedySource) -> DeskResult<Self> {
        let text = source.fetch()?;
        let catalog = Self::parse(&text).map_err(|e| source.unavailable(e))?;

        info!(
            source = %source.describe(),
            remedies = catalog.len(),
            "loaded remedy catalog"
        );
        if catalog.name_column.is_none() {
            warn!(
                source = %source.describe(),
                "remedy catalog has no name column; searches will not match"
            );
        }

        Ok(catalog)
    }

    /// Parse CSV text with a header line.
    ///
    /// Cells are trimmed, a UTF-8 BOM on the first label is dropped and ragged rows are
    /// accepted (missing cells read as empty).
    pub fn parse(text: &str) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let labels: Arc<[String]> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_matches('\u{feff}').trim().to_string())
            .collect::<Vec<_>>()
            .into();

        if labels.iter().all(String::is_empty) {
            return Err(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "missing header row",
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let values = record.iter().map(|v| v.trim().to_string()).collect();
            rows.push(Row::new(labels.clone(), values));
        }

        Ok(Self::from_rows(labels, rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Rows whose resolved name contains `term`, case-insensitively, in catalog order.
    ///
    /// Returns nothing for an empty term and at most [`SEARCH_LIMIT`] rows otherwise.
    pub fn search_rows(&self, term: &str) -> Vec<&Row> {
        let needle = term.trim().to_lowercase();
        let Some(name_column) = self.name_column else {
            return Vec::new();
        };
        if needle.is_empty() {
            return Vec::new();
        }

        self.rows
            .iter()
            .filter(|row| {
                let name = row.get(name_column).unwrap_or("").trim();
                !name.is_empty() && name.to_lowercase().contains(&needle)
            })
            .take(SEARCH_LIMIT)
            .collect()
    }

    /// Search and materialise the matching remedies.
    pub fn search(&self, term: &str) -> Vec<RemedyRecord> {
        self.search_rows(term)
            .into_iter()
            .map(RemedyRecord::from_row)
            .collect()
    }

    /// The entry for an exact remedy and potency, ignoring case and padding.
    pub fn record(&self, name: &str, potency: &str) -> Option<RemedyRecord> {
        let (name, potency) = (name.trim(), potency.trim());
        self.rows
            .iter()
            .map(RemedyRecord::from_row)
            .find(|r| r.name.eq_ignore_ascii_case(name) && r.potency.eq_ignore_ascii_case(potency))
    }

    /// Search, distinguishing "no term" from "no matches".
    pub fn find(&self, term: &str) -> SearchOutcome {
        if term.trim().is_empty() {
            return SearchOutcome::NoTerm;
        }
        match self.search(term) {
            records if records.is_empty() => SearchOutcome::NoMatches,
            records => SearchOutcome::Matches(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeskError;
    use proptest::prelude::*;

    const SHEET: &str = "\u{feff}Remedy Name ,Potency,BOX Number,Available y/n\n\
        Arnica Montana,30C,12,Y\n\
        Belladonna,200C,3,N\n";

    #[test]
    fn scenario_search_arn() {
        let catalog = RemedyCatalog::parse(SHEET).unwrap();
        let results = catalog.search("arn");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Arnica Montana");
        assert_eq!(results[0].potency, "30C");
        assert_eq!(results[0].box_number.as_deref(), Some("12"));
        assert!(results[0].available);

        let bell = catalog.search("BELLA");
        assert!(!bell[0].available);
    }

    #[test]
    fn empty_term_returns_nothing() {
        let catalog = RemedyCatalog::parse(SHEET).unwrap();
        assert!(catalog.search("").is_empty());
        assert_eq!(catalog.find("  "), SearchOutcome::NoTerm);
    }

    #[test]
    fn find_distinguishes_no_matches() {
        let catalog = RemedyCatalog::parse(SHEET).unwrap();
        assert_eq!(catalog.find("zinc"), SearchOutcome::NoMatches);
        assert!(matches!(catalog.find("a"), SearchOutcome::Matches(r) if r.len() == 2));
    }

    #[test]
    fn record_matches_name_and_potency_exactly() {
        let catalog = RemedyCatalog::parse(SHEET).unwrap();

        let record = catalog.record(" belladonna ", "200c").unwrap();
        assert_eq!(record.name, "Belladonna");
        assert!(!record.available);

        assert!(catalog.record("Belladonna", "30C").is_none());
        assert!(catalog.record("Bella", "200C").is_none());
    }

    #[test]
    fn rows_without_name_never_match() {
        let catalog = RemedyCatalog::parse("Name,Potency\n,30C\nSulphur,6C\n").unwrap();
        let results = catalog.search("3");
        assert!(results.is_empty());
        assert_eq!(catalog.search("sul").len(), 1);
    }

    #[test]
    fn duplicates_are_kept() {
        let catalog =
            RemedyCatalog::parse("Name,Potency\nSulphur,6C\nSulphur,6C\nSulphur,30C\n").unwrap();
        assert_eq!(catalog.search("sulphur").len(), 3);
    }

    #[test]
    fn results_are_capped_and_ordered() {
        let mut csv = String::from("Remedy Name,Potency\n");
        for i in 0..40 {
            csv.push_str(&format!("Calcarea {i:02},6C\n"));
        }
        let catalog = RemedyCatalog::parse(&csv).unwrap();
        let results = catalog.search("calc");

        assert_eq!(results.len(), SEARCH_LIMIT);
        assert_eq!(results[0].name, "Calcarea 00");
        assert_eq!(results[14].name, "Calcarea 14");
    }

    #[test]
    fn falls_back_to_plain_name_column_and_ragged_rows() {
        let catalog = RemedyCatalog::parse("name,Box\nNux Vomica\nPulsatilla,4\n").unwrap();
        let results = catalog.search("nux");
        assert_eq!(results[0].name, "Nux Vomica");
        assert_eq!(results[0].potency, "");
        assert_eq!(results[0].box_number, None);
        assert!(!results[0].available);
    }

    #[test]
    fn load_from_inline_source() {
        let catalog = RemedyCatalog::load(&RemedySource::Inline(SHEET.into())).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.labels()[0], "Remedy Name");
    }

    #[test]
    fn empty_source_is_unavailable() {
        let err = RemedyCatalog::load(&RemedySource::Inline(String::new())).unwrap_err();
        assert!(matches!(err, DeskError::SourceUnavailable { .. }));
    }

    proptest! {
        #[test]
        fn search_results_all_match_in_order(
            names in proptest::collection::vec("[a-e]{0,6}", 0..40),
            term in "[a-e]{1,2}",
        ) {
            let mut csv = String::from("Remedy Name,Potency\n");
            for name in &names {
                csv.push_str(&format!("{name},6C\n"));
            }
            let catalog = RemedyCatalog::parse(&csv).unwrap();
            let results = catalog.search(&term);

            let expected: Vec<&String> = names
                .iter()
                .filter(|n| !n.is_empty() && n.contains(term.as_str()))
                .take(SEARCH_LIMIT)
                .collect();
            prop_assert!(results.len() <= SEARCH_LIMIT);
            prop_assert_eq!(
                results.iter().map(|r| &r.name).collect::<Vec<_>>(),
                expected
            );
        }
    }
}
