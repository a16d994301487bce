//! Constants used throughout the front-desk core crate.
//!
//! Column candidate lists, wire action names and defaults live here so the catalog, the store
//! client and the surfaces agree on them.

/// Default remedy inventory: the clinic sheet's CSV export.
pub const DEFAULT_REMEDY_SOURCE: &str = "https://docs.google.com/spreadsheets/d/11aZgt8hafBHfu0ZHeuyQH_MS09791YHXy_r-7LWc8KM/export?format=csv&gid=369787331";

/// Default materia medica reference shown beside the remedy finder.
pub const DEFAULT_MATERIA_MEDICA_URL: &str =
    "https://www.materiamedica.info/en/materia-medica/john-henry-clarke/";

/// Region recorded on new patient records when the form does not supply one.
pub const DEFAULT_STATE: &str = "CA";

/// Maximum number of remedies returned by a single search.
pub const SEARCH_LIMIT: usize = 15;

/// Column candidates for the remedy name.
pub const NAME_COLUMNS: &[&str] = &["Remedy Name", "Name"];

/// Column candidates for the remedy potency.
pub const POTENCY_COLUMNS: &[&str] = &["Potency"];

/// Column candidates for the storage box.
pub const BOX_COLUMNS: &[&str] = &["BOX Number", "Box"];

/// Column candidates for the availability marker.
pub const AVAILABILITY_COLUMNS: &[&str] = &["Available y/n", "Available"];

/// Normalised availability markers that count as "in stock".
pub const AVAILABLE_MARKERS: &[&str] = &["y", "yes", "1", "available", "true"];

/// Oldest age accepted on the registration form.
pub const MAX_AGE: u32 = 120;

/// Remote store action names.
pub const ACTION_GET_PATIENT: &str = "getPatient";
pub const ACTION_SAVE_PATIENT: &str = "savePatient";
pub const ACTION_SAVE_VISIT: &str = "saveVisit";
