//! # Front Desk Core
//!
//! Core logic for the clinic front desk:
//! - loose column resolution over hand-maintained inventory sheets
//! - the remedy catalog and its name search
//! - prescription text editing driven by remedy selection
//! - availability classification
//! - per-session consultation state and the remote store façade
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and
//! `frontdesk-cli`.

pub mod availability;
pub mod catalog;
pub mod columns;
pub mod config;
pub mod constants;
pub mod error;
pub mod patient;
pub mod prescription;
pub mod session;
pub mod source;
pub mod store;

#[cfg(test)]
mod test_http;

pub use availability::is_available;
pub use catalog::{RemedyCatalog, RemedyRecord, SearchOutcome};
pub use columns::{resolve, resolve_index, Row};
pub use config::CoreConfig;
pub use constants::SEARCH_LIMIT;
pub use error::{DeskError, DeskResult};
pub use patient::{PatientRecord, Sex, VisitDraft, VisitRecord};
pub use prescription::{apply_selection, current_search_term};
pub use session::{LookupOutcome, PatientSummary, Session};
pub use source::RemedySource;
pub use store::{
    HttpConnector, HttpRemoteStore, MemoryStore, PatientLookup, RemoteStore, StoreConnector,
};

pub use frontdesk_types::{NonEmptyText, PhoneNumber, TextError};
