//! Where the remedy inventory comes from.
//!
//! The inventory is a CSV export of the clinic's sheet. It is normally fetched over HTTP from
//! the sheet's export link; a saved export on disk works the same way.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::{DeskError, DeskResult};

/// HTTP request timeout for inventory downloads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A location the remedy inventory CSV can be read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemedySource {
    /// An `http://` or `https://` export link.
    Url(String),
    /// A CSV file on disk.
    File(PathBuf),
    /// CSV text already in memory (used by tests and imports).
    Inline(String),
}

impl RemedySource {
    /// Classify a configured location: http(s) links are fetched, anything else is a path.
    pub fn from_location(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    /// Human-readable location used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
            Self::Inline(_) => "<inline>".to_string(),
        }
    }

    /// Read the raw CSV text.
    ///
    /// Blocking: performs network or disk I/O on the calling thread.
    ///
    /// # Errors
    /// Returns [`DeskError::SourceUnavailable`] if the request fails, the server answers with a
    /// non-success status, or the file cannot be read.
    pub fn fetch(&self) -> DeskResult<String> {
        match self {
            Self::Url(url) => fetch_url(url),
            Self::File(path) => std::fs::read_to_string(path).map_err(|e| self.unavailable(e)),
            Self::Inline(text) => Ok(text.clone()),
        }
    }

    pub(crate) fn unavailable(&self, reason: impl std::fmt::Display) -> DeskError {
        DeskError::SourceUnavailable {
            location: self.describe(),
            reason: reason.to_string(),
        }
    }
}

fn fetch_url(url: &str) -> DeskResult<String> {
    let unavailable = |reason: String| DeskError::SourceUnavailable {
        location: url.to_string(),
        reason,
    };

    debug!(url, "fetching remedy inventory");

    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let response = client
        .get(url)
        .header(USER_AGENT, concat!("frontdesk/", env!("CARGO_PKG_VERSION")))
        .send()
        .map_err(|e| unavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!("HTTP {status}")));
    }

    response.text().map_err(|e| unavailable(e.to_string()))
}
