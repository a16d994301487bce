//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_MATERIA_MEDICA_URL, DEFAULT_REMEDY_SOURCE, DEFAULT_STATE};
use crate::source::RemedySource;
use crate::{DeskError, DeskResult};

/// Environment variable naming the remote store endpoint.
pub const STORE_URL_ENV: &str = "FRONTDESK_STORE_URL";
/// Environment variable naming the remedy source (URL or file path).
pub const REMEDY_SOURCE_ENV: &str = "FRONTDESK_REMEDY_SOURCE";
/// Environment variable naming the materia medica reference link.
pub const MATERIA_MEDICA_ENV: &str = "FRONTDESK_MATERIA_MEDICA_URL";
/// Environment variable naming the default patient region.
pub const DEFAULT_STATE_ENV: &str = "FRONTDESK_DEFAULT_STATE";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    store_endpoint: Option<String>,
    remedy_source: RemedySource,
    materia_medica_url: String,
    default_state: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// A blank store endpoint is treated as unset; store operations will then report
    /// [`DeskError::ConfigurationMissing`].
    pub fn new(
        store_endpoint: Option<String>,
        remedy_source: RemedySource,
        materia_medica_url: String,
        default_state: String,
    ) -> DeskResult<Self> {
        let store_endpoint = normalise_optional(store_endpoint);

        if let Some(endpoint) = &store_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(DeskError::InvalidInput(format!(
                    "store endpoint must be an http(s) URL: {endpoint}"
                )));
            }
        }

        if default_state.trim().is_empty() {
            return Err(DeskError::InvalidInput(
                "default_state cannot be empty".into(),
            ));
        }

        Ok(Self {
            store_endpoint,
            remedy_source,
            materia_medica_url,
            default_state: default_state.trim().to_string(),
        })
    }

    /// Build a configuration from already-read environment values.
    ///
    /// Takes the values rather than reading the environment so binaries resolve them once and
    /// tests can pass them explicitly.
    pub fn from_env_values(
        store_endpoint: Option<String>,
        remedy_source: Option<String>,
        materia_medica_url: Option<String>,
        default_state: Option<String>,
    ) -> DeskResult<Self> {
        let remedy_source = normalise_optional(remedy_source)
            .map(|s| RemedySource::from_location(&s))
            .unwrap_or_else(|| RemedySource::from_location(DEFAULT_REMEDY_SOURCE));

        Self::new(
            store_endpoint,
            remedy_source,
            normalise_optional(materia_medica_url)
                .unwrap_or_else(|| DEFAULT_MATERIA_MEDICA_URL.into()),
            normalise_optional(default_state).unwrap_or_else(|| DEFAULT_STATE.into()),
        )
    }

    /// Read the `FRONTDESK_*` variables from the process environment.
    ///
    /// Intended for binaries at startup only.
    pub fn from_process_env() -> DeskResult<Self> {
        Self::from_env_values(
            std::env::var(STORE_URL_ENV).ok(),
            std::env::var(REMEDY_SOURCE_ENV).ok(),
            std::env::var(MATERIA_MEDICA_ENV).ok(),
            std::env::var(DEFAULT_STATE_ENV).ok(),
        )
    }

    pub fn store_endpoint(&self) -> Option<&str> {
        self.store_endpoint.as_deref()
    }

    /// Returns a copy of this configuration pointing at another store endpoint.
    pub fn with_store_endpoint(&self, endpoint: Option<String>) -> DeskResult<Self> {
        Self::new(
            endpoint,
            self.remedy_source.clone(),
            self.materia_medica_url.clone(),
            self.default_state.clone(),
        )
    }

    pub fn remedy_source(&self) -> &RemedySource {
        &self.remedy_source
    }

    pub fn materia_medica_url(&self) -> &str {
        &self.materia_medica_url
    }

    pub fn default_state(&self) -> &str {
        &self.default_state
    }
}

fn normalise_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
