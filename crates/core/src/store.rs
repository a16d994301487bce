//! Remote store façade.
//!
//! Patients and visits live in a spreadsheet behind a script endpoint. The endpoint speaks a
//! small request/response protocol:
//!
//! - `GET {endpoint}?action=getPatient&phone={phone}` returns
//!   `{"status": "success", "patient": {...}, "history": [...]}` or another status when the
//!   patient is unknown.
//! - `POST {endpoint}` with `{"action": "savePatient" | "saveVisit", "data": {...}}` writes a
//!   row.
//!
//! Writes are fire-and-forget: there is no transaction, version check or idempotency key, so a
//! retried `saveVisit` can record the visit twice. Nothing here retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::constants::{ACTION_GET_PATIENT, ACTION_SAVE_PATIENT, ACTION_SAVE_VISIT};
use crate::patient::{PatientRecord, VisitRecord};
use crate::{DeskError, DeskResult};

/// HTTP request timeout for store calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a patient lookup. Not finding a patient is an expected result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientLookup {
    Found {
        patient: PatientRecord,
        history: Vec<VisitRecord>,
    },
    NotFound,
}

/// Read/write access to the system of record for patients and visits.
pub trait RemoteStore {
    fn get_patient(&self, phone: &str) -> DeskResult<PatientLookup>;
    fn save_patient(&self, patient: &PatientRecord) -> DeskResult<()>;
    fn save_visit(&self, visit: &VisitRecord) -> DeskResult<()>;
}

/// Opens a [`RemoteStore`] for one operation.
///
/// Surfaces hold a connector rather than a store so the endpoint can change at runtime and so
/// blocking HTTP clients are created on the thread that uses them.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, cfg: &CoreConfig) -> DeskResult<Box<dyn RemoteStore>>;
}

/// Connects to the configured script endpoint over HTTP.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpConnector;

impl StoreConnector for HttpConnector {
    fn connect(&self, cfg: &CoreConfig) -> DeskResult<Box<dyn RemoteStore>> {
        Ok(Box::new(HttpRemoteStore::from_config(cfg)?))
    }
}

#[derive(Serialize)]
struct WriteRequest<'a, T> {
    action: &'static str,
    data: &'a T,
}

#[derive(Deserialize)]
struct GetPatientResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    patient: Option<PatientRecord>,
    #[serde(default)]
    history: Vec<VisitRecord>,
}

#[derive(Deserialize)]
struct WriteResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Blocking HTTP client for the script endpoint.
pub struct HttpRemoteStore {
    client: Client,
    endpoint: String,
}

impl HttpRemoteStore {
    /// Create a client for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> DeskResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeskError::RemoteFailure(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns [`DeskError::ConfigurationMissing`] without touching the network when no
    /// endpoint is configured.
    pub fn from_config(cfg: &CoreConfig) -> DeskResult<Self> {
        let endpoint = cfg
            .store_endpoint()
            .ok_or(DeskError::ConfigurationMissing)?;
        Self::new(endpoint)
    }

    fn post<T: Serialize>(&self, action: &'static str, data: &T) -> DeskResult<()> {
        debug!(action, "posting to remote store");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&WriteRequest { action, data })
            .send()
            .map_err(|e| DeskError::RemoteFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeskError::RemoteFailure(format!("HTTP {status}")));
        }

        // The script may answer with plain text; only an explicit error status is a failure.
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                warn!(action, error = %e, "could not read remote store acknowledgement");
                return Ok(());
            }
        };
        if let Ok(ack) = serde_json::from_str::<WriteResponse>(&body) {
            if ack.status.eq_ignore_ascii_case("error") {
                let message = ack.message.unwrap_or_else(|| format!("{action} rejected"));
                warn!(action, %message, "remote store rejected write");
                return Err(DeskError::RemoteFailure(message));
            }
        }

        Ok(())
    }
}

impl RemoteStore for HttpRemoteStore {
    fn get_patient(&self, phone: &str) -> DeskResult<PatientLookup> {
        debug!(phone, "looking up patient");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", ACTION_GET_PATIENT), ("phone", phone)])
            .send()
            .map_err(|e| DeskError::RemoteFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeskError::RemoteFailure(format!("HTTP {status}")));
        }

        let body: GetPatientResponse = response
            .json()
            .map_err(|e| DeskError::RemoteFailure(format!("invalid response: {e}")))?;

        interpret_lookup(body)
    }

    fn save_patient(&self, patient: &PatientRecord) -> DeskResult<()> {
        self.post(ACTION_SAVE_PATIENT, patient)
    }

    fn save_visit(&self, visit: &VisitRecord) -> DeskResult<()> {
        self.post(ACTION_SAVE_VISIT, visit)
    }
}

fn interpret_lookup(body: GetPatientResponse) -> DeskResult<PatientLookup> {
    if body.status != "success" {
        return Ok(PatientLookup::NotFound);
    }
    match body.patient {
        Some(patient) => Ok(PatientLookup::Found {
            patient,
            history: body.history,
        }),
        None => Err(DeskError::RemoteFailure(
            "success response without a patient".into(),
        )),
    }
}

#[derive(Debug, Default)]
struct MemoryTables {
    patients: HashMap<String, PatientRecord>,
    visits: Vec<VisitRecord>,
    fail_writes: bool,
}

/// In-process store with the same semantics as the script endpoint.
///
/// Saving a patient with an existing phone replaces the row; visits append. Clones share the
/// same tables, so it can also serve as its own [`StoreConnector`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`DeskError::RemoteFailure`].
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.fail_writes = fail;
        }
    }

    pub fn visits(&self) -> Vec<VisitRecord> {
        self.tables
            .lock()
            .map(|t| t.visits.clone())
            .unwrap_or_default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut MemoryTables) -> DeskResult<T>) -> DeskResult<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DeskError::RemoteFailure("memory store poisoned".into()))?;
        f(&mut tables)
    }
}

impl RemoteStore for MemoryStore {
    fn get_patient(&self, phone: &str) -> DeskResult<PatientLookup> {
        self.with_tables(|t| {
            let phone = phone.trim();
            Ok(match t.patients.get(phone) {
                Some(patient) => PatientLookup::Found {
                    patient: patient.clone(),
                    history: t
                        .visits
                        .iter()
                        .filter(|v| v.patient_phone == phone)
                        .cloned()
                        .collect(),
                },
                None => PatientLookup::NotFound,
            })
        })
    }

    fn save_patient(&self, patient: &PatientRecord) -> DeskResult<()> {
        self.with_tables(|t| {
            if t.fail_writes {
                return Err(DeskError::RemoteFailure("write rejected".into()));
            }
            t.patients.insert(patient.phone.clone(), patient.clone());
            Ok(())
        })
    }

    fn save_visit(&self, visit: &VisitRecord) -> DeskResult<()> {
        self.with_tables(|t| {
            if t.fail_writes {
                return Err(DeskError::RemoteFailure("write rejected".into()));
            }
            t.visits.push(visit.clone());
            Ok(())
        })
    }
}

impl StoreConnector for MemoryStore {
    fn connect(&self, _cfg: &CoreConfig) -> DeskResult<Box<dyn RemoteStore>> {
        Ok(Box::new(self.clone()))
    }
}
