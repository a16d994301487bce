//! Consultation session state.
//!
//! A session is everything the front desk is holding for the consultation in progress: the
//! active patient, their visit history, and the prescription being written. Each session owns
//! its state outright; the service keeps one per operator and never shares them.
//!
//! Every operation runs to completion. When a remote call fails the session is left exactly as
//! it was.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{RemedyCatalog, SearchOutcome};
use crate::patient::{PatientRecord, VisitDraft, VisitRecord};
use crate::prescription::{apply_selection, current_search_term, remedy_entry};
use crate::store::{PatientLookup, RemoteStore};
use crate::{DeskError, DeskResult};

/// What a patient lookup did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Patient and history loaded.
    Found,
    /// Nobody with that phone; the desk should offer registration.
    NotFound,
}

/// Banner shown for the active patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    id: Uuid,
    current_patient: Option<PatientRecord>,
    visit_history: Vec<VisitRecord>,
    prescription: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            current_patient: None,
            visit_history: Vec::new(),
            prescription: String::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_patient(&self) -> Option<&PatientRecord> {
        self.current_patient.as_ref()
    }

    pub fn visit_history(&self) -> &[VisitRecord] {
        &self.visit_history
    }

    pub fn prescription(&self) -> &str {
        &self.prescription
    }

    pub fn active_patient_summary(&self) -> Option<PatientSummary> {
        self.current_patient.as_ref().map(|p| PatientSummary {
            name: p.display_name(),
            phone: p.phone.clone(),
        })
    }

    /// Replace the prescription text with what the operator typed.
    pub fn set_prescription(&mut self, text: impl Into<String>) {
        self.prescription = text.into();
    }

    /// The remedy search term taken from the in-progress prescription entry.
    pub fn search_term(&self) -> &str {
        current_search_term(&self.prescription)
    }

    /// Run the remedy finder for the current search term.
    pub fn find_remedies(&self, catalog: &RemedyCatalog) -> SearchOutcome {
        catalog.find(self.search_term())
    }

    /// Put a remedy into the in-progress prescription slot.
    ///
    /// # Errors
    /// Returns [`DeskError::InvalidInput`] for a blank remedy name.
    pub fn select_remedy(&mut self, name: &str, potency: &str) -> DeskResult<&str> {
        if name.trim().is_empty() {
            return Err(DeskError::InvalidInput("remedy name is required".into()));
        }
        self.prescription = apply_selection(&self.prescription, name, potency);
        debug!(session = %self.id, remedy = name, potency, "remedy added to prescription");
        Ok(&self.prescription)
    }

    /// Like [`Session::select_remedy`], but refuses a remedy the catalog lists as out of stock.
    ///
    /// Remedies the catalog does not list at all are accepted as typed.
    ///
    /// # Errors
    /// Returns [`DeskError::InvalidInput`] for a blank name or an unavailable remedy; the
    /// prescription is unchanged.
    pub fn select_stocked_remedy(
        &mut self,
        catalog: &RemedyCatalog,
        name: &str,
        potency: &str,
    ) -> DeskResult<&str> {
        if catalog.record(name, potency).is_some_and(|r| !r.available) {
            return Err(DeskError::InvalidInput(format!(
                "{} is not available",
                remedy_entry(name, potency)
            )));
        }
        self.select_remedy(name, potency)
    }

    /// Copy a past visit's prescription verbatim into the prescription text.
    ///
    /// # Errors
    /// Returns [`DeskError::HistoryIndex`] if `index` is outside the loaded history.
    pub fn repeat_prescription(&mut self, index: usize) -> DeskResult<&str> {
        let visit = self
            .visit_history
            .get(index)
            .ok_or(DeskError::HistoryIndex {
                index,
                len: self.visit_history.len(),
            })?;
        self.prescription = visit.prescription.clone();
        Ok(&self.prescription)
    }

    /// Look a patient up by phone.
    ///
    /// A found patient replaces the active patient and history. Not finding one clears both,
    /// so stale data from a previous patient never lingers.
    ///
    /// # Errors
    /// Returns the store's error ([`DeskError::RemoteFailure`]) and leaves the session
    /// unchanged.
    pub fn lookup_patient(
        &mut self,
        store: &dyn RemoteStore,
        phone: &str,
    ) -> DeskResult<LookupOutcome> {
        match store.get_patient(phone.trim())? {
            PatientLookup::Found { patient, history } => {
                info!(session = %self.id, visits = history.len(), "patient loaded");
                self.current_patient = Some(patient);
                self.visit_history = history;
                Ok(LookupOutcome::Found)
            }
            PatientLookup::NotFound => {
                info!(session = %self.id, "patient not found");
                self.current_patient = None;
                self.visit_history.clear();
                Ok(LookupOutcome::NotFound)
            }
        }
    }

    /// Validate and save a patient, then make them the active patient.
    ///
    /// Saving the already-active patient keeps their loaded history; anyone else starts
    /// with none.
    ///
    /// # Errors
    /// Returns [`DeskError::InvalidInput`] before any network call if the record is invalid,
    /// or the store's error if the save fails. The session is unchanged on error.
    pub fn register_patient(
        &mut self,
        store: &dyn RemoteStore,
        record: &PatientRecord,
        default_state: &str,
    ) -> DeskResult<&PatientRecord> {
        let record = record.normalised(default_state);
        record.validate()?;
        store.save_patient(&record)?;

        let same_patient = self
            .current_patient
            .as_ref()
            .is_some_and(|p| p.phone == record.phone);
        if !same_patient {
            self.visit_history.clear();
        }

        info!(session = %self.id, "patient saved");
        Ok(self.current_patient.insert(record))
    }

    /// Save the consultation for the active patient and reset the session.
    ///
    /// The visit takes the active patient's phone and the current prescription text. After a
    /// successful save the patient, history and prescription are cleared, ready for the next
    /// patient.
    ///
    /// # Errors
    /// Returns [`DeskError::NoActivePatient`] without a patient, or the store's error; the
    /// session is unchanged on error.
    pub fn complete_consultation(
        &mut self,
        store: &dyn RemoteStore,
        draft: VisitDraft,
    ) -> DeskResult<VisitRecord> {
        let patient = self
            .current_patient
            .as_ref()
            .ok_or(DeskError::NoActivePatient)?;
        let visit = draft.into_visit(&patient.phone, &self.prescription);

        store.save_visit(&visit)?;

        info!(session = %self.id, date = %visit.date, "consultation saved");
        self.reset();
        Ok(visit)
    }

    /// Forget the active patient, history and prescription.
    pub fn reset(&mut self) {
        self.current_patient = None;
        self.visit_history.clear();
        self.prescription.clear();
    }
}
