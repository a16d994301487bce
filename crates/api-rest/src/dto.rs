//! Request and response bodies for the REST API.
//!
//! These mirror the core types with OpenAPI schemas attached; the core crate stays free of API
//! concerns.

use frontdesk_core::{
    DeskError, DeskResult, PatientRecord, PatientSummary, RemedyRecord, SearchOutcome, Session,
    Sex, VisitDraft, VisitRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine-readable error kind.
    pub error: String,
    /// Message for the operator.
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncCatalogRes {
    pub remedies: usize,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemedyRes {
    pub name: String,
    pub potency: String,
    pub box_number: Option<String>,
    pub available: bool,
}

impl From<RemedyRecord> for RemedyRes {
    fn from(r: RemedyRecord) -> Self {
        Self {
            name: r.name,
            potency: r.potency,
            box_number: r.box_number,
            available: r.available,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Name fragment to match.
    #[serde(default)]
    pub term: String,
}

/// Remedy finder panel contents.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemedyFinderRes {
    pub term: String,
    /// `no_catalog`, `no_term`, `no_matches` or `matches`.
    pub status: String,
    pub remedies: Vec<RemedyRes>,
}

impl RemedyFinderRes {
    pub fn from_outcome(term: &str, outcome: SearchOutcome) -> Self {
        let (status, remedies) = match outcome {
            SearchOutcome::NoTerm => ("no_term", Vec::new()),
            SearchOutcome::NoMatches => ("no_matches", Vec::new()),
            SearchOutcome::Matches(records) => {
                ("matches", records.into_iter().map(RemedyRes::from).collect())
            }
        };
        Self {
            term: term.to_string(),
            status: status.to_string(),
            remedies,
        }
    }

    pub fn no_catalog(term: &str) -> Self {
        Self {
            term: term.to_string(),
            status: "no_catalog".to_string(),
            remedies: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientBody {
    pub phone: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// `Male`, `Female` or `Other`.
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    /// `YYYY-MM-DD` or empty.
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub age: u32,
}

impl PatientBody {
    pub fn into_record(self) -> DeskResult<PatientRecord> {
        let sex = if self.sex.trim().is_empty() {
            Sex::default()
        } else {
            self.sex.parse::<Sex>()?
        };
        Ok(PatientRecord {
            phone: self.phone,
            first_name: self.first_name,
            last_name: self.last_name,
            sex,
            city: self.city,
            state: self.state,
            date_of_birth: self.dob,
            age: self.age,
        })
    }
}

impl From<&PatientRecord> for PatientBody {
    fn from(p: &PatientRecord) -> Self {
        Self {
            phone: p.phone.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            sex: format!("{:?}", p.sex),
            city: p.city.clone(),
            state: p.state.clone(),
            dob: p.date_of_birth.clone(),
            age: p.age,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitBody {
    pub patient_phone: String,
    pub date: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
}

impl From<&VisitRecord> for VisitBody {
    fn from(v: &VisitRecord) -> Self {
        Self {
            patient_phone: v.patient_phone.clone(),
            date: v.date.clone(),
            symptoms: v.symptoms.clone(),
            diagnosis: v.diagnosis.clone(),
            prescription: v.prescription.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivePatientRes {
    pub name: String,
    pub phone: String,
}

impl From<PatientSummary> for ActivePatientRes {
    fn from(s: PatientSummary) -> Self {
        Self {
            name: s.name,
            phone: s.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRes {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub session_id: String,
    pub active_patient: Option<ActivePatientRes>,
    pub patient: Option<PatientBody>,
    pub history: Vec<VisitBody>,
    pub prescription: String,
    pub search_term: String,
}

impl From<&Session> for SessionRes {
    fn from(s: &Session) -> Self {
        Self {
            session_id: s.id().to_string(),
            active_patient: s.active_patient_summary().map(Into::into),
            patient: s.current_patient().map(PatientBody::from),
            history: s.visit_history().iter().map(VisitBody::from).collect(),
            prescription: s.prescription().to_string(),
            search_term: s.search_term().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetPrescriptionReq {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SelectRemedyReq {
    pub name: String,
    #[serde(default)]
    pub potency: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub prescription: String,
    pub search_term: String,
}

impl PrescriptionRes {
    pub fn from_text(text: &str) -> Self {
        Self {
            prescription: text.to_string(),
            search_term: frontdesk_core::current_search_term(text).to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LookupPatientReq {
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LookupPatientRes {
    /// `found` or `not_found`.
    pub outcome: String,
    pub session: SessionRes,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DraftRes {
    pub date: String,
    pub symptoms: String,
    pub diagnosis: String,
}

impl From<VisitDraft> for DraftRes {
    fn from(d: VisitDraft) -> Self {
        Self {
            date: d.date.format("%Y-%m-%d").to_string(),
            symptoms: d.symptoms,
            diagnosis: d.diagnosis,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteConsultationReq {
    /// `YYYY-MM-DD`; defaults to today.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub diagnosis: String,
}

impl CompleteConsultationReq {
    pub fn into_draft(self, today: chrono::NaiveDate) -> DeskResult<VisitDraft> {
        let date = if self.date.trim().is_empty() {
            today
        } else {
            frontdesk_core::patient::parse_iso_date(&self.date)?
        };
        let mut draft = VisitDraft::new(date);
        if !self.symptoms.is_empty() {
            draft.symptoms = self.symptoms;
        }
        draft.diagnosis = self.diagnosis;
        Ok(draft)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteConsultationRes {
    pub visit: VisitBody,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReferenceRes {
    pub materia_medica_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreEndpointReq {
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreEndpointRes {
    pub configured: bool,
}

/// Machine-readable kind for an error body.
pub fn error_kind(e: &DeskError) -> &'static str {
    match e {
        DeskError::ConfigurationMissing => "configuration_missing",
        DeskError::SourceUnavailable { .. } => "source_unavailable",
        DeskError::RemoteFailure(_) => "remote_failure",
        DeskError::InvalidInput(_) => "invalid_input",
        DeskError::NoActivePatient => "no_active_patient",
        DeskError::HistoryIndex { .. } => "history_index",
    }
}
