//! HTTP routes for the front desk.
//!
//! Handlers are thin: they resolve the session, hand blocking store and catalog work to the
//! blocking thread pool, and map the outcome to JSON.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Local;
use frontdesk_core::{DeskError, LookupOutcome, PhoneNumber, RemedyCatalog, VisitDraft};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::dto::{
    ActivePatientRes, CompleteConsultationReq, CompleteConsultationRes, CreateSessionRes,
    DraftRes, ErrorRes, HealthRes, LookupPatientReq, LookupPatientRes, PatientBody,
    PrescriptionRes, ReferenceRes, RemedyFinderRes, RemedyRes, SearchQuery, SelectRemedyReq,
    SessionRes, SetPrescriptionReq, StoreEndpointReq, StoreEndpointRes, SyncCatalogRes,
    VisitBody,
};
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        sync_catalog,
        search_catalog,
        create_session,
        get_session,
        end_session,
        set_prescription,
        session_remedies,
        select_remedy,
        lookup_patient,
        register_patient,
        consultation_draft,
        complete_consultation,
        repeat_prescription,
        reference,
        set_store_endpoint,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        SyncCatalogRes,
        RemedyRes,
        RemedyFinderRes,
        PatientBody,
        VisitBody,
        ActivePatientRes,
        CreateSessionRes,
        SessionRes,
        SetPrescriptionReq,
        SelectRemedyReq,
        PrescriptionRes,
        LookupPatientReq,
        LookupPatientRes,
        DraftRes,
        CompleteConsultationReq,
        CompleteConsultationRes,
        ReferenceRes,
        StoreEndpointReq,
        StoreEndpointRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/catalog/sync", post(sync_catalog))
        .route("/catalog/search", get(search_catalog))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(end_session))
        .route("/sessions/:id/prescription", put(set_prescription))
        .route("/sessions/:id/prescription/select", post(select_remedy))
        .route("/sessions/:id/remedies", get(session_remedies))
        .route("/sessions/:id/patient/lookup", post(lookup_patient))
        .route("/sessions/:id/patient", post(register_patient))
        .route("/sessions/:id/consultation/draft", get(consultation_draft))
        .route("/sessions/:id/consultation", post(complete_consultation))
        .route(
            "/sessions/:id/history/:index/repeat",
            post(repeat_prescription),
        )
        .route("/reference", get(reference))
        .route("/settings/store-endpoint", put(set_store_endpoint))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadSessionId(raw.to_string()))
}

/// Run blocking network or file work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))?
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness check.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Front desk REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/catalog/sync",
    responses(
        (status = 200, description = "Catalog reloaded", body = SyncCatalogRes),
        (status = 502, description = "Remedy source unavailable", body = ErrorRes)
    )
)]
/// Reload the remedy catalog from the configured source.
///
/// On failure the previously loaded catalog stays in place.
#[axum::debug_handler]
async fn sync_catalog(State(state): State<AppState>) -> ApiResult<SyncCatalogRes> {
    let source = state.config()?.remedy_source().clone();
    let described = source.describe();

    let catalog = blocking(move || Ok(RemedyCatalog::load(&source)?)).await?;
    let remedies = catalog.len();
    state.replace_catalog(catalog)?;

    tracing::info!(remedies, source = %described, "remedy catalog synced");
    Ok(Json(SyncCatalogRes {
        remedies,
        source: described,
    }))
}

#[utoipa::path(
    get,
    path = "/catalog/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching remedies", body = RemedyFinderRes)
    )
)]
/// Search the catalog by name fragment.
#[axum::debug_handler]
async fn search_catalog(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<RemedyFinderRes> {
    let term = query.term.trim();
    Ok(Json(match state.catalog()? {
        Some(catalog) => RemedyFinderRes::from_outcome(term, catalog.find(term)),
        None => RemedyFinderRes::no_catalog(term),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created", body = CreateSessionRes)
    )
)]
/// Start a consultation session.
#[axum::debug_handler]
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionRes>), ApiError> {
    let id = state.create_session()?;
    tracing::info!(session = %id, "session created");
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionRes {
            session_id: id.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<SessionRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let session = session.lock().await;
    Ok(Json(SessionRes::from(&*session)))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn end_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    state.remove_session(parse_session_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/prescription",
    params(("id" = String, Path, description = "Session id")),
    request_body = SetPrescriptionReq,
    responses(
        (status = 200, description = "Prescription text stored", body = PrescriptionRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Store the prescription text exactly as typed.
#[axum::debug_handler]
async fn set_prescription(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SetPrescriptionReq>,
) -> ApiResult<PrescriptionRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let mut session = session.lock().await;
    session.set_prescription(req.text);
    Ok(Json(PrescriptionRes::from_text(session.prescription())))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/remedies",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Remedy finder for the entry being typed", body = RemedyFinderRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Remedy finder results for the entry currently being typed.
#[axum::debug_handler]
async fn session_remedies(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<RemedyFinderRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let catalog = state.catalog()?;
    let session = session.lock().await;
    let term = session.search_term();

    Ok(Json(match catalog {
        Some(catalog) => RemedyFinderRes::from_outcome(term, session.find_remedies(&catalog)),
        None => RemedyFinderRes::no_catalog(term),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/prescription/select",
    params(("id" = String, Path, description = "Session id")),
    request_body = SelectRemedyReq,
    responses(
        (status = 200, description = "Remedy merged into the prescription", body = PrescriptionRes),
        (status = 400, description = "Blank remedy name or remedy unavailable", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Merge a chosen remedy into the prescription.
///
/// With a catalog loaded, a remedy it lists as unavailable is refused.
#[axum::debug_handler]
async fn select_remedy(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SelectRemedyReq>,
) -> ApiResult<PrescriptionRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let catalog = state.catalog()?;
    let mut session = session.lock().await;
    let text = match catalog {
        Some(catalog) => session.select_stocked_remedy(&catalog, &req.name, &req.potency)?,
        None => session.select_remedy(&req.name, &req.potency)?,
    };
    Ok(Json(PrescriptionRes::from_text(text)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/patient/lookup",
    params(("id" = String, Path, description = "Session id")),
    request_body = LookupPatientReq,
    responses(
        (status = 200, description = "Lookup finished; outcome is found or not_found", body = LookupPatientRes),
        (status = 400, description = "Invalid phone number", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 502, description = "Store request failed", body = ErrorRes),
        (status = 503, description = "Store endpoint not configured", body = ErrorRes)
    )
)]
/// Look a patient up by phone and load their visit history.
#[axum::debug_handler]
async fn lookup_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<LookupPatientReq>,
) -> ApiResult<LookupPatientRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let phone = PhoneNumber::new(&req.phone).map_err(DeskError::from)?;
    let cfg = state.config()?;
    let connector = state.connector();
    let mut session = session.lock_owned().await;

    let res = blocking(move || {
        let store = connector.connect(&cfg)?;
        let outcome = session.lookup_patient(store.as_ref(), phone.as_str())?;
        Ok(LookupPatientRes {
            outcome: match outcome {
                LookupOutcome::Found => "found",
                LookupOutcome::NotFound => "not_found",
            }
            .to_string(),
            session: SessionRes::from(&*session),
        })
    })
    .await?;

    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/patient",
    params(("id" = String, Path, description = "Session id")),
    request_body = PatientBody,
    responses(
        (status = 200, description = "Patient saved and made active", body = SessionRes),
        (status = 400, description = "Invalid patient details", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 502, description = "Store request failed", body = ErrorRes),
        (status = 503, description = "Store endpoint not configured", body = ErrorRes)
    )
)]
/// Register a new patient or save edits to the active one.
#[axum::debug_handler]
async fn register_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<PatientBody>,
) -> ApiResult<SessionRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let record = req.into_record()?;
    let cfg = state.config()?;
    let connector = state.connector();
    let mut session = session.lock_owned().await;

    let res = blocking(move || {
        let store = connector.connect(&cfg)?;
        session.register_patient(store.as_ref(), &record, cfg.default_state())?;
        Ok(SessionRes::from(&*session))
    })
    .await?;

    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/consultation/draft",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Default consultation fields", body = DraftRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Default fields for a new consultation dated today.
#[axum::debug_handler]
async fn consultation_draft(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<DraftRes> {
    state.session(parse_session_id(&id)?)?;
    Ok(Json(DraftRes::from(VisitDraft::new(
        Local::now().date_naive(),
    ))))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/consultation",
    params(("id" = String, Path, description = "Session id")),
    request_body = CompleteConsultationReq,
    responses(
        (status = 200, description = "Visit saved and session reset", body = CompleteConsultationRes),
        (status = 400, description = "No active patient or invalid date", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 502, description = "Store request failed", body = ErrorRes),
        (status = 503, description = "Store endpoint not configured", body = ErrorRes)
    )
)]
/// Save the consultation for the active patient.
#[axum::debug_handler]
async fn complete_consultation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<CompleteConsultationReq>,
) -> ApiResult<CompleteConsultationRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let draft = req.into_draft(Local::now().date_naive())?;
    let cfg = state.config()?;
    let connector = state.connector();
    let mut session = session.lock_owned().await;

    let visit = blocking(move || {
        let store = connector.connect(&cfg)?;
        Ok(session.complete_consultation(store.as_ref(), draft)?)
    })
    .await?;

    Ok(Json(CompleteConsultationRes {
        visit: VisitBody::from(&visit),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/history/{index}/repeat",
    params(
        ("id" = String, Path, description = "Session id"),
        ("index" = usize, Path, description = "Position in the loaded visit history")
    ),
    responses(
        (status = 200, description = "Prescription copied from the visit", body = PrescriptionRes),
        (status = 400, description = "No visit at that index", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
/// Copy a past visit's prescription into the session.
#[axum::debug_handler]
async fn repeat_prescription(
    State(state): State<AppState>,
    AxumPath((id, index)): AxumPath<(String, String)>,
) -> ApiResult<PrescriptionRes> {
    let session = state.session(parse_session_id(&id)?)?;
    let index = index
        .parse::<usize>()
        .map_err(|_| DeskError::InvalidInput(format!("invalid history index: {index}")))?;

    let mut session = session.lock().await;
    let text = session.repeat_prescription(index)?;
    Ok(Json(PrescriptionRes::from_text(text)))
}

#[utoipa::path(
    get,
    path = "/reference",
    responses(
        (status = 200, description = "Materia medica reference link", body = ReferenceRes)
    )
)]
#[axum::debug_handler]
async fn reference(State(state): State<AppState>) -> ApiResult<ReferenceRes> {
    Ok(Json(ReferenceRes {
        materia_medica_url: state.config()?.materia_medica_url().to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/settings/store-endpoint",
    request_body = StoreEndpointReq,
    responses(
        (status = 200, description = "Store endpoint updated", body = StoreEndpointRes),
        (status = 400, description = "Endpoint is not an http(s) URL", body = ErrorRes)
    )
)]
/// Point patient and visit operations at another store endpoint, or clear it.
#[axum::debug_handler]
async fn set_store_endpoint(
    State(state): State<AppState>,
    Json(req): Json<StoreEndpointReq>,
) -> ApiResult<StoreEndpointRes> {
    let configured = state.set_store_endpoint(req.endpoint)?;
    tracing::info!(configured, "store endpoint updated");
    Ok(Json(StoreEndpointRes { configured }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use frontdesk_core::{
        CoreConfig, DeskResult, HttpConnector, MemoryStore, PatientLookup, PatientRecord,
        RemedySource, RemoteStore, StoreConnector, VisitRecord,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const INVENTORY: &str = "Remedy Name,Potency,BOX Number,Available y/n\n\
        Arnica Montana,30C,B1,Y\n\
        Belladonna,200C,B2,N\n";

    fn config(source: RemedySource) -> CoreConfig {
        CoreConfig::new(
            None,
            source,
            "https://example.org/materia-medica".into(),
            "CA".into(),
        )
        .unwrap()
    }

    fn app_with(source: RemedySource, connector: Arc<dyn StoreConnector>) -> Router {
        router(AppState::new(config(source), connector))
    }

    /// Holds every patient lookup at a barrier until the test lets it through.
    struct GatedConnector {
        store: MemoryStore,
        gate: Arc<Barrier>,
    }

    struct GatedStore {
        store: MemoryStore,
        gate: Arc<Barrier>,
    }

    impl StoreConnector for GatedConnector {
        fn connect(&self, _cfg: &CoreConfig) -> DeskResult<Box<dyn RemoteStore>> {
            Ok(Box::new(GatedStore {
                store: self.store.clone(),
                gate: self.gate.clone(),
            }))
        }
    }

    impl RemoteStore for GatedStore {
        fn get_patient(&self, phone: &str) -> DeskResult<PatientLookup> {
            // entered
            self.gate.wait();
            // released
            self.gate.wait();
            self.store.get_patient(phone)
        }

        fn save_patient(&self, patient: &PatientRecord) -> DeskResult<()> {
            self.store.save_patient(patient)
        }

        fn save_visit(&self, visit: &VisitRecord) -> DeskResult<()> {
            self.store.save_visit(visit)
        }
    }

    fn app(store: &MemoryStore) -> Router {
        app_with(
            RemedySource::Inline(INVENTORY.into()),
            Arc::new(store.clone()),
        )
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_alive() {
        let (status, body) = send(&app(&MemoryStore::new()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn search_needs_a_synced_catalog() {
        let app = app(&MemoryStore::new());

        let (_, body) = send(&app, "GET", "/catalog/search?term=arn", None).await;
        assert_eq!(body["status"], "no_catalog");

        let (status, body) = send(&app, "POST", "/catalog/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["remedies"], 2);

        let (_, body) = send(&app, "GET", "/catalog/search?term=arn", None).await;
        assert_eq!(body["status"], "matches");
        assert_eq!(body["remedies"][0]["name"], "Arnica Montana");
        assert_eq!(body["remedies"][0]["box_number"], "B1");
        assert_eq!(body["remedies"][0]["available"], true);

        let (_, body) = send(&app, "GET", "/catalog/search?term=zzz", None).await;
        assert_eq!(body["status"], "no_matches");
    }

    #[tokio::test]
    async fn failed_sync_keeps_previous_catalog() {
        let app = app_with(
            RemedySource::File("/nonexistent/remedies.csv".into()),
            Arc::new(MemoryStore::new()),
        );

        let (status, body) = send(&app, "POST", "/catalog/sync", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "source_unavailable");

        let (_, body) = send(&app, "GET", "/catalog/search?term=arn", None).await;
        assert_eq!(body["status"], "no_catalog");
    }

    #[tokio::test]
    async fn consultation_flow_saves_visit_and_resets_session() {
        let store = MemoryStore::new();
        let app = app(&store);
        send(&app, "POST", "/catalog/sync", None).await;
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/patient"),
            Some(json!({"phone": "5551234", "firstName": "Ada", "lastName": "Lovelace", "sex": "Female"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_patient"]["name"], "Ada Lovelace");
        assert_eq!(body["patient"]["state"], "CA");

        let (_, body) = send(
            &app,
            "PUT",
            &format!("/sessions/{id}/prescription"),
            Some(json!({"text": "Bryonia 30C, arn"})),
        )
        .await;
        assert_eq!(body["search_term"], "arn");

        let (_, body) = send(&app, "GET", &format!("/sessions/{id}/remedies"), None).await;
        assert_eq!(body["status"], "matches");
        assert_eq!(body["remedies"][0]["name"], "Arnica Montana");
        assert_eq!(body["remedies"][0]["available"], true);

        let (_, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/prescription/select"),
            Some(json!({"name": "Arnica Montana", "potency": "30C"})),
        )
        .await;
        assert_eq!(body["prescription"], "Bryonia 30C, Arnica Montana 30C, ");
        assert_eq!(body["search_term"], "");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/consultation"),
            Some(json!({"date": "2026-10-19", "diagnosis": "sprain"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visit"]["patientPhone"], "5551234");
        assert_eq!(body["visit"]["symptoms"], "2026-10-19; ");
        assert_eq!(body["visit"]["prescription"], "Bryonia 30C, Arnica Montana 30C, ");
        assert_eq!(store.visits().len(), 1);

        let (_, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert!(body["patient"].is_null());
        assert_eq!(body["prescription"], "");
    }

    #[tokio::test]
    async fn unavailable_remedy_cannot_be_selected() {
        let app = app(&MemoryStore::new());
        let id = new_session(&app).await;
        let select = format!("/sessions/{id}/prescription/select");
        send(
            &app,
            "PUT",
            &format!("/sessions/{id}/prescription"),
            Some(json!({"text": "bell"})),
        )
        .await;

        // no catalog loaded yet, so nothing is known to be out of stock
        let (status, body) = send(
            &app,
            "POST",
            &select,
            Some(json!({"name": "Belladonna", "potency": "200C"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prescription"], "Belladonna 200C, ");

        send(&app, "POST", "/catalog/sync", None).await;
        let (status, body) = send(
            &app,
            "POST",
            &select,
            Some(json!({"name": "belladonna", "potency": "200c"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");

        let (_, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(body["prescription"], "Belladonna 200C, ");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pending_store_call_does_not_stall_other_requests() {
        let store = MemoryStore::new();
        store
            .save_patient(&PatientRecord {
                phone: "5551234".into(),
                first_name: "Ada".into(),
                ..Default::default()
            })
            .unwrap();
        let gate = Arc::new(Barrier::new(2));
        let app = app_with(
            RemedySource::Inline(INVENTORY.into()),
            Arc::new(GatedConnector {
                store,
                gate: gate.clone(),
            }),
        );
        let id = new_session(&app).await;

        let lookup = tokio::spawn({
            let app = app.clone();
            let uri = format!("/sessions/{id}/patient/lookup");
            async move { send(&app, "POST", &uri, Some(json!({"phone": "5551234"}))).await }
        });
        let entered = gate.clone();
        tokio::task::spawn_blocking(move || entered.wait())
            .await
            .unwrap();

        let snapshot = tokio::spawn({
            let app = app.clone();
            let uri = format!("/sessions/{id}");
            async move { send(&app, "GET", &uri, None).await }
        });
        let (status, _) = tokio::time::timeout(
            Duration::from_secs(2),
            send(&app, "GET", "/health", None),
        )
        .await
        .expect("health should answer while the lookup is pending");
        assert_eq!(status, StatusCode::OK);
        assert!(!snapshot.is_finished());

        let release = gate.clone();
        tokio::task::spawn_blocking(move || release.wait())
            .await
            .unwrap();

        let (status, body) = lookup.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "found");
        let (_, body) = snapshot.await.unwrap();
        assert_eq!(body["patient"]["phone"], "5551234");
    }

    #[tokio::test]
    async fn idle_sessions_are_dropped_when_a_new_one_opens() {
        let state = AppState::new(
            config(RemedySource::Inline(INVENTORY.into())),
            Arc::new(MemoryStore::new()),
        )
        .with_session_idle_timeout(Duration::ZERO);
        let app = router(state);

        let first = new_session(&app).await;
        let second = new_session(&app).await;

        let (status, _) = send(&app, "GET", &format!("/sessions/{first}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", &format!("/sessions/{second}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn lookup_loads_history_and_repeat_copies_it() {
        let store = MemoryStore::new();
        store
            .save_visit(&VisitRecord {
                patient_phone: "5551234".into(),
                date: "2026-01-02".into(),
                prescription: "Bryonia 30C, ".into(),
                ..Default::default()
            })
            .unwrap();
        store
            .save_patient(&PatientRecord {
                phone: "5551234".into(),
                first_name: "Ada".into(),
                ..Default::default()
            })
            .unwrap();
        let app = app(&store);
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/patient/lookup"),
            Some(json!({"phone": "5551234"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "found");
        assert_eq!(body["session"]["history"][0]["date"], "2026-01-02");

        let (_, body) = send(&app, "POST", &format!("/sessions/{id}/history/0/repeat"), None).await;
        assert_eq!(body["prescription"], "Bryonia 30C, ");

        let (status, body) =
            send(&app, "POST", &format!("/sessions/{id}/history/5/repeat"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "history_index");

        let (_, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/patient/lookup"),
            Some(json!({"phone": "5559999"})),
        )
        .await;
        assert_eq!(body["outcome"], "not_found");
        assert!(body["session"]["patient"].is_null());
        assert_eq!(body["session"]["history"], json!([]));
    }

    #[tokio::test]
    async fn store_calls_without_endpoint_are_unavailable() {
        let app = app_with(
            RemedySource::Inline(INVENTORY.into()),
            Arc::new(HttpConnector),
        );
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/patient/lookup"),
            Some(json!({"phone": "5551234"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "configuration_missing");
    }

    #[tokio::test]
    async fn consultation_without_patient_is_rejected() {
        let store = MemoryStore::new();
        let app = app(&store);
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/consultation"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no_active_patient");
        assert!(store.visits().is_empty());
    }

    #[tokio::test]
    async fn invalid_registration_is_a_bad_request() {
        let app = app(&MemoryStore::new());
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{id}/patient"),
            Some(json!({"phone": "5551234", "firstName": "Ada", "age": 130})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn unknown_and_malformed_sessions() {
        let app = app(&MemoryStore::new());

        let (status, body) = send(
            &app,
            "GET",
            &format!("/sessions/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_session");

        let (status, _) = send(&app, "GET", "/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = new_session(&app).await;
        let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_endpoint_can_be_changed_at_runtime() {
        let app = app(&MemoryStore::new());

        let (status, body) = send(
            &app,
            "PUT",
            "/settings/store-endpoint",
            Some(json!({"endpoint": "ftp://nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");

        let (_, body) = send(
            &app,
            "PUT",
            "/settings/store-endpoint",
            Some(json!({"endpoint": "https://script.example.com/exec"})),
        )
        .await;
        assert_eq!(body["configured"], true);

        let (_, body) = send(
            &app,
            "PUT",
            "/settings/store-endpoint",
            Some(json!({"endpoint": null})),
        )
        .await;
        assert_eq!(body["configured"], false);
    }

    #[tokio::test]
    async fn reference_link_and_draft_defaults() {
        let app = app(&MemoryStore::new());

        let (_, body) = send(&app, "GET", "/reference", None).await;
        assert_eq!(body["materia_medica_url"], "https://example.org/materia-medica");

        let id = new_session(&app).await;
        let (_, body) = send(&app, "GET", &format!("/sessions/{id}/consultation/draft"), None).await;
        let date = body["date"].as_str().unwrap();
        assert_eq!(body["symptoms"], format!("{date}; "));
        assert_eq!(body["diagnosis"], "");
    }
}
