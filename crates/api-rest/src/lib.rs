//! # API REST
//!
//! REST API implementation for MediDesk.
//!
//! Handles:
//! - HTTP endpoints with axum (the page handlers of the practice UI)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for wire types and request authentication. Every handler builds the
//! session from the `x-practitioner-id` header and calls the archive lifecycle manager; notices
//! raised while handling the request are returned in the response body.

#![warn(rust_2018_idioms)]

use api_shared::{
    session_from_header, ConfirmationRequiredRes, ConsultationRes, CreateConsultationReq,
    CreatePatientReq, CreatePatientRes, CreatePrescriptionReq, DeleteRes, DuplicateRes, ErrorRes,
    HealthRes, HealthService, ListConsultationsRes, ListPatientsRes, ListPrescriptionsRes,
    ListRepresentativesRes, MedicalHistoryRes, PatientRes, PrescriptionRes, PreviewRes,
    RepresentativeReq, RepresentativeRes, TransitionRes, UpdateMedicalHistoryReq,
    PRACTITIONER_HEADER,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use medidesk_core::{
    ArchiveLifecycleManager, CollectingSink, Confirmation, Notice, Outcome, PracticeError,
    RecordId, StaticSession,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Application state for the REST API server.
#[derive(Clone)]
pub struct AppState {
    manager: ArchiveLifecycleManager,
}

impl AppState {
    pub fn new(manager: ArchiveLifecycleManager) -> Self {
        Self { manager }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        archive_patient,
        restore_patient,
        duplicate_patient,
        delete_patient,
        preview_patient,
        list_representatives,
        add_representative,
        update_medical_history,
        list_consultations,
        record_consultation,
        list_prescriptions,
        create_prescription,
        archive_prescription,
        restore_prescription,
        duplicate_prescription,
        preview_prescription,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::NoticeRes,
        api_shared::CreatePatientReq,
        api_shared::CreatePatientRes,
        api_shared::PatientRes,
        api_shared::ListPatientsRes,
        api_shared::RepresentativeReq,
        api_shared::RepresentativeRes,
        api_shared::ListRepresentativesRes,
        api_shared::UpdateMedicalHistoryReq,
        api_shared::MedicalHistoryRes,
        api_shared::CreateConsultationReq,
        api_shared::ConsultationRes,
        api_shared::ListConsultationsRes,
        api_shared::CreatePrescriptionReq,
        api_shared::PrescriptionRes,
        api_shared::ListPrescriptionsRes,
        api_shared::CountsRes,
        api_shared::StepFailureRes,
        api_shared::TransitionRes,
        api_shared::PreviewRes,
        api_shared::ConfirmationRequiredRes,
        api_shared::DuplicateRes,
        api_shared::DeleteRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full router: API routes, Swagger UI and a permissive CORS layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", axum::routing::delete(delete_patient))
        .route("/patients/:id/archive", post(archive_patient))
        .route("/patients/:id/restore", post(restore_patient))
        .route("/patients/:id/duplicate", post(duplicate_patient))
        .route("/patients/:id/cascade", get(preview_patient))
        .route(
            "/patients/:id/representatives",
            get(list_representatives).post(add_representative),
        )
        .route("/medical-histories/:id", put(update_medical_history))
        .route(
            "/medical-histories/:id/consultations",
            get(list_consultations).post(record_consultation),
        )
        .route(
            "/prescriptions",
            get(list_prescriptions).post(create_prescription),
        )
        .route("/prescriptions/:id/archive", post(archive_prescription))
        .route("/prescriptions/:id/restore", post(restore_prescription))
        .route("/prescriptions/:id/duplicate", post(duplicate_prescription))
        .route("/prescriptions/:id/cascade", get(preview_prescription))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Per-request view of the manager: the caller's session plus a sink collecting its notices.
struct RequestScope {
    session: StaticSession,
    manager: ArchiveLifecycleManager,
    notices: Arc<CollectingSink>,
}

impl RequestScope {
    fn new(state: &AppState, headers: &HeaderMap) -> Result<Self, ApiError> {
        let header = match headers.get(PRACTITIONER_HEADER) {
            Some(value) => Some(value.to_str().map_err(|_| {
                api_error(
                    StatusCode::UNAUTHORIZED,
                    format!("malformed {PRACTITIONER_HEADER} header"),
                )
            })?),
            None => None,
        };
        let session = session_from_header(header)
            .map_err(|e| api_error(StatusCode::UNAUTHORIZED, e.to_string()))?;
        let notices = Arc::new(CollectingSink::new());
        let manager = state.manager.with_sink(notices.clone());
        Ok(Self {
            session,
            manager,
            notices,
        })
    }

    /// Maps a manager failure, handing over the notices raised before it.
    fn fail(&self, err: PracticeError) -> ApiError {
        practice_error(err, self.notices.take())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ActiveFilter {
    /// `true` for active rows only, `false` for archived rows only; omit for both.
    active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct RestoreParams {
    /// Confirms a restore that also restores an archived patient.
    #[serde(default)]
    confirm: bool,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorRes::message(message)))
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid id: {e}")))
}

fn practice_error(err: PracticeError, notices: Vec<Notice>) -> ApiError {
    let status = match &err {
        PracticeError::Unauthenticated => StatusCode::UNAUTHORIZED,
        PracticeError::NotFound { .. } => StatusCode::NOT_FOUND,
        PracticeError::InvalidInput(_) | PracticeError::Text(_) | PracticeError::Uuid(_) => {
            StatusCode::BAD_REQUEST
        }
        PracticeError::RootUpdateFailure { .. }
        | PracticeError::PartialFailure { .. }
        | PracticeError::Store(_) => {
            tracing::error!("request failed: {:?}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorRes::from_practice_error(&err, notices)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used for monitoring and load balancer checks.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ActiveFilter),
    responses(
        (status = 200, description = "Patients of the practitioner, newest first", body = ListPatientsRes),
        (status = 401, description = "No authenticated practitioner")
    )
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ActiveFilter>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let patients = scope
        .manager
        .list_patients(&scope.session, filter.active)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(ListPatientsRes {
        patients: patients.iter().map(PatientRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered with an empty medical history", body = CreatePatientRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "No authenticated practitioner"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a patient, its medical history and any representatives.
///
/// Minors (by birth date) must come with at least one representative.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePatientReq>,
) -> Result<(StatusCode, Json<CreatePatientRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let (patient, representatives) = req
        .into_parts()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let registered = scope
        .manager
        .register_patient(&scope.session, patient, representatives)
        .map_err(|e| scope.fail(e))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePatientRes::new(&registered, scope.notices.take())),
    ))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/archive",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient and its dependents archived", body = TransitionRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Archive a patient together with its history, consultations, prescriptions and
/// representatives.
#[axum::debug_handler]
async fn archive_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TransitionRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let report = scope
        .manager
        .archive_patient(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(TransitionRes::new(&report, scope.notices.take())))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/restore",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient and its dependents restored", body = TransitionRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn restore_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TransitionRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let report = scope
        .manager
        .restore_patient(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(TransitionRes::new(&report, scope.notices.take())))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/duplicate",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 201, description = "Copy created", body = DuplicateRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn duplicate_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DuplicateRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let copy = scope
        .manager
        .duplicate_patient(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok((
        StatusCode::CREATED,
        Json(DuplicateRes::new(copy.id, scope.notices.take())),
    ))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deleted, or archived when it has clinical records", body = DeleteRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let outcome = scope
        .manager
        .delete_patient(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(DeleteRes::new(&outcome, scope.notices.take())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/cascade",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Rows an archive or restore would touch", body = PreviewRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn preview_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PreviewRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let preview = scope
        .manager
        .preview_patient(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(PreviewRes::from(&preview)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/representatives",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Representatives of the patient", body = ListRepresentativesRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn list_representatives(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ListRepresentativesRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let representatives = scope
        .manager
        .list_representatives(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(ListRepresentativesRes {
        representatives: representatives.iter().map(RepresentativeRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/representatives",
    params(("id" = String, Path, description = "Patient id")),
    request_body = RepresentativeReq,
    responses(
        (status = 201, description = "Representative added", body = RepresentativeRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn add_representative(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RepresentativeReq>,
) -> Result<(StatusCode, Json<RepresentativeRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let input = req.into_new().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let rep = scope
        .manager
        .add_representative(&scope.session, &id, input)
        .map_err(|e| scope.fail(e))?;
    Ok((StatusCode::CREATED, Json(RepresentativeRes::from(&rep))))
}

#[utoipa::path(
    put,
    path = "/medical-histories/{id}",
    params(("id" = String, Path, description = "Medical history id")),
    request_body = UpdateMedicalHistoryReq,
    responses(
        (status = 200, description = "Medical history updated", body = MedicalHistoryRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Medical history not found")
    )
)]
#[axum::debug_handler]
async fn update_medical_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateMedicalHistoryReq>,
) -> Result<Json<MedicalHistoryRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let history = scope
        .manager
        .update_medical_history(&scope.session, &id, req.into())
        .map_err(|e| scope.fail(e))?;
    Ok(Json(MedicalHistoryRes::from(&history)))
}

#[utoipa::path(
    get,
    path = "/medical-histories/{id}/consultations",
    params(("id" = String, Path, description = "Medical history id")),
    responses(
        (status = 200, description = "Consultations, newest first", body = ListConsultationsRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Medical history not found")
    )
)]
#[axum::debug_handler]
async fn list_consultations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ListConsultationsRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let consultations = scope
        .manager
        .list_consultations(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(ListConsultationsRes {
        consultations: consultations.iter().map(ConsultationRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/medical-histories/{id}/consultations",
    params(("id" = String, Path, description = "Medical history id")),
    request_body = CreateConsultationReq,
    responses(
        (status = 201, description = "Consultation recorded", body = ConsultationRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Medical history not found")
    )
)]
#[axum::debug_handler]
async fn record_consultation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateConsultationReq>,
) -> Result<(StatusCode, Json<ConsultationRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let consultation = scope
        .manager
        .record_consultation(&scope.session, &id, req.into())
        .map_err(|e| scope.fail(e))?;
    Ok((StatusCode::CREATED, Json(ConsultationRes::from(&consultation))))
}

#[utoipa::path(
    get,
    path = "/prescriptions",
    params(ActiveFilter),
    responses(
        (status = 200, description = "Prescriptions of the practitioner, newest first", body = ListPrescriptionsRes),
        (status = 401, description = "No authenticated practitioner")
    )
)]
#[axum::debug_handler]
async fn list_prescriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ActiveFilter>,
) -> Result<Json<ListPrescriptionsRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let prescriptions = scope
        .manager
        .list_prescriptions(&scope.session, filter.active)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(ListPrescriptionsRes {
        prescriptions: prescriptions.iter().map(PrescriptionRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/prescriptions",
    request_body = CreatePrescriptionReq,
    responses(
        (status = 201, description = "Prescription issued", body = PrescriptionRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Medical history not found")
    )
)]
/// Issue a prescription against a medical history, or detached when no history is given.
#[axum::debug_handler]
async fn create_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePrescriptionReq>,
) -> Result<(StatusCode, Json<PrescriptionRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let input = req.into_new().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let rx = scope
        .manager
        .issue_prescription(&scope.session, input)
        .map_err(|e| scope.fail(e))?;
    Ok((StatusCode::CREATED, Json(PrescriptionRes::from(&rx))))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{id}/archive",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Prescription archived", body = TransitionRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Prescription not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn archive_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TransitionRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let report = scope
        .manager
        .archive_prescription(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(TransitionRes::new(&report, scope.notices.take())))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{id}/restore",
    params(("id" = String, Path, description = "Prescription id"), RestoreParams),
    responses(
        (status = 200, description = "Prescription restored", body = TransitionRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Prescription not found"),
        (status = 409, description = "The patient is archived and would be restored too; repeat with confirm=true", body = ConfirmationRequiredRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Restore a prescription.
///
/// When its patient is archived the restore covers the whole patient. Without `confirm=true`
/// nothing is written and the answer is `409 Conflict` carrying the cascade preview.
#[axum::debug_handler]
async fn restore_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<RestoreParams>,
) -> Result<Response, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let outcome = scope
        .manager
        .restore_prescription(&scope.session, &id, Confirmation::from(params.confirm))
        .map_err(|e| scope.fail(e))?;
    match outcome {
        Outcome::Completed(report) => {
            Ok(Json(TransitionRes::new(&report, scope.notices.take())).into_response())
        }
        Outcome::ConfirmationRequired(preview) => Ok((
            StatusCode::CONFLICT,
            Json(ConfirmationRequiredRes::from(&preview)),
        )
            .into_response()),
    }
}

#[utoipa::path(
    post,
    path = "/prescriptions/{id}/duplicate",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 201, description = "Detached copy created", body = DuplicateRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Prescription not found"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn duplicate_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DuplicateRes>), ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let copy = scope
        .manager
        .duplicate_prescription(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok((
        StatusCode::CREATED,
        Json(DuplicateRes::new(copy.id, scope.notices.take())),
    ))
}

#[utoipa::path(
    get,
    path = "/prescriptions/{id}/cascade",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Rows an archive or restore would touch", body = PreviewRes),
        (status = 401, description = "No authenticated practitioner"),
        (status = 404, description = "Prescription not found")
    )
)]
#[axum::debug_handler]
async fn preview_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PreviewRes>, ApiError> {
    let scope = RequestScope::new(&state, &headers)?;
    let id = parse_id(&id)?;
    let preview = scope
        .manager
        .preview_prescription(&scope.session, &id)
        .map_err(|e| scope.fail(e))?;
    Ok(Json(PreviewRes::from(&preview)))
}
