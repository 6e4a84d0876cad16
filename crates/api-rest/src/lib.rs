//! # API REST
//!
//! REST view server for the Gluco patient pages.
//!
//! Handles:
//! - HTTP endpoints with axum, serving the list, detail and form views as JSON
//! - the route guard (bearer token to session) in front of every patient route
//! - OpenAPI/Swagger documentation
//!
//! Record access goes through whichever [`GlucoApi`] the server is built with: the Ontimize
//! client in production, the in-memory store in tests.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use gluco_core::constants::DOSAGE_UNITS;
use gluco_core::form::{FormReading, PatientDraft};
use gluco_core::metrics::{self, ReadingStatus};
use gluco_core::views::detail::{InfoItem, PatientSummary, VitalCard};
use gluco_core::{
    record_reading, DetailState, DosageRow, GlucoApi, GlucoError, Notification, NotificationKind,
    NonEmptyText, Patient, PatientForm, PatientId, PatientInput, PatientListView, PatientOption,
    ReadingInput, RouteGuard, Session, SessionGuard, Sex, SlotValues, TimeSlot,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// User recorded on sessions opened with the view token.
const VIEW_TOKEN_USER: &str = "view-token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn GlucoApi>,
    guard: Arc<dyn RouteGuard>,
    view_token: Option<Arc<str>>,
}

impl AppState {
    /// `view_token` is the bearer token accepted on guarded routes; without one every guarded
    /// request is refused.
    pub fn new(api: Arc<dyn GlucoApi>, view_token: Option<String>) -> Self {
        Self {
            api,
            guard: Arc::new(SessionGuard),
            view_token: view_token.map(Arc::from),
        }
    }

    fn session_from(&self, headers: &HeaderMap) -> Option<Session> {
        let expected = self.view_token.as_deref()?;
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))?
            .trim();
        if token != expected {
            return None;
        }
        let user = NonEmptyText::new(VIEW_TOKEN_USER).ok()?;
        Some(Session::new(user, token))
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientOption>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SavePatientRes {
    pub id: PatientId,
    pub message: String,
    pub bmi: String,
}

/// The edit form of an existing patient, prefilled from the record API.
#[derive(Serialize, ToSchema)]
pub struct PatientFormRes {
    pub id: PatientId,
    pub draft: PatientDraft,
    pub age: Option<u32>,
    pub bmi: String,
    pub readings: Vec<FormReading>,
    pub medications: Vec<DosageRow>,
    pub insulin: Vec<DosageRow>,
    /// Drug selector entries, in drug id order.
    pub drug_options: Vec<String>,
    pub dosage_units: Vec<String>,
    pub dosage_sections_locked: bool,
    /// Validation message for the loaded values; empty when they are valid.
    pub error: String,
}

impl PatientFormRes {
    fn new(id: PatientId, form: &PatientForm) -> Self {
        Self {
            id,
            draft: form.draft().clone(),
            age: form.draft().birth_date.map(metrics::age),
            bmi: form.bmi_label(),
            readings: form.readings().to_vec(),
            medications: form.medications().to_vec(),
            insulin: form.insulin().to_vec(),
            drug_options: form.drug_options().to_vec(),
            dosage_units: DOSAGE_UNITS.iter().map(|u| (*u).to_owned()).collect(),
            dosage_sections_locked: form.dosage_sections_locked(),
            error: form.error().to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateReadingRes {
    pub id: i64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive substring of the patient name.
    #[serde(default)]
    pub q: Option<String>,
}

/// A [`GlucoError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(GlucoError);

impl From<GlucoError> for ApiError {
    fn from(err: GlucoError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GlucoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GlucoError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GlucoError::NotFound(_) => StatusCode::NOT_FOUND,
            GlucoError::Unauthorized => StatusCode::UNAUTHORIZED,
            GlucoError::Api { .. }
            | GlucoError::Transport(_)
            | GlucoError::Decode(_)
            | GlucoError::Catalog(_) => StatusCode::BAD_GATEWAY,
            GlucoError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorRes {
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        get_patient,
        create_patient,
        update_patient,
        edit_form,
        add_reading
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ListPatientsRes,
        SavePatientRes,
        PatientFormRes,
        PatientDraft,
        FormReading,
        CreateReadingRes,
        PatientOption,
        DetailState,
        PatientSummary,
        InfoItem,
        VitalCard,
        DosageRow,
        SlotValues,
        ReadingStatus,
        Notification,
        NotificationKind,
        Patient,
        PatientInput,
        ReadingInput,
        Sex,
        TimeSlot
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Builds the full router: the open health check, the guarded patient routes and the Swagger UI.
pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", get(get_patient).put(update_patient))
        .route("/patients/:id/form", get(edit_form))
        .route("/patients/:id/readings", post(add_reading))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(guarded)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = state.session_from(request.headers());
    state.guard.authorize(session.as_ref(), Utc::now())?;
    Ok(next.run(request).await)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint; open to unauthenticated callers.
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Gluco REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/patients",
    params(SearchParams),
    responses(
        (status = 200, description = "Patient picker options", body = ListPatientsRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// List patients as picker options, optionally filtered by name.
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let mut view = PatientListView::new();
    view.load(state.api.as_ref()).await?;
    let patients = view.search(params.q.as_deref().unwrap_or_default());
    Ok(Json(ListPatientsRes { patients }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient detail page", body = DetailState),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// The detail page of one patient: summary, latest readings and dosage tables.
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<PatientId>,
) -> Result<Json<DetailState>, ApiError> {
    let detail = DetailState::load(state.api.as_ref(), id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientInput,
    responses(
        (status = 201, description = "Patient created", body = SavePatientRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 422, description = "Validation failed", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Create a patient through the form, together with any readings supplied.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(input): Json<PatientInput>,
) -> Result<(StatusCode, Json<SavePatientRes>), ApiError> {
    let mut form = PatientForm::new();
    form.apply(input);
    let res = submit(&mut form, state.api.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientInput,
    responses(
        (status = 200, description = "Patient updated", body = SavePatientRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 422, description = "Validation failed", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Edit an existing patient. Only the supplied fields change.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<PatientId>,
    Json(input): Json<PatientInput>,
) -> Result<Json<SavePatientRes>, ApiError> {
    let mut form = PatientForm::load_for_edit(state.api.as_ref(), id).await?;
    form.apply(input);
    Ok(Json(submit(&mut form, state.api.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/form",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Prefilled edit form", body = PatientFormRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// The edit form of a patient with its selector options.
#[axum::debug_handler]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<PatientId>,
) -> Result<Json<PatientFormRes>, ApiError> {
    let form = PatientForm::load_for_edit(state.api.as_ref(), id).await?;
    Ok(Json(PatientFormRes::new(id, &form)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/readings",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = ReadingInput,
    responses(
        (status = 201, description = "Reading recorded", body = CreateReadingRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 422, description = "Invalid reading", body = ErrorRes),
        (status = 502, description = "Record API failure", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Record one glucose reading for a patient.
#[axum::debug_handler]
async fn add_reading(
    State(state): State<AppState>,
    Path(id): Path<PatientId>,
    Json(input): Json<ReadingInput>,
) -> Result<(StatusCode, Json<CreateReadingRes>), ApiError> {
    let reading = record_reading(state.api.as_ref(), id, &input).await?;
    Ok((StatusCode::CREATED, Json(CreateReadingRes { id: reading })))
}

async fn submit(form: &mut PatientForm, api: &dyn GlucoApi) -> Result<SavePatientRes, ApiError> {
    let id = form.submit(api).await?;
    Ok(SavePatientRes {
        id,
        message: form
            .notification()
            .map(|n| n.message.clone())
            .unwrap_or_default(),
        bmi: form.bmi_label(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use gluco_core::memory::{InMemoryApi, Operation};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "letmein";

    fn app(api: &Arc<InMemoryApi>) -> Router {
        let api: Arc<dyn GlucoApi> = api.clone();
        router(AppState::new(api, Some(TOKEN.into())))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap()
    }

    fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_is_open() {
        let api = Arc::new(InMemoryApi::demo());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&api), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn patient_routes_require_the_view_token() {
        let api = Arc::new(InMemoryApi::demo());

        let anonymous = Request::builder()
            .uri("/patients")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&api), anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "an authenticated session is required");

        let wrong = Request::builder()
            .uri("/patients/1")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(app(&api), wrong).await.0, StatusCode::UNAUTHORIZED);

        let shared: Arc<dyn GlucoApi> = api.clone();
        let unconfigured = router(AppState::new(shared, None));
        assert_eq!(
            send(unconfigured, get("/patients")).await.0,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn lists_and_searches_patients() {
        let api = Arc::new(InMemoryApi::demo());
        let (status, body) = send(app(&api), get("/patients?q=ada")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["patients"],
            json!([{ "value": 1, "label": "Ada Lovelace" }])
        );

        let (_, body) = send(app(&api), get("/patients")).await;
        assert_eq!(body["patients"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn edit_form_is_prefilled_with_selector_options() {
        let api = Arc::new(InMemoryApi::demo());
        let (status, body) = send(app(&api), get("/patients/1/form")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["draft"]["name"], "Ada Lovelace");
        assert!(body["age"].as_u64().unwrap() >= 63);
        assert_eq!(body["bmi"], "BMI: 25.2");
        assert_eq!(body["readings"].as_array().unwrap().len(), 3);
        assert_eq!(body["drug_options"][0], "Metformin");
        assert_eq!(body["drug_options"].as_array().unwrap().len(), 7);
        assert_eq!(body["dosage_units"][0], "mg");
        assert_eq!(body["dosage_sections_locked"], true);
        assert_eq!(body["error"], "");

        let (status, _) = send(app(&api), get("/patients/99/form")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn detail_page_carries_every_section() {
        let api = Arc::new(InMemoryApi::demo());
        let (status, body) = send(app(&api), get("/patients/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"]["name"], "Ada Lovelace");
        assert_eq!(body["vitals"][1]["value"], "171");
        assert_eq!(body["vitals"][1]["caption"], "Above the norm");
        assert_eq!(body["insulin"].as_array().unwrap().len(), 2);

        let (status, body) = send(app(&api), get("/patients/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "patient 99 not found");
    }

    #[tokio::test]
    async fn create_validates_then_saves_patient_and_readings() {
        let api = Arc::new(InMemoryApi::demo());

        let (status, body) = send(app(&api), with_json("POST", "/patients", json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Name is required, Birth date is required");

        let input = json!({
            "name": "Grace Hopper",
            "birth_date": "1906-12-09",
            "height": 180.0,
            "weight": 72.0,
            "readings": [{ "slot": "dinner", "value": 118.0, "date": "2024-05-01" }]
        });
        let (status, body) = send(app(&api), with_json("POST", "/patients", input)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 3);
        assert_eq!(body["message"], "Patient created successfully!");
        assert_eq!(body["bmi"], "BMI: 22.2");
        assert!(api
            .readings()
            .iter()
            .any(|r| r.patient_id == 3 && r.time_of_reading == TimeSlot::Dinner));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let api = Arc::new(InMemoryApi::demo());
        let (status, body) = send(
            app(&api),
            with_json("PUT", "/patients/2", json!({ "weight": 80.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Patient updated successfully!");

        let patient = api.patient(2).unwrap();
        assert_eq!(patient.weight, Some(80.0));
        assert_eq!(patient.height, Some(180.0));
        assert_eq!(patient.name, "Alan Turing");
    }

    #[tokio::test]
    async fn readings_are_validated_and_recorded() {
        let api = Arc::new(InMemoryApi::demo());
        let (status, body) = send(
            app(&api),
            with_json("POST", "/patients/2/readings", json!({ "slot": "lunch", "value": -3.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Invalid Before Lunch reading");

        let (status, body) = send(
            app(&api),
            with_json("POST", "/patients/2/readings", json!({ "slot": "lunch", "value": 104.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        assert!(api.readings().iter().any(|r| r.id == id && r.patient_id == 2));
    }

    #[tokio::test]
    async fn record_api_failures_are_bad_gateway() {
        let api = Arc::new(InMemoryApi::demo());
        api.fail(Operation::ListPatients, "database offline");
        let (status, body) = send(app(&api), get("/patients")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "database offline");
    }
}
