//! # API REST
//!
//! REST API implementation for the clinic prescription service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, API key checks)
//!
//! Uses `api-shared` for request/response types and `clinic-core` for generation and delivery.

#![warn(rust_2018_idioms)]

use api_shared::auth::{validate_api_key, AuthError, API_KEY_HEADER};
use api_shared::{CreatePrescriptionReq, CreatePrescriptionRes, HealthRes, HealthService, SectionStatus};
use axum::{
    extract::{Path as AxumPath, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clinic_core::{
    ArtifactName, ClinicConfig, ClinicResult, DeliveryService, Notifier, PrescriptionAssembler,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
///
/// Contains shared state that needs to be accessible to all request handlers.
#[derive(Clone)]
pub struct AppState {
    assembler: Arc<PrescriptionAssembler>,
    delivery: Arc<DeliveryService>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Build handler state from startup configuration.
    ///
    /// Opens (creating if needed) the artifact directory. A blank `api_key` disables the check.
    pub fn new(
        cfg: &ClinicConfig,
        notifier: Arc<dyn Notifier>,
        api_key: Option<String>,
    ) -> ClinicResult<Self> {
        let assembler = PrescriptionAssembler::from_config(cfg)?;
        let delivery = DeliveryService::new(notifier, assembler.store().clone(), cfg);
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Arc::from);

        Ok(Self {
            assembler: Arc::new(assembler),
            delivery: Arc::new(delivery),
            api_key,
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, create_prescription, get_artifact),
    components(schemas(
        HealthRes,
        CreatePrescriptionReq,
        CreatePrescriptionRes,
        SectionStatus,
        clinic_core::Patient,
        clinic_core::Hospital,
        clinic_core::Branding,
        clinic_core::Visit,
    ))
)]
pub struct ApiDoc;

/// Assemble the REST router with OpenAPI docs and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prescriptions", post(create_prescription))
        .route("/temp/:name", get(get_artifact))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/prescriptions",
    request_body = CreatePrescriptionReq,
    params(
        ("x-api-key" = Option<String>, Header, description = "Required when the server has an API key configured")
    ),
    responses(
        (status = 201, description = "Prescription generated; delivery continues in the background", body = CreatePrescriptionRes),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Prescription could not be generated; the text fallback is sent instead")
    )
)]
/// Generate the prescription PDF for a completed visit and deliver it to the patient.
///
/// Generation happens before the response is returned. Delivery is spawned so the caller is not
/// held up by the messaging transport.
///
/// # Errors
/// Returns `500 Internal Server Error` if:
/// - the PDF could not be written or failed validation.
///
/// In that case the plain-text prescription is still sent to the patient.
#[axum::debug_handler]
async fn create_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePrescriptionReq>,
) -> Result<(StatusCode, Json<CreatePrescriptionRes>), (StatusCode, &'static str)> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(e) = validate_api_key(state.api_key.as_deref(), provided) {
        tracing::warn!("rejected prescription request: {}", e);
        return Err(match e {
            AuthError::Missing => (StatusCode::UNAUTHORIZED, "Missing API key"),
            AuthError::Invalid => (StatusCode::UNAUTHORIZED, "Invalid API key"),
        });
    }

    let prescription = req.prescription_text().to_string();
    let generated = state
        .assembler
        .assemble(&prescription, &req.patient, &req.hospital, &req.visit)
        .await;

    let delivery = state.delivery.clone();
    let patient = req.patient;

    match generated {
        Ok(artifact) => {
            let res = CreatePrescriptionRes {
                artifact_name: artifact.name.to_string(),
                artifact_url: delivery.artifact_url(&artifact.name),
                page_count: artifact.report.page_count,
                prescription_items: artifact.report.prescription_items.clone(),
                sections: SectionStatus::from_report(&artifact.report),
            };

            tokio::spawn(async move {
                let outcome = delivery
                    .deliver(&patient, &prescription, Some(&artifact.name))
                    .await;
                tracing::info!("delivery of {}: {:?}", artifact.name, outcome);
            });

            Ok((StatusCode::CREATED, Json(res)))
        }
        Err(e) => {
            tracing::error!("Generate prescription error: {:?}", e);
            tokio::spawn(async move {
                let outcome = delivery.deliver(&patient, &prescription, None).await;
                tracing::info!("fallback delivery for patient {}: {:?}", patient.id, outcome);
            });
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate prescription",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/temp/{name}",
    params(
        ("name" = String, Path, description = "Artifact file name, e.g. prescription_<patientId>_<epochMillis>.pdf")
    ),
    responses(
        (status = 200, description = "The prescription PDF", content_type = "application/pdf"),
        (status = 404, description = "Artifact not found or already expired"),
        (status = 500, description = "Internal server error")
    )
)]
/// Serve a generated artifact to the messaging provider.
///
/// Names are validated before touching the filesystem; anything that is not a plain artifact
/// name is reported as not found.
#[axum::debug_handler]
async fn get_artifact(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let name = match ArtifactName::parse(&name) {
        Ok(name) => name,
        Err(_) => return Err((StatusCode::NOT_FOUND, "Artifact not found")),
    };

    let store = state.assembler.store().clone();
    let lookup = name.clone();
    let bytes = match tokio::task::spawn_blocking(move || store.read(&lookup)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(clinic_core::ArtifactError::NotFound(_))) => {
            return Err((StatusCode::NOT_FOUND, "Artifact not found"));
        }
        Ok(Err(e)) => {
            tracing::error!("Read artifact error: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"));
        }
        Err(e) => {
            tracing::error!("Read artifact task error: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use clinic_core::LogNotifier;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn config(dir: &TempDir) -> ClinicConfig {
        ClinicConfig::from_env_values(
            Some(dir.path().join("temp").to_string_lossy().into_owned()),
            Some("https://clinic.example".into()),
            None,
            None,
            None,
            None,
        )
        .unwrap()
    }

    fn app(dir: &TempDir, api_key: Option<&str>) -> (Router, AppState) {
        let state = AppState::new(
            &config(dir),
            Arc::new(LogNotifier),
            api_key.map(str::to_string),
        )
        .unwrap();
        (router(state.clone()), state)
    }

    fn visit_body() -> Value {
        json!({
            "patient": {
                "_id": "p1",
                "name": "Jane Doe",
                "age": 34,
                "gender": "female",
                "contactNumber": "9999999999"
            },
            "hospital": {
                "name": "City Clinic",
                "address": "1 Main St",
                "phoneNumber": "555-0100",
                "doctorName": "Dr. A. Rao"
            },
            "visit": {
                "symptoms": "fever",
                "diagnosis": "NA",
                "prescription": "Paracetamol 500mg\nRest"
            }
        })
    }

    fn post(body: &Value, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/prescriptions")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_create_prescription_requires_api_key() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir, Some("secret"));

        let missing = app.clone().oneshot(post(&visit_body(), None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app.oneshot(post(&visit_body(), Some("guess"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        assert!(state.assembler.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_prescription_then_fetch_pdf() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, Some("secret"));

        let response = app
            .clone()
            .oneshot(post(&visit_body(), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        let name = body["artifactName"].as_str().unwrap().to_string();
        assert!(name.starts_with("prescription_p1_"));
        assert_eq!(
            body["artifactUrl"],
            format!("https://clinic.example/temp/{name}")
        );
        assert_eq!(body["prescriptionItems"], json!(["1. Paracetamol 500mg", "2. Rest"]));
        let diagnosis = body["sections"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["section"] == "diagnosis")
            .unwrap();
        assert_eq!(diagnosis["rendered"], false);

        let response = app
            .oneshot(
                Request::get(format!("/temp/{name}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_prescription_override_in_request() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);
        let mut body = visit_body();
        body["prescription"] = json!("Zinc 20mg");

        let response = app.oneshot(post(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["prescriptionItems"], json!(["1. Zinc 20mg"]));
    }

    #[tokio::test]
    async fn test_infant_age_and_null_prescription_are_accepted() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);
        let mut body = visit_body();
        body["patient"]["age"] = json!(0.5);
        body["patient"]["gender"] = Value::Null;
        body["visit"]["prescription"] = Value::Null;

        let response = app.oneshot(post(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["prescriptionItems"], json!([]));
        assert!(body["artifactName"].as_str().unwrap().ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_internal_error() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);
        std::fs::remove_dir_all(dir.path().join("temp")).unwrap();

        let response = app.oneshot(post(&visit_body(), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_get_artifact_not_found() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);

        for uri in ["/temp/prescription_p1_1.pdf", "/temp/..secret", "/temp/%2E%2Fhidden"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
        }
    }

    #[tokio::test]
    async fn test_get_artifact_serves_stored_bytes() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir, None);
        let name = ArtifactName::parse("prescription_p2_1700000000000.pdf").unwrap();
        state
            .assembler
            .store()
            .write(&name, b"%PDF-1.3 test")
            .unwrap();

        let response = app
            .oneshot(
                Request::get(format!("/temp/{name}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"prescription_p2_1700000000000.pdf\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"%PDF-1.3 test");
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir, None);

        let response = app
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["paths"].get("/prescriptions").is_some());
        assert!(body["paths"].get("/temp/{name}").is_some());
    }
}
