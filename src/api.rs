//! REST API for the load planner.
//!
//! Exposes the packer and the validator over HTTP. Uses Axum as the web
//! framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::collections::HashSet;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PackerConfig, ValidatorConfig};
use crate::geometry::{CenterOfGravity, center_of_gravity};
use crate::model::{
    CargoCatalog, CargoDefinition, Dimensions, ModelError, PackItem, Placement, TemperatureZone,
    TrailerBounds, WheelArches,
};
use crate::packer::{
    PackingConfig, PackingOutcome, PackingSummary, pack_with_progress, pack_with_report,
};
use crate::types::Vec3;
use crate::validator::{FindingType, Severity, ValidationFinding, validate_report};

#[derive(Clone)]
struct ApiState {
    packer_config: PackerConfig,
    validator_config: ValidatorConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>load-planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// `items` lists each cargo definition with the number of units to load.
/// The optional flags override the server configuration for this request.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "trailer": { "length": 13600, "width": 2450, "height": 2700, "max_payload": 24000.0 },
        "items": [
            {
                "cargo": {
                    "id": "euro-pallet",
                    "dimensions": { "length": 1200, "width": 800, "height": 1440 },
                    "weight": 1200.0
                },
                "quantity": 5
            }
        ]
    })
)]
pub struct PackRequest {
    pub trailer: TrailerBounds,
    pub items: Vec<PackItem>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub check_stack_collisions: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub respect_payload: Option<bool>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    trailer: TrailerBounds,
    items: Vec<PackItem>,
    check_stack_collisions: Option<bool>,
    respect_payload: Option<bool>,
}

impl ValidatedPackRequest {
    fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Applies the request-level overrides on top of the server defaults.
    fn packing_config(&self, defaults: PackingConfig) -> PackingConfig {
        let mut config = defaults;
        if let Some(enabled) = self.check_stack_collisions {
            config.check_stack_collisions = enabled;
        }
        if let Some(enabled) = self.respect_payload {
            config.respect_payload = enabled;
        }
        config
    }
}

#[derive(Debug)]
enum RequestValidationError {
    MissingItems,
    InvalidTrailer(ModelError),
    InvalidCargo(ModelError),
    InvalidPlacement(ModelError),
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, RequestValidationError> {
        if self.items.is_empty() {
            return Err(RequestValidationError::MissingItems);
        }

        self.trailer
            .validate()
            .map_err(RequestValidationError::InvalidTrailer)?;

        let mut seen = HashSet::new();
        for item in &self.items {
            item.cargo
                .validate()
                .map_err(RequestValidationError::InvalidCargo)?;
            // Unit ids derive from the cargo id, so it must be unique per request
            if !seen.insert(item.cargo.id.as_str()) {
                return Err(RequestValidationError::InvalidCargo(
                    ModelError::DuplicateCargo(item.cargo.id.clone()),
                ));
            }
        }

        Ok(ValidatedPackRequest {
            trailer: self.trailer,
            items: self.items,
            check_stack_collisions: self.check_stack_collisions,
            respect_payload: self.respect_payload,
        })
    }
}

/// Request structure for the validation endpoint.
///
/// Every placement references one of the cargo definitions by `cargo_id`.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "trailer": { "length": 13600, "width": 2450, "height": 2700, "max_payload": 24000.0 },
        "cargo": [
            {
                "id": "euro-pallet",
                "dimensions": { "length": 1200, "width": 800, "height": 1440 },
                "weight": 1200.0
            }
        ],
        "placements": [
            {
                "id": "euro-pallet-0",
                "cargo_id": "euro-pallet",
                "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
                "rotation": 0,
                "weight": 1200.0,
                "stack_level": 0
            }
        ]
    })
)]
pub struct ValidateRequest {
    pub trailer: TrailerBounds,
    pub cargo: Vec<CargoDefinition>,
    pub placements: Vec<Placement>,
}

impl ValidateRequest {
    fn into_validated(
        self,
    ) -> Result<(TrailerBounds, CargoCatalog, Vec<Placement>), RequestValidationError> {
        self.trailer
            .validate()
            .map_err(RequestValidationError::InvalidTrailer)?;
        let catalog =
            CargoCatalog::new(self.cargo).map_err(RequestValidationError::InvalidCargo)?;
        for placement in &self.placements {
            placement
                .validate()
                .map_err(RequestValidationError::InvalidPlacement)?;
        }
        Ok((self.trailer, catalog, self.placements))
    }
}

/// Response of the packing endpoint.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<PackedUnplacedUnit>,
    pub is_complete: bool,
    pub summary: PackingSummary,
}

/// A unit the packer had to leave out.
#[derive(Serialize, ToSchema)]
pub struct PackedUnplacedUnit {
    pub id: String,
    pub cargo_id: String,
    pub reason_code: String,
    pub reason: String,
}

impl PackResponse {
    pub fn from_outcome(items: &[PackItem], outcome: PackingOutcome, trailer: &TrailerBounds) -> Self {
        let summary = PackingSummary::new(items, &outcome, trailer);
        let is_complete = outcome.is_complete();
        let PackingOutcome {
            placements,
            unplaced,
        } = outcome;

        Self {
            placements,
            unplaced: unplaced
                .into_iter()
                .map(|unit| PackedUnplacedUnit {
                    id: unit.id,
                    cargo_id: unit.cargo_id,
                    reason_code: unit.reason.code().to_string(),
                    reason: unit.reason.to_string(),
                })
                .collect(),
            is_complete,
            summary,
        }
    }
}

/// Response of the validation endpoint.
#[derive(Serialize, ToSchema)]
pub struct ValidateResponse {
    pub findings: Vec<ValidationFinding>,
    pub has_errors: bool,
    pub has_warnings: bool,
    pub center_of_gravity: CenterOfGravity,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn request_error_response(err: RequestValidationError) -> Response {
    let (error, details) = match err {
        RequestValidationError::MissingItems => (
            "Invalid input data",
            "At least one item must be specified".to_string(),
        ),
        RequestValidationError::InvalidTrailer(err) => {
            ("Invalid trailer configuration", err.to_string())
        }
        RequestValidationError::InvalidCargo(err) => ("Invalid cargo definition", err.to_string()),
        RequestValidationError::InvalidPlacement(err) => ("Invalid placement", err.to_string()),
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, details)
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated().map_err(request_error_response)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_validate),
    components(
        schemas(
            PackRequest,
            PackResponse,
            PackedUnplacedUnit,
            PackingSummary,
            ValidateRequest,
            ValidateResponse,
            ValidationFinding,
            FindingType,
            Severity,
            CenterOfGravity,
            ErrorResponse,
            TrailerBounds,
            WheelArches,
            TemperatureZone,
            CargoDefinition,
            Dimensions,
            PackItem,
            Placement,
            Vec3
        )
    ),
    tags(
        (name = "packing", description = "Automatic load planning"),
        (name = "validation", description = "Rule checks for load plans")
    )
)]
struct ApiDoc;

/// Builds the application router.
fn router(packer_config: PackerConfig, validator_config: ValidatorConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        packer_config,
        validator_config,
    };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/validate", post(handle_validate))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(
    config: ApiConfig,
    packer_config: PackerConfig,
    validator_config: ValidatorConfig,
) -> std::io::Result<()> {
    let app = router(packer_config, validator_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Endpoints: POST /pack, POST /pack_stream, POST /validate, GET /docs");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Places every requested unit that fits and reports the rest.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Load plan computed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, trailer or cargo definition",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "New pack request: {} units of {} cargo types",
        request.unit_count(),
        request.items.len()
    );
    let config = request.packing_config(state.packer_config.packing_config());
    let outcome = pack_with_report(&request.items, &request.trailer, &config);
    if outcome.is_complete() {
        info!("Result: all {} units placed", outcome.placements.len());
    } else {
        warn!(
            "Result: {} units placed, {} left out",
            outcome.placements.len(),
            outcome.unplaced.len()
        );
    }

    let response = PackResponse::from_outcome(&request.items, outcome, &request.trailer);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events as Server-Sent Events while the plan is computed.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, trailer or cargo definition",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = request.packing_config(state.packer_config.packing_config());
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        pack_with_progress(&request.items, &request.trailer, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /validate endpoint.
///
/// Runs the full rule battery against a given load plan.
#[utoipa::path(
    post,
    path = "/validate",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Findings for the load plan", body = ValidateResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid trailer, cargo definition or placement",
            body = ErrorResponse
        )
    ),
    tag = "validation"
)]
async fn handle_validate(
    State(state): State<ApiState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    let (trailer, catalog, placements) = match payload.into_validated() {
        Ok(parts) => parts,
        Err(err) => return request_error_response(err),
    };
    let items = match catalog.resolve(placements) {
        Ok(items) => items,
        Err(err) => return request_error_response(RequestValidationError::InvalidPlacement(err)),
    };

    let report = validate_report(&items, &trailer, state.validator_config.validation_config());
    info!(
        "Validated {} placements: {} errors, {} warnings",
        items.len(),
        report.count(Severity::Error),
        report.count(Severity::Warning)
    );

    let response = ValidateResponse {
        has_errors: report.has_errors,
        has_warnings: report.has_warnings,
        findings: report.findings,
        center_of_gravity: center_of_gravity(&items),
    };
    (StatusCode::OK, Json(response)).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
