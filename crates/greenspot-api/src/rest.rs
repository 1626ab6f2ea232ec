//! REST API handlers

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use greenspot_core::{
    ApiConfig, CheckpointEvent, GreenspotError, GreenspotResult, JobSpec, StatsSnapshot,
    TimeShiftPlan,
};
use greenspot_scheduler::{
    report::{CurrentPlacement, OptimizeReport, PlacementReport},
    DecisionEngine, EvictionRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
}

/// Create the API router
pub fn create_router(engine: Arc<DecisionEngine>, api: &ApiConfig) -> Router {
    let state = Arc::new(AppState { engine });

    let router = Router::new()
        .route("/health", get(health))
        .route("/simulate", post(simulate))
        .route("/optimize-job", post(optimize_job))
        .route("/timeshift-plan", post(timeshift_plan))
        .route("/checkpoint-simulate", post(checkpoint_simulate))
        .route("/dashboard-stats", get(dashboard_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if api.cors_enabled {
        router.layer(cors_layer(&api.cors_origins))
    } else {
        router
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(e: GreenspotError) -> ApiError {
    let status = match &e {
        GreenspotError::InvalidRequest(_)
        | GreenspotError::UnknownRegion(_)
        | GreenspotError::UnknownZone(_) => StatusCode::BAD_REQUEST,
        GreenspotError::NoSuitableOfferFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %e, "Request failed");
    } else {
        warn!(error = %e, "Request rejected");
    }

    (
        status,
        Json(ErrorBody {
            error: e.kind().to_string(),
            message: e.to_string(),
        }),
    )
}

fn parse_deadline(raw: &str) -> GreenspotResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            GreenspotError::InvalidRequest(format!("deadline '{}' is not ISO-8601: {}", raw, e))
        })
}

/// Empty strings from form-driven clients mean "not set"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_checkpoint_interval() -> u32 {
    30
}

fn default_flexible() -> bool {
    true
}

/// Request to place a new job
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub estimated_gpu_hours: f64,
    pub min_gpu_memory_gb: f64,
    /// ISO-8601 timestamp
    pub deadline: String,
    #[serde(default)]
    pub preferred_region: Option<String>,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval_min: u32,
    #[serde(default = "default_flexible")]
    pub flexible: bool,
}

impl SimulateRequest {
    fn into_job(self) -> GreenspotResult<JobSpec> {
        let mut job = JobSpec::new(
            self.min_gpu_memory_gb,
            self.estimated_gpu_hours,
            parse_deadline(&self.deadline)?,
        );
        job.preferred_region = non_empty(self.preferred_region);
        job.checkpoint_interval_min = self.checkpoint_interval_min;
        job.flexible = self.flexible;
        Ok(job)
    }
}

/// Request to re-evaluate a running job
#[derive(Debug, Deserialize)]
pub struct OptimizeJobRequest {
    pub estimated_gpu_hours: f64,
    pub min_gpu_memory_gb: f64,
    pub deadline: String,
    #[serde(default)]
    pub current_region: Option<String>,
    #[serde(default)]
    pub current_az: Option<String>,
    #[serde(default)]
    pub current_price_usd_hr: Option<f64>,
}

/// Request for a time-shift plan
#[derive(Debug, Deserialize)]
pub struct TimeShiftRequest {
    pub estimated_gpu_hours: f64,
    pub deadline: String,
    #[serde(default)]
    pub preferred_region: Option<String>,
    #[serde(default = "default_flexible")]
    pub flexible: bool,
}

/// Request to simulate an eviction
#[derive(Debug, Deserialize)]
pub struct CheckpointSimulateRequest {
    #[serde(default)]
    pub job_id: String,
    pub current_region: String,
    pub current_az: String,
    pub current_sku: String,
    pub model_size_gb: f64,
    #[serde(default)]
    pub epoch_progress_pct: f64,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Dashboard statistics response
#[derive(Debug, Serialize)]
pub struct DashboardStatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub regions_monitored: Vec<String>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Place a new job
async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<PlacementReport>, ApiError> {
    info!(
        hours = req.estimated_gpu_hours,
        min_memory_gb = req.min_gpu_memory_gb,
        "Placement requested"
    );

    let job = req.into_job().map_err(api_error)?;
    let report = state
        .engine
        .decide(&job, Utc::now())
        .await
        .map_err(api_error)?;

    Ok(Json(report))
}

/// Compare a running job with the best placement available now
async fn optimize_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeJobRequest>,
) -> Result<Json<OptimizeReport>, ApiError> {
    info!(
        current_region = req.current_region.as_deref().unwrap_or("-"),
        current_az = req.current_az.as_deref().unwrap_or("-"),
        "Optimization requested"
    );

    let job = JobSpec::new(
        req.min_gpu_memory_gb,
        req.estimated_gpu_hours,
        parse_deadline(&req.deadline).map_err(api_error)?,
    );
    let current = CurrentPlacement {
        region: non_empty(req.current_region),
        zone: non_empty(req.current_az),
        price_usd_hr: req.current_price_usd_hr,
    };

    let report = state
        .engine
        .optimize(&job, &current, Utc::now())
        .await
        .map_err(api_error)?;

    Ok(Json(report))
}

/// Plan a delayed start within the deadline
async fn timeshift_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimeShiftRequest>,
) -> Result<Json<TimeShiftPlan>, ApiError> {
    let mut job = JobSpec::new(
        0.0,
        req.estimated_gpu_hours,
        parse_deadline(&req.deadline).map_err(api_error)?,
    );
    job.flexible = req.flexible;
    let region = non_empty(req.preferred_region);

    let plan = state
        .engine
        .plan_time_shift(&job, region.as_deref(), Utc::now())
        .await
        .map_err(api_error)?;

    Ok(Json(plan))
}

/// Simulate a spot interruption of a running job
async fn checkpoint_simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckpointSimulateRequest>,
) -> Result<Json<CheckpointEvent>, ApiError> {
    let request = EvictionRequest {
        job_id: req.job_id,
        region: req.current_region,
        zone: req.current_az,
        sku: req.current_sku,
        model_size_gb: req.model_size_gb,
        epoch_progress_pct: req.epoch_progress_pct,
    };

    let event = state.engine.simulate_eviction(&request).map_err(api_error)?;
    Ok(Json(event))
}

/// Running totals and monitored regions
async fn dashboard_stats(State(state): State<Arc<AppState>>) -> Json<DashboardStatsResponse> {
    Json(DashboardStatsResponse {
        stats: state.engine.stats(),
        regions_monitored: state.engine.regions_monitored(),
    })
}
