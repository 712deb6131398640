//! HTTP API for predictions, schema, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use pricing_lib::{
    artifacts::read_metrics,
    health::{Component, ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    ErrorClass, ModelSlot, PredictError,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "House Price Prediction API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub model: ModelSlot,
    pub metrics_path: PathBuf,
}

impl AppState {
    /// Readiness is tracked against `model`, so the registry is built from it.
    pub fn new(
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        model: ModelSlot,
        metrics_path: PathBuf,
    ) -> Self {
        Self {
            health_registry: HealthRegistry::new(model.clone()),
            metrics,
            logger,
            model,
            metrics_path,
        }
    }
}

/// Error body: `{"error": <class>, "detail": <message>, "features": [...]}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    detail: String,
    features: Vec<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error,
            detail: detail.into(),
            features: Vec::new(),
        }
    }

    fn not_ready() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Unavailable.as_str(),
            "Model not loaded yet.",
        )
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(validation) => Self {
                status: StatusCode::BAD_REQUEST,
                error: ErrorClass::Client.as_str(),
                features: validation.features(),
                detail: validation.to_string(),
            },
            PredictError::NotReady => Self::not_ready(),
            // Details stay in the logs.
            PredictError::Runtime(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorClass::Internal.as_str(),
                "Internal prediction error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "detail": self.detail,
        });
        if !self.features.is_empty() {
            body["features"] = json!(self.features);
        }
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthSummary {
    pub status: &'static str,
    pub pipeline_loaded: bool,
    pub expected_features_count: usize,
    pub metrics_available: bool,
    pub time_utc: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: f64,
    pub time_utc: DateTime<Utc>,
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "docs": "/schema",
        "time_utc": Utc::now(),
    }))
}

/// Liveness summary; always 200 while the process runs
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthSummary> {
    let context = state.model.get();
    Json(HealthSummary {
        status: "ok",
        pipeline_loaded: context.is_some(),
        expected_features_count: context.map_or(0, |c| c.schema().len()),
        metrics_available: state.metrics_path.is_file(),
        time_utc: Utc::now(),
    })
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn schema(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let context = state.model.get().ok_or_else(ApiError::not_ready)?;
    Ok(Json(json!({
        "expected_features": context.schema(),
        "time_utc": Utc::now(),
    })))
}

async fn training_metrics(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    match read_metrics(&state.metrics_path) {
        Ok(Some(mut metrics)) => {
            state
                .health_registry
                .set_healthy(Component::MetricsStore)
                .await;
            metrics.insert("time_utc".to_string(), json!(Utc::now()));
            Ok(Json(Value::Object(metrics)))
        }
        Ok(None) => {
            state
                .health_registry
                .set_degraded(Component::MetricsStore, "metrics.json not found")
                .await;
            Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "not_found",
                "metrics.json not found. Train the model first.",
            ))
        }
        Err(err) => {
            warn!(error = %err, "Could not read metrics file");
            state
                .health_registry
                .set_degraded(Component::MetricsStore, err.to_string())
                .await;
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorClass::Internal.as_str(),
                "Could not read metrics.json",
            ))
        }
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        state.metrics.inc_prediction_failure(ErrorClass::Client);
        ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorClass::Client.as_str(),
            rejection.body_text(),
        )
    })?;

    let start = Instant::now();
    match state.model.predict(&payload) {
        Ok(result) => {
            let elapsed = start.elapsed().as_secs_f64();
            state.metrics.observe_prediction_latency(elapsed);
            state.metrics.inc_predictions_served();
            state.logger.log_prediction(result.prediction, elapsed);
            Ok(Json(PredictResponse {
                prediction: result.prediction,
                time_utc: result.generated_at,
            }))
        }
        Err(err) => {
            state.metrics.inc_prediction_failure(err.class());
            state.logger.log_prediction_error(&err);
            Err(err.into())
        }
    }
}

/// Prometheus metrics endpoint
async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to encode Prometheus metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/schema", get(schema))
        .route("/metrics", get(training_metrics))
        .route("/predict", post(predict))
        .route("/prometheus", get(prometheus_metrics))
        .with_state(state)
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %listener.local_addr()?, "Starting API server");
    axum::serve(listener, app).await?;

    Ok(())
}
