//! Observability for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, served/failed counts, model state)
//! - Structured JSON logging with tracing

use crate::error::{ErrorClass, PredictError};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Latency buckets in seconds; a ridge prediction is typically sub-millisecond
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_served: IntCounter,
    prediction_failures: IntCounterVec,
    model_loaded: IntGauge,
    expected_features: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "house_price_prediction_latency_seconds",
                "Time spent validating a payload and running the pipeline",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter!(
                "house_price_predictions_served_total",
                "Predictions returned successfully"
            )
            .expect("Failed to register predictions_served_total"),

            prediction_failures: register_int_counter_vec!(
                "house_price_prediction_failures_total",
                "Failed prediction requests by error class",
                &["class"]
            )
            .expect("Failed to register prediction_failures_total"),

            model_loaded: register_int_gauge!(
                "house_price_model_loaded",
                "1 once the fitted pipeline is installed"
            )
            .expect("Failed to register model_loaded"),

            expected_features: register_int_gauge!(
                "house_price_expected_features",
                "Number of features the loaded pipeline expects"
            )
            .expect("Failed to register expected_features"),
        }
    }
}

/// Handle to the process-wide service metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_failure(&self, class: ErrorClass) {
        self.inner()
            .prediction_failures
            .with_label_values(&[class.as_str()])
            .inc();
    }

    pub fn set_model_loaded(&self, expected_features: usize) {
        self.inner().model_loaded.set(1);
        self.inner().expected_features.set(expected_features as i64);
    }

    /// Current registry contents in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for service events
///
/// Every record carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            addr = %addr,
            "Prediction service started"
        );
    }

    pub fn log_model_loaded(&self, model_path: &Path, features: &[String], checksum: Option<&str>) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model_path = %model_path.display(),
            expected_features = features.len(),
            features = ?features,
            checksum = checksum.unwrap_or("unverified"),
            "Fitted pipeline loaded"
        );
    }

    pub fn log_model_load_failed(&self, model_path: &Path, err: &dyn std::error::Error) {
        error!(
            event = "model_load_failed",
            service = %self.service,
            model_path = %model_path.display(),
            error = %err,
            "Failed to load fitted pipeline"
        );
    }

    pub fn log_prediction(&self, prediction: f64, latency_secs: f64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            prediction = prediction,
            latency_ms = latency_secs * 1000.0,
            "Prediction served"
        );
    }

    /// Client and availability failures log at warn, runtime faults at error
    /// with the full chain.
    pub fn log_prediction_error(&self, err: &PredictError) {
        match err {
            PredictError::Validation(validation) => {
                warn!(
                    event = "prediction_rejected",
                    service = %self.service,
                    class = err.class().as_str(),
                    features = ?validation.features(),
                    detail = %validation,
                    "Prediction payload rejected"
                );
            }
            PredictError::NotReady => {
                warn!(
                    event = "prediction_rejected",
                    service = %self.service,
                    class = err.class().as_str(),
                    "Prediction requested before model load"
                );
            }
            PredictError::Runtime(source) => {
                error!(
                    event = "prediction_failed",
                    service = %self.service,
                    class = err.class().as_str(),
                    error = %format!("{source:#}"),
                    "Pipeline failed during inference"
                );
            }
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
