//! House price regression pipeline library
//!
//! This crate provides the core functionality for:
//! - Recovering the expected input schema from a fitted pipeline
//! - Validating request payloads into ordered prediction rows
//! - Classified prediction errors
//! - Dataset ingestion, validation, splitting and model training
//! - Model persistence, health checks and observability

pub mod artifacts;
pub mod config;
pub mod data;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod schema;
pub mod training;
pub mod validation;

pub use config::PipelineConfig;
pub use error::{
    ArtifactError, ConfigError, DataError, ErrorClass, PredictError, SchemaExtractionError,
    TrainingError, ValidationError,
};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ModelSlot, PipelineArtifact, ServingContext};
pub use schema::{extract_expected_features, ExpectedSchema};
pub use validation::{build_request_row, InputPayload};
