//! Liveness and readiness of the prediction service
//!
//! Readiness is read straight from the [`ModelSlot`]: the service is ready
//! once a serving context is installed and the model loader has not failed.
//! Component status only feeds `/healthz`.

use crate::predictor::ModelSlot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parts of the service whose state is reported on `/healthz`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Loading and checking the fitted pipeline
    ModelLoader,
    /// The training metrics file served on `/metrics`
    MetricsStore,
}

/// Ordered from best to worst; the service reports its worst component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component status plus the model slot readiness is derived from.
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    model: ModelSlot,
    components: Arc<RwLock<BTreeMap<Component, ComponentHealth>>>,
}

impl HealthRegistry {
    /// Start with the model loader pending; the metrics store counts as healthy until checked.
    pub fn new(model: ModelSlot) -> Self {
        let components = BTreeMap::from([
            (
                Component::ModelLoader,
                ComponentHealth::new(
                    ComponentStatus::Degraded,
                    Some("model not loaded yet".to_string()),
                ),
            ),
            (
                Component::MetricsStore,
                ComponentHealth::new(ComponentStatus::Healthy, None),
            ),
        ]);
        Self {
            model,
            components: Arc::new(RwLock::new(components)),
        }
    }

    async fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        self.components
            .write()
            .await
            .insert(component, ComponentHealth::new(status, message));
    }

    pub async fn set_healthy(&self, component: Component) {
        self.set(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !self.model.is_loaded() {
            Some("Model not loaded yet")
        } else if self
            .components
            .read()
            .await
            .get(&Component::ModelLoader)
            .is_some_and(|c| c.status == ComponentStatus::Unhealthy)
        {
            Some("Model loader unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
