//! Device shadow store boundary.
//!
//! The shadow store holds, per appliance, a `desired` and a `reported` state
//! map and pushes a delta whenever desired state diverges from reported
//! state. This module defines the store contract and two implementations:
//! an MQTT client for a real shadow service and an in-memory store for local
//! runs and tests.

mod memory;
#[cfg(feature = "shadow_mqtt")]
pub mod mqtt;
mod patch;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::mpsc;

pub use memory::MemoryShadowStore;
pub use patch::DesiredPatch;
pub use patch::ReportedPatch;
pub use patch::StatePatch;
pub use patch::TemperatureScale;
pub use patch::ThermostatMode;

use crate::catalog::ShadowKey;
use crate::config::ShadowBackend;
use crate::config::ShadowConfig;

/// Capacity of the store→dispatcher delta channel
pub const DELTA_CHANNEL_SIZE: usize = 256;

pub type DeltaSender = mpsc::Sender<ShadowDelta>;
pub type DeltaReceiver = mpsc::Receiver<ShadowDelta>;

/// Full shadow document as returned by a read.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShadowDocument {
    #[serde(default)]
    pub state: DocumentState,

    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentState {
    #[serde(default)]
    pub desired: Map<String, Value>,

    #[serde(default)]
    pub reported: Map<String, Value>,
}

impl ShadowDocument {
    pub fn desired_temperature(&self) -> Option<f64> {
        self.state
            .desired
            .get(ShadowKey::TemperatureValue.as_str())
            .and_then(Value::as_f64)
    }

    pub fn reported_temperature(&self) -> Option<f64> {
        self.state
            .reported
            .get(ShadowKey::TemperatureValue.as_str())
            .and_then(Value::as_f64)
    }
}

/// Delta notification: the desired keys not yet mirrored in reported state.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowDelta {
    /// Thing name, equal to the appliance id
    pub thing: String,

    pub state: Map<String, Value>,

    pub version: Option<u64>,

    /// Token of the write that caused the delta, if the store passed it on
    pub client_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    #[error("shadow {operation} for {thing} timed out")]
    Timeout {
        thing: String,
        operation: &'static str,
    },

    #[error("shadow {operation} for {thing} rejected ({code}): {message}")]
    Rejected {
        thing: String,
        operation: &'static str,
        code: u16,
        message: String,
    },

    #[error("shadow transport error: {0}")]
    Transport(String),

    #[error("malformed shadow payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("shadow store connection closed")]
    Closed,
}

impl ShadowError {
    /// The thing has no shadow document yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShadowError::Rejected { code: 404, .. })
    }
}

/// Shadow store contract.
///
/// Desired and reported writes are separate methods taking separate patch
/// types so that each writer can only touch its own half of the document.
#[async_trait]
pub trait ShadowStore: Send + Sync {
    /// Read the full current document
    async fn get(&self, thing: &str) -> Result<ShadowDocument, ShadowError>;

    /// Merge a patch into `state.desired`
    async fn update_desired(&self, thing: &str, patch: &DesiredPatch) -> Result<(), ShadowError>;

    /// Merge a patch into `state.reported`
    async fn update_reported(&self, thing: &str, patch: &ReportedPatch)
        -> Result<(), ShadowError>;
}

/// Open the configured shadow store, wiring its delta notifications to `deltas`.
pub async fn connect(
    config: &ShadowConfig,
    deltas: DeltaSender,
) -> anyhow::Result<Arc<dyn ShadowStore>> {
    match config.backend {
        ShadowBackend::Memory => {
            tracing::info!("Using in-memory shadow store");
            Ok(Arc::new(MemoryShadowStore::with_deltas(deltas)))
        }
        #[cfg(feature = "shadow_mqtt")]
        ShadowBackend::Mqtt => {
            use anyhow::Context;

            let client =
                mqtt::RumqttcClient::new(config).context("Failed to create MQTT client")?;
            let mut store = mqtt::MqttShadowStore::new(client, config.operation_timeout());
            store
                .start(deltas)
                .await
                .context("Failed to start MQTT shadow store")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "shadow_mqtt"))]
        ShadowBackend::Mqtt => {
            anyhow::bail!("shadowlink was built without the shadow_mqtt feature")
        }
    }
}
