use std::collections::HashMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use serde_json::json;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::message::Context;
use super::message::ControlResponse;
use super::message::Directive;
use super::message::EmptyPayload;
use super::message::Event;
use super::message::EventEnvelope;
use super::message::Header;
use super::message::Property;
use super::message::Temperature;
use super::message::PAYLOAD_VERSION;
use super::message::TIME_OF_SAMPLE_FORMAT;
use super::operation::Operation;
use super::operation::OperationKind;
use super::DirectiveError;
use crate::catalog::capability::ENDPOINT_HEALTH;
use crate::catalog::capability::PLATFORM_INTERFACE;
use crate::catalog::capability::POWER_CONTROLLER;
use crate::catalog::capability::THERMOSTAT_CONTROLLER;
use crate::catalog::Appliance;
use crate::catalog::Catalog;
use crate::shadow::DesiredPatch;
use crate::shadow::ShadowStore;

const PRIMARY_UNCERTAINTY_MS: u32 = 500;
const HEALTH_UNCERTAINTY_MS: u32 = 200;

/// Result of a successful translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// The desired-state patch that was written
    pub patch: DesiredPatch,

    pub response: ControlResponse,
}

/// Turns control directives into desired-state writes and their acknowledgments.
///
/// Directives for the same appliance are translated one at a time, so the
/// read-add-write of an adjust directive cannot interleave with another write
/// to the same thermostat from this process.
pub struct DirectiveTranslator {
    catalog: Arc<Catalog>,
    shadow: Arc<dyn ShadowStore>,
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DirectiveTranslator {
    pub fn new(catalog: Arc<Catalog>, shadow: Arc<dyn ShadowStore>) -> Self {
        Self {
            catalog,
            shadow,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Validate `directive`, write its desired-state patch and build the response.
    ///
    /// Nothing is written unless the directive is valid for its target.
    pub async fn translate(&self, directive: &Directive) -> Result<Translation, DirectiveError> {
        let header = &directive.header;
        if header.payload_version != PAYLOAD_VERSION {
            return Err(DirectiveError::InvalidDirective(format!(
                "unsupported payload version {}",
                header.payload_version
            )));
        }

        let endpoint = directive.endpoint.as_ref().ok_or_else(|| {
            DirectiveError::InvalidDirective(format!("{} directive has no endpoint", header.name))
        })?;

        let appliance = self
            .catalog
            .lookup(&endpoint.endpoint_id)
            .ok_or_else(|| DirectiveError::NoSuchEndpoint(endpoint.endpoint_id.clone()))?;

        let kind = OperationKind::from_header(&header.namespace, &header.name).ok_or_else(|| {
            DirectiveError::InvalidDirective(format!(
                "unsupported directive {}.{}",
                header.namespace, header.name
            ))
        })?;

        if !appliance.category.supports_interface(kind.interface().name) {
            return Err(DirectiveError::InvalidDirective(format!(
                "{} does not support {}",
                appliance.id,
                kind.interface().name
            )));
        }

        let operation = kind.parse(&directive.payload)?;

        let lock = self.lock_for(&appliance.id)?;
        let _guard = lock.lock().await;

        let (patch, property) = self.plan(appliance, operation).await?;

        debug!("Writing desired state of {}: {:?}", appliance.id, patch.state());
        self.shadow.update_desired(&appliance.id, &patch).await?;

        let now = Utc::now();
        let response = EventEnvelope {
            context: Some(Context {
                properties: vec![
                    property.sampled(now, PRIMARY_UNCERTAINTY_MS),
                    PendingProperty::connectivity_ok().sampled(now, HEALTH_UNCERTAINTY_MS),
                ],
            }),
            event: Event {
                header: Header::reply_to(header, PLATFORM_INTERFACE, "Response"),
                endpoint: Some(endpoint.reply()),
                payload: EmptyPayload {},
            },
        };

        Ok(Translation { patch, response })
    }

    /// Work out the desired patch and the property to report back.
    async fn plan(
        &self,
        appliance: &Appliance,
        operation: Operation,
    ) -> Result<(DesiredPatch, PendingProperty), DirectiveError> {
        let planned = match operation {
            Operation::TurnOn | Operation::TurnOff => {
                let on = operation == Operation::TurnOn;
                (
                    DesiredPatch::power(on),
                    PendingProperty::new(
                        POWER_CONTROLLER.name,
                        "powerState",
                        json!(if on { "ON" } else { "OFF" }),
                    ),
                )
            }
            Operation::SetTargetTemperature(target) => {
                (DesiredPatch::setpoint(target.value, target.scale), setpoint_property(target))
            }
            Operation::AdjustTargetTemperature(delta) => {
                let baseline = self.current_setpoint(appliance).await?.ok_or_else(|| {
                    DirectiveError::InvalidValue(format!(
                        "{} has no target temperature to adjust",
                        appliance.id
                    ))
                })?;
                let value = baseline + delta.value;
                if !value.is_finite() {
                    return Err(DirectiveError::InvalidValue(format!(
                        "adjusting {} by {} is out of range",
                        baseline, delta.value
                    )));
                }
                let target = Temperature {
                    value,
                    scale: delta.scale,
                };
                (DesiredPatch::setpoint(target.value, target.scale), setpoint_property(target))
            }
            Operation::SetThermostatMode(mode) => (
                DesiredPatch::mode(mode),
                PendingProperty::new(
                    THERMOSTAT_CONTROLLER.name,
                    "thermostatMode",
                    json!(mode.to_string()),
                ),
            ),
        };
        Ok(planned)
    }

    /// Desired setpoint, falling back to the reported one. A thing without a
    /// shadow document has neither.
    async fn current_setpoint(&self, appliance: &Appliance) -> Result<Option<f64>, DirectiveError> {
        match self.shadow.get(&appliance.id).await {
            Ok(document) => Ok(document
                .desired_temperature()
                .or_else(|| document.reported_temperature())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn lock_for(&self, id: &str) -> Result<Arc<Mutex<()>>, DirectiveError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| DirectiveError::DependencyFailure(e.to_string()))?;
        Ok(locks.entry(id.to_string()).or_default().clone())
    }
}

/// A response property waiting for its sample time
struct PendingProperty {
    namespace: &'static str,
    name: &'static str,
    value: Value,
}

impl PendingProperty {
    fn new(namespace: &'static str, name: &'static str, value: Value) -> Self {
        Self {
            namespace,
            name,
            value,
        }
    }

    fn connectivity_ok() -> Self {
        Self::new(ENDPOINT_HEALTH.name, "connectivity", json!({"value": "OK"}))
    }

    fn sampled(self, at: DateTime<Utc>, uncertainty_in_milliseconds: u32) -> Property {
        Property {
            namespace: self.namespace.to_string(),
            name: self.name.to_string(),
            value: self.value,
            time_of_sample: at.format(TIME_OF_SAMPLE_FORMAT).to_string(),
            uncertainty_in_milliseconds,
        }
    }
}

fn setpoint_property(target: Temperature) -> PendingProperty {
    PendingProperty::new(
        THERMOSTAT_CONTROLLER.name,
        "targetSetpoint",
        json!({"value": target.value, "scale": target.scale}),
    )
}
