use serde::de::DeserializeOwned;
use serde_json::Value;

use super::message::Temperature;
use super::DirectiveError;
use crate::catalog::capability::Interface;
use crate::catalog::capability::POWER_CONTROLLER;
use crate::catalog::capability::THERMOSTAT_CONTROLLER;
use crate::shadow::ThermostatMode;

/// Control directives this bridge understands, keyed by header namespace and name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    TurnOn,
    TurnOff,
    SetTargetTemperature,
    AdjustTargetTemperature,
    SetThermostatMode,
}

impl OperationKind {
    pub fn from_header(namespace: &str, name: &str) -> Option<Self> {
        let kind = match (namespace, name) {
            ("Alexa.PowerController", "TurnOn") => OperationKind::TurnOn,
            ("Alexa.PowerController", "TurnOff") => OperationKind::TurnOff,
            ("Alexa.ThermostatController", "SetTargetTemperature") => {
                OperationKind::SetTargetTemperature
            }
            ("Alexa.ThermostatController", "AdjustTargetTemperature") => {
                OperationKind::AdjustTargetTemperature
            }
            ("Alexa.ThermostatController", "SetThermostatMode") => OperationKind::SetThermostatMode,
            _ => return None,
        };
        Some(kind)
    }

    /// Interface the target appliance must advertise
    pub fn interface(self) -> &'static Interface {
        match self {
            OperationKind::TurnOn | OperationKind::TurnOff => &POWER_CONTROLLER,
            _ => &THERMOSTAT_CONTROLLER,
        }
    }

    /// Decode the operation's payload.
    pub fn parse(self, payload: &Value) -> Result<Operation, DirectiveError> {
        match self {
            OperationKind::TurnOn => Ok(Operation::TurnOn),
            OperationKind::TurnOff => Ok(Operation::TurnOff),
            OperationKind::SetTargetTemperature => {
                field(payload, "targetSetpoint").map(Operation::SetTargetTemperature)
            }
            OperationKind::AdjustTargetTemperature => {
                field(payload, "targetSetpointDelta").map(Operation::AdjustTargetTemperature)
            }
            OperationKind::SetThermostatMode => {
                let mode = payload
                    .get("thermostatMode")
                    .ok_or_else(|| missing("thermostatMode"))?;
                field(mode, "value").map(Operation::SetThermostatMode)
            }
        }
    }
}

/// A decoded control directive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    TurnOn,
    TurnOff,
    SetTargetTemperature(Temperature),
    AdjustTargetTemperature(Temperature),
    SetThermostatMode(ThermostatMode),
}

fn missing(name: &str) -> DirectiveError {
    DirectiveError::InvalidValue(format!("payload is missing {}", name))
}

fn field<T: DeserializeOwned>(payload: &Value, name: &str) -> Result<T, DirectiveError> {
    let value = payload.get(name).ok_or_else(|| missing(name))?;
    let parsed = serde_json::from_value(value.clone())
        .map_err(|e| DirectiveError::InvalidValue(format!("{}: {}", name, e)))?;
    Ok(parsed)
}
