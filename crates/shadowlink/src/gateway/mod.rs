//! Physical actuator gateway.
//!
//! The gateway drives the real relays and the thermostat. It only learns of
//! state changes through the reconciler (and the maintenance endpoints of the
//! HTTP API), one [`ActuatorCommand`] at a time.

mod http;

use async_trait::async_trait;

pub use http::HttpGateway;

use crate::shadow::ThermostatMode;

/// Room-wide switch name the gateway uses for "every light"
pub const ALL_LIGHTS: &str = "lights";

/// One physical action. Each value is built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCommand {
    /// Switch a single light
    Light { target: String, on: bool },

    /// Switch every light in the house
    AllLights { on: bool },

    /// Composite thermostat update; at least one of the fields is set
    Thermostat {
        room: String,
        mode: Option<ThermostatMode>,
        setpoint: Option<f64>,
    },

    /// Report the measured room temperature
    CurrentTemperature { room: String, value: f64 },
}

/// A single form-encoded POST to the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub endpoint: &'static str,
    pub form: Vec<(&'static str, String)>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request to {0} timed out")]
    Timeout(String),

    #[error("gateway returned {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outbound notifier the reconciler drives.
#[async_trait]
pub trait ActuatorGateway: Send + Sync {
    /// Carry out one command. Succeeds only if every request it needs got a 2xx.
    async fn apply(&self, command: &ActuatorCommand) -> Result<(), GatewayError>;
}

fn on_off(on: bool) -> String {
    let state = if on { "on" } else { "off" };
    state.to_string()
}

/// Gateway mode code for a thermostat mode
pub fn mode_code(mode: ThermostatMode) -> &'static str {
    match mode {
        ThermostatMode::Heat => "mode2",
        ThermostatMode::Cool => "mode3",
        _ => "mode1",
    }
}

/// The requests needed to carry out `command`, in the order they must be sent.
///
/// A composite thermostat command sets the mode before the setpoint.
pub fn requests_for(command: &ActuatorCommand) -> Vec<GatewayRequest> {
    match command {
        ActuatorCommand::Light { target, on } => vec![GatewayRequest {
            endpoint: "/updateLight",
            form: vec![("light", target.clone()), ("state", on_off(*on))],
        }],
        ActuatorCommand::AllLights { on } => vec![GatewayRequest {
            endpoint: "/updateAllLight",
            form: vec![("light", ALL_LIGHTS.to_string()), ("state", on_off(*on))],
        }],
        ActuatorCommand::Thermostat {
            room,
            mode,
            setpoint,
        } => {
            let mut requests = Vec::with_capacity(2);
            if let Some(mode) = mode {
                requests.push(GatewayRequest {
                    endpoint: "/updateMode",
                    form: vec![("room", room.clone()), ("mode", mode_code(*mode).to_string())],
                });
            }
            if let Some(setpoint) = setpoint {
                requests.push(GatewayRequest {
                    endpoint: "/updateSetTemp",
                    form: vec![("room", room.clone()), ("setTemp", setpoint.to_string())],
                });
            }
            requests
        }
        ActuatorCommand::CurrentTemperature { room, value } => vec![GatewayRequest {
            endpoint: "/updateCurrTemp",
            form: vec![("room", room.clone()), ("currTemp", value.to_string())],
        }],
    }
}
