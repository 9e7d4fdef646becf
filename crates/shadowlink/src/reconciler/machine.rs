use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use serde_json::Value;
use strum::Display;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::catalog::Appliance;
use crate::catalog::ShadowKey;
use crate::gateway::ActuatorCommand;
use crate::gateway::ActuatorGateway;
use crate::gateway::GatewayError;
use crate::shadow::ReportedPatch;
use crate::shadow::ShadowDelta;
use crate::shadow::ShadowStore;
use crate::shadow::StatePatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReconcileState {
    Idle,
    Applying,
    Confirmed,
    Failed,
}

/// What handling one delta came to
#[derive(Debug)]
pub enum Outcome {
    /// Nothing in the delta applied to this appliance
    Ignored,

    /// Applied; carries the reported patch that was written (or attempted)
    Confirmed(ReportedPatch),

    /// The actuator call failed; nothing was reported
    Failed(GatewayError),
}

/// The keys of `delta` this appliance accepts, typed.
///
/// Unknown keys, keys outside the appliance's category and ill-typed values
/// are dropped with a warning.
pub fn accepted_patch(appliance: &Appliance, delta: &Map<String, Value>) -> StatePatch {
    let mut patch = StatePatch::default();

    for (name, value) in delta {
        let key = match name.parse::<ShadowKey>() {
            Ok(key) if appliance.category.allows(key) => key,
            _ => {
                warn!("Dropping delta key '{}' for {}", name, appliance.id);
                continue;
            }
        };

        if let Err(e) = patch.insert(key, value) {
            warn!(
                "Dropping delta key '{}' for {}: bad value {}: {}",
                name, appliance.id, value, e
            );
        }
    }

    patch
}

/// The single actuator call that carries out `patch`, if any is needed.
///
/// A thermostat patch that only changes the scale needs none.
pub fn actuation_for(appliance: &Appliance, patch: &StatePatch) -> Option<ActuatorCommand> {
    if let Some(on) = patch.power {
        return Some(ActuatorCommand::Light {
            target: appliance.gateway_target.clone(),
            on,
        });
    }

    if patch.temperature.is_some() || patch.mode.is_some() {
        return Some(ActuatorCommand::Thermostat {
            room: appliance.gateway_target.clone(),
            mode: patch.mode,
            setpoint: patch.temperature,
        });
    }

    None
}

/// Delta handler for one appliance.
///
/// `Confirmed` and `Failed` only last while a delta is being handled; the
/// machine is back in `Idle` as soon as [`Reconciler::handle`] returns.
pub struct Reconciler {
    appliance: Appliance,
    shadow: Arc<dyn ShadowStore>,
    gateway: Arc<dyn ActuatorGateway>,
    actuator_timeout: Duration,
    state: ReconcileState,
}

impl Reconciler {
    pub fn new(
        appliance: Appliance,
        shadow: Arc<dyn ShadowStore>,
        gateway: Arc<dyn ActuatorGateway>,
        actuator_timeout: Duration,
    ) -> Self {
        Self {
            appliance,
            shadow,
            gateway,
            actuator_timeout,
            state: ReconcileState::Idle,
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    fn transition(&mut self, next: ReconcileState) {
        debug!("{}: {} -> {}", self.appliance.id, self.state, next);
        self.state = next;
    }

    pub async fn handle(&mut self, delta: &ShadowDelta) -> Outcome {
        let patch = accepted_patch(&self.appliance, &delta.state);
        if patch.is_empty() {
            debug!("{}: no applicable keys in delta", self.appliance.id);
            return Outcome::Ignored;
        }

        debug!(
            "{}: applying {:?} (version {:?}, client token {:?})",
            self.appliance.id, patch, delta.version, delta.client_token
        );
        self.transition(ReconcileState::Applying);

        let outcome = match self.actuate(&patch).await {
            Ok(()) => {
                self.transition(ReconcileState::Confirmed);
                let reported = ReportedPatch::mirror(patch);
                if let Err(e) = self.shadow.update_reported(&self.appliance.id, &reported).await {
                    warn!("{}: failed to write reported state: {}", self.appliance.id, e);
                }
                Outcome::Confirmed(reported)
            }
            Err(e) => {
                self.transition(ReconcileState::Failed);
                warn!("{}: actuation failed: {}", self.appliance.id, e);
                Outcome::Failed(e)
            }
        };

        self.transition(ReconcileState::Idle);
        outcome
    }

    async fn actuate(&self, patch: &StatePatch) -> Result<(), GatewayError> {
        let Some(command) = actuation_for(&self.appliance, patch) else {
            return Ok(());
        };

        info!("{}: {:?}", self.appliance.id, command);
        tokio::time::timeout(self.actuator_timeout, self.gateway.apply(&command))
            .await
            .map_err(|_| GatewayError::Timeout(self.appliance.gateway_target.clone()))?
    }
}
