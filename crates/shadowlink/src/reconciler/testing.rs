use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::gateway::ActuatorCommand;
use crate::gateway::ActuatorGateway;
use crate::gateway::GatewayError;

/// Gateway double that records every command it is asked to apply.
#[derive(Default)]
pub struct RecordingGateway {
    commands: Mutex<Vec<ActuatorCommand>>,
    delays: Mutex<VecDeque<Duration>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call answers with a 500 after being recorded
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// The first call sleeps for `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self::with_delays([delay])
    }

    /// The nth call sleeps for the nth delay; later calls return immediately
    pub fn with_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActuatorGateway for RecordingGateway {
    async fn apply(&self, command: &ActuatorCommand) -> Result<(), GatewayError> {
        self.commands.lock().unwrap().push(command.clone());

        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(GatewayError::Status {
                endpoint: "/test".to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}
