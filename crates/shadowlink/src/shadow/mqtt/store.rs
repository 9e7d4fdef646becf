use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::client::MqttClient;
use super::client::MqttMessage;
use super::topic::parse_reply_topic;
use super::topic::reply_subscriptions;
use super::topic::request_topic;
use super::topic::Operation;
use super::topic::Reply;
use crate::shadow::DeltaSender;
use crate::shadow::DesiredPatch;
use crate::shadow::ReportedPatch;
use crate::shadow::ShadowDelta;
use crate::shadow::ShadowDocument;
use crate::shadow::ShadowError;
use crate::shadow::ShadowStore;
use crate::shadow::StatePatch;

/// Outcome of a request, matched to its caller by client token
#[derive(Debug)]
enum Response {
    Accepted(Value),
    Rejected { code: u16, message: String },
}

/// Requests waiting for their accepted/rejected reply, keyed by client token
type PendingMap = Arc<std::sync::Mutex<HashMap<String, oneshot::Sender<Response>>>>;

#[derive(Debug, Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    state: Map<String, Value>,
    version: Option<u64>,
    #[serde(rename = "clientToken")]
    client_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Shadow store backed by a shadow service reachable over MQTT.
///
/// Requests are published on `.../get` and `.../update` with a fresh client
/// token; the service answers on `/accepted` or `/rejected` echoing the token.
/// Delta notifications are forwarded to the dispatcher channel.
pub struct MqttShadowStore<C: MqttClient> {
    client: Arc<Mutex<C>>,
    pending: PendingMap,
    timeout: Duration,
    /// Handle to the background message processing task
    message_task: Option<JoinHandle<()>>,
}

impl<C: MqttClient + 'static> MqttShadowStore<C> {
    pub fn new(client: C, timeout: Duration) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            pending: Arc::new(std::sync::Mutex::new(HashMap::new())),
            timeout,
            message_task: None,
        }
    }

    /// Connect, subscribe to the reply topics and start routing messages.
    pub async fn start(&mut self, deltas: DeltaSender) -> Result<(), ShadowError> {
        {
            let mut client = self.client.lock().await;
            client.connect().await.map_err(transport_error)?;
            for topic in reply_subscriptions() {
                debug!("Subscribing to {}", topic);
                client.subscribe(&topic).await.map_err(transport_error)?;
            }
        }
        info!("Connected to shadow service");

        let client = self.client.clone();
        let pending = self.pending.clone();
        let task = tokio::spawn(async move {
            Self::process_messages_task(client, pending, deltas).await;
        });
        self.message_task = Some(task);

        Ok(())
    }

    async fn process_messages_task(
        client: Arc<Mutex<C>>,
        pending: PendingMap,
        deltas: DeltaSender,
    ) {
        loop {
            // Bound the time the lock is held so publishers are not starved
            let msg = {
                let mut client_guard = client.lock().await;
                tokio::time::timeout(Duration::from_millis(100), client_guard.poll_message())
                    .await
                    .unwrap_or_default()
            };

            match msg {
                Some(msg) => {
                    if let Some(delta) = Self::route_message(&msg, &pending) {
                        if deltas.send(delta).await.is_err() {
                            info!("Delta receiver dropped, stopping shadow message task");
                            break;
                        }
                    }
                }
                None => tokio::task::yield_now().await,
            }
        }
    }

    /// Complete a pending request, or turn a delta notification into a
    /// [`ShadowDelta`] for the caller to forward.
    fn route_message(msg: &MqttMessage, pending: &PendingMap) -> Option<ShadowDelta> {
        let Some((thing, reply)) = parse_reply_topic(&msg.topic) else {
            debug!("Ignoring message on unexpected topic {}", msg.topic);
            return None;
        };

        let payload: Value = match serde_json::from_slice(&msg.payload) {
            Ok(v) => v,
            Err(e) => {
                warn!("Malformed shadow payload on {}: {}", msg.topic, e);
                return None;
            }
        };

        match reply {
            Reply::Delta => match serde_json::from_value::<DeltaPayload>(payload) {
                Ok(delta) => Some(ShadowDelta {
                    thing,
                    state: delta.state,
                    version: delta.version,
                    client_token: delta.client_token,
                }),
                Err(e) => {
                    warn!("Malformed delta for {}: {}", thing, e);
                    None
                }
            },
            Reply::Accepted(_) | Reply::Rejected(_) => {
                // Replies to other clients' requests carry tokens we never issued
                let token = payload.get("clientToken").and_then(Value::as_str)?;
                let waiter = pending.lock().ok()?.remove(token)?;

                let response = match reply {
                    Reply::Rejected(_) => match serde_json::from_value::<ErrorPayload>(payload) {
                        Ok(e) => Response::Rejected {
                            code: e.code,
                            message: e.message,
                        },
                        Err(e) => Response::Rejected {
                            code: 500,
                            message: e.to_string(),
                        },
                    },
                    _ => Response::Accepted(payload),
                };

                if waiter.send(response).is_err() {
                    debug!("Requester for {} gave up before the reply arrived", thing);
                }
                None
            }
        }
    }

    async fn request(
        &self,
        thing: &str,
        operation: Operation,
        mut body: Map<String, Value>,
    ) -> Result<Value, ShadowError> {
        let token = Uuid::new_v4().to_string();
        body.insert("clientToken".to_string(), Value::String(token.clone()));
        let payload = serde_json::to_vec(&body)?;

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ShadowError::Closed)?
            .insert(token.clone(), tx);

        let exchange = async {
            {
                let mut client = self.client.lock().await;
                client
                    .publish(&request_topic(thing, operation), &payload)
                    .await
                    .map_err(transport_error)?;
            }
            rx.await.map_err(|_| ShadowError::Closed)
        };

        let result = tokio::time::timeout(self.timeout, exchange).await;

        let response = match result {
            Ok(response) => response,
            Err(_) => {
                if let Ok(mut pending) = self.pending.lock() {
                    pending.remove(&token);
                }
                return Err(ShadowError::Timeout {
                    thing: thing.to_string(),
                    operation: operation.as_str(),
                });
            }
        };

        match response {
            Ok(Response::Accepted(value)) => Ok(value),
            Ok(Response::Rejected { code, message }) => Err(ShadowError::Rejected {
                thing: thing.to_string(),
                operation: operation.as_str(),
                code,
                message,
            }),
            Err(e) => {
                if let Ok(mut pending) = self.pending.lock() {
                    pending.remove(&token);
                }
                Err(e)
            }
        }
    }

    async fn update(
        &self,
        thing: &str,
        half: &'static str,
        patch: &StatePatch,
    ) -> Result<(), ShadowError> {
        let mut state = Map::new();
        state.insert(half.to_string(), Value::Object(patch.to_map()));

        let mut body = Map::new();
        body.insert("state".to_string(), Value::Object(state));
        self.request(thing, Operation::Update, body).await?;
        Ok(())
    }
}

fn transport_error(e: Box<dyn std::error::Error + Send>) -> ShadowError {
    ShadowError::Transport(e.to_string())
}

#[async_trait]
impl<C: MqttClient + 'static> ShadowStore for MqttShadowStore<C> {
    async fn get(&self, thing: &str) -> Result<ShadowDocument, ShadowError> {
        let value = self.request(thing, Operation::Get, Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_desired(&self, thing: &str, patch: &DesiredPatch) -> Result<(), ShadowError> {
        self.update(thing, "desired", patch.state()).await
    }

    async fn update_reported(
        &self,
        thing: &str,
        patch: &ReportedPatch,
    ) -> Result<(), ShadowError> {
        self.update(thing, "reported", patch.state()).await
    }
}

impl<C: MqttClient> Drop for MqttShadowStore<C> {
    fn drop(&mut self) {
        if let Some(task) = self.message_task.take() {
            task.abort();
        }
    }
}
