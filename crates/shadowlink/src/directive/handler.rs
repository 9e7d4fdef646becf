use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::message::ControlResponse;
use super::message::Directive;
use super::message::ErrorPayload;
use super::message::ErrorResponse;
use super::message::Event;
use super::message::EventEnvelope;
use super::message::Header;
use super::DirectiveError;
use super::DirectiveTranslator;
use crate::catalog::capability::PLATFORM_INTERFACE;
use crate::catalog::Catalog;
use crate::discovery::DiscoveryResponder;
use crate::discovery::DiscoveryResponse;
use crate::discovery::DISCOVERY_NAMESPACE;
use crate::shadow::ShadowStore;

/// Any reply the voice platform may receive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DirectiveReply {
    Discovery(DiscoveryResponse),
    Control(ControlResponse),
    Error(ErrorResponse),
}

/// Single entry point for voice platform directives.
pub struct DirectiveHandler {
    translator: DirectiveTranslator,
    discovery: DiscoveryResponder,
}

impl DirectiveHandler {
    pub fn new(catalog: Arc<Catalog>, shadow: Arc<dyn ShadowStore>) -> Self {
        Self {
            translator: DirectiveTranslator::new(catalog.clone(), shadow),
            discovery: DiscoveryResponder::new(catalog),
        }
    }

    /// Route a directive. Failures become `ErrorResponse` events; this never fails.
    pub async fn handle(&self, directive: &Directive) -> DirectiveReply {
        let header = &directive.header;
        debug!(
            "Directive {}.{} ({}) for {:?}",
            header.namespace,
            header.name,
            header.message_id,
            directive.endpoint.as_ref().map(|e| &e.endpoint_id)
        );

        if header.namespace == DISCOVERY_NAMESPACE && header.name == "Discover" {
            return DirectiveReply::Discovery(self.discovery.discover());
        }

        match self.translator.translate(directive).await {
            Ok(translation) => DirectiveReply::Control(translation.response),
            Err(e) => {
                warn!("Directive {} failed: {}", header.message_id, e);
                DirectiveReply::Error(error_response(directive, &e))
            }
        }
    }
}

fn error_response(directive: &Directive, error: &DirectiveError) -> ErrorResponse {
    EventEnvelope {
        context: None,
        event: Event {
            header: Header::reply_to(&directive.header, PLATFORM_INTERFACE, "ErrorResponse"),
            endpoint: directive.endpoint.as_ref().map(|e| e.reply()),
            payload: ErrorPayload {
                error_type: error.error_type(),
                message: error.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_json::Value;

    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::directive::message::DirectiveEnvelope;
    use crate::shadow::DesiredPatch;
    use crate::shadow::MemoryShadowStore;
    use crate::shadow::ReportedPatch;
    use crate::shadow::ShadowDocument;
    use crate::shadow::ShadowError;

    /// Store whose every call fails; counts attempted desired writes
    struct UnavailableStore {
        timeout: bool,
        desired_writes: AtomicUsize,
    }

    impl UnavailableStore {
        fn new(timeout: bool) -> Self {
            Self {
                timeout,
                desired_writes: AtomicUsize::new(0),
            }
        }

        fn error(&self, thing: &str, operation: &'static str) -> ShadowError {
            if self.timeout {
                ShadowError::Timeout {
                    thing: thing.to_string(),
                    operation,
                }
            } else {
                ShadowError::Transport("connection reset".to_string())
            }
        }
    }

    #[async_trait]
    impl ShadowStore for UnavailableStore {
        async fn get(&self, thing: &str) -> Result<ShadowDocument, ShadowError> {
            Err(self.error(thing, "get"))
        }

        async fn update_desired(
            &self,
            thing: &str,
            _patch: &DesiredPatch,
        ) -> Result<(), ShadowError> {
            self.desired_writes.fetch_add(1, Ordering::SeqCst);
            Err(self.error(thing, "update"))
        }

        async fn update_reported(
            &self,
            thing: &str,
            _patch: &ReportedPatch,
        ) -> Result<(), ShadowError> {
            Err(self.error(thing, "update"))
        }
    }

    async fn handle_with(store: Arc<UnavailableStore>, body: Value) -> Value {
        let handler = DirectiveHandler::new(Arc::new(Catalog::builtin().unwrap()), store);
        let envelope: DirectiveEnvelope = serde_json::from_value(body).unwrap();
        serde_json::to_value(handler.handle(&envelope.directive).await).unwrap()
    }

    fn adjust_directive() -> Value {
        json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.ThermostatController",
                    "name": "AdjustTargetTemperature",
                    "payloadVersion": "3",
                    "messageId": "m-5",
                    "correlationToken": "c-5"
                },
                "endpoint": {"endpointId": "Thermostat"},
                "payload": {"targetSetpointDelta": {"value": 2, "scale": "FAHRENHEIT"}}
            }
        })
    }

    fn turn_on_directive() -> Value {
        json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOn",
                    "payloadVersion": "3",
                    "messageId": "m-6",
                    "correlationToken": "c-6"
                },
                "endpoint": {"endpointId": "F1_HallLight"},
                "payload": {}
            }
        })
    }

    fn handler() -> DirectiveHandler {
        DirectiveHandler::new(
            Arc::new(Catalog::builtin().unwrap()),
            Arc::new(MemoryShadowStore::new()),
        )
    }

    async fn handle(body: Value) -> Value {
        let envelope: DirectiveEnvelope = serde_json::from_value(body).unwrap();
        let reply = handler().handle(&envelope.directive).await;
        serde_json::to_value(reply).unwrap()
    }

    #[tokio::test]
    async fn test_discover_routes_to_discovery() {
        let reply = handle(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.Discovery",
                    "name": "Discover",
                    "payloadVersion": "3",
                    "messageId": "d-1"
                },
                "payload": {}
            }
        }))
        .await;

        assert_eq!(reply["event"]["header"]["name"], "Discover.Response");
        assert_eq!(reply["event"]["payload"]["endpoints"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_error_response() {
        let reply = handle(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOn",
                    "payloadVersion": "3",
                    "messageId": "m-2",
                    "correlationToken": "c-2"
                },
                "endpoint": {"endpointId": "F9_Garage"},
                "payload": {}
            }
        }))
        .await;

        assert_eq!(reply["event"]["header"]["namespace"], "Alexa");
        assert_eq!(reply["event"]["header"]["name"], "ErrorResponse");
        assert_eq!(reply["event"]["header"]["correlationToken"], "c-2");
        assert_eq!(reply["event"]["endpoint"]["endpointId"], "F9_Garage");
        assert_eq!(reply["event"]["payload"]["type"], "NO_SUCH_ENDPOINT");
        assert!(reply.get("context").is_none());
    }

    #[tokio::test]
    async fn test_control_directive_is_response() {
        let reply = handle(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOff",
                    "payloadVersion": "3",
                    "messageId": "m-3",
                    "correlationToken": "c-3"
                },
                "endpoint": {"endpointId": "F2_BedRoomLight"},
                "payload": {}
            }
        }))
        .await;

        assert_eq!(reply["event"]["header"]["name"], "Response");
        assert_eq!(reply["context"]["properties"][0]["value"], "OFF");
    }

    #[tokio::test]
    async fn test_control_without_endpoint_is_invalid_directive() {
        let reply = handle(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOn",
                    "payloadVersion": "3",
                    "messageId": "m-4"
                },
                "payload": {}
            }
        }))
        .await;

        assert_eq!(reply["event"]["payload"]["type"], "INVALID_DIRECTIVE");
        assert!(reply["event"].get("endpoint").is_none());
    }

    #[tokio::test]
    async fn test_store_timeout_on_read_is_endpoint_unreachable() {
        let store = Arc::new(UnavailableStore::new(true));
        let reply = handle_with(store.clone(), adjust_directive()).await;

        assert_eq!(reply["event"]["header"]["name"], "ErrorResponse");
        assert_eq!(reply["event"]["payload"]["type"], "ENDPOINT_UNREACHABLE");
        assert!(reply.get("context").is_none());
        assert_eq!(store.desired_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_timeout_on_write_is_endpoint_unreachable() {
        let store = Arc::new(UnavailableStore::new(true));
        let reply = handle_with(store.clone(), turn_on_directive()).await;

        assert_eq!(reply["event"]["payload"]["type"], "ENDPOINT_UNREACHABLE");
        assert_eq!(reply["event"]["header"]["correlationToken"], "c-6");
        assert!(reply.get("context").is_none());
        assert_eq!(store.desired_writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_transport_failure_is_internal_error() {
        let store = Arc::new(UnavailableStore::new(false));

        let reply = handle_with(store.clone(), adjust_directive()).await;
        assert_eq!(reply["event"]["payload"]["type"], "INTERNAL_ERROR");
        assert!(reply.get("context").is_none());
        assert_eq!(store.desired_writes.load(Ordering::SeqCst), 0);

        let reply = handle_with(store.clone(), turn_on_directive()).await;
        assert_eq!(reply["event"]["payload"]["type"], "INTERNAL_ERROR");
        assert!(reply.get("context").is_none());
    }
}
