//! Voice platform envelopes (Smart Home API, payload version 3).

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::shadow::TemperatureScale;

pub const PAYLOAD_VERSION: &str = "3";

/// Format of every `timeOfSample`
pub const TIME_OF_SAMPLE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.00Z";

/// Inbound request body
#[derive(Debug, Clone, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: Directive,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directive {
    pub header: Header,

    /// Absent for discovery
    #[serde(default)]
    pub endpoint: Option<Endpoint>,

    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub namespace: String,
    pub name: String,
    pub payload_version: String,
    pub message_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

impl Header {
    /// Header for a reply to `request`
    pub fn reply_to(request: &Header, namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            payload_version: PAYLOAD_VERSION.to_string(),
            message_id: request.message_id.clone(),
            correlation_token: request.correlation_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Bearer token scope; echoed back untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,

    pub endpoint_id: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub cookie: Map<String, Value>,
}

impl Endpoint {
    /// Endpoint block of a reply: id and scope only
    pub fn reply(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            endpoint_id: self.endpoint_id.clone(),
            cookie: Map::new(),
        }
    }
}

/// Value of `targetSetpoint` and `targetSetpointDelta`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub scale: TemperatureScale,
}

/// Outbound event body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,

    pub event: Event<P>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event<P> {
    pub header: Header,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,

    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Context {
    pub properties: Vec<Property>,
}

/// One reported property in `context.properties`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub namespace: String,
    pub name: String,
    pub value: Value,
    pub time_of_sample: String,
    pub uncertainty_in_milliseconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmptyPayload {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub message: String,
}

pub type ControlResponse = EventEnvelope<EmptyPayload>;
pub type ErrorResponse = EventEnvelope<ErrorPayload>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_control_directive() {
        let envelope: DirectiveEnvelope = serde_json::from_value(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOn",
                    "payloadVersion": "3",
                    "messageId": "1bd5d003-31b9-476f-ad03-71d471922820",
                    "correlationToken": "dFMb0z+PgpgdDmluhJ1LddFvSqZ/jCc8ptlAKulUj90jSqg=="
                },
                "endpoint": {
                    "scope": {"type": "BearerToken", "token": "access-token-from-skill"},
                    "endpointId": "F1_KitchenLight",
                    "cookie": {}
                },
                "payload": {}
            }
        }))
        .unwrap();

        let directive = envelope.directive;
        assert_eq!(directive.header.name, "TurnOn");
        assert_eq!(
            directive.endpoint.as_ref().map(|e| e.endpoint_id.as_str()),
            Some("F1_KitchenLight")
        );
        assert!(directive.header.correlation_token.is_some());
    }

    #[test]
    fn test_parse_discovery_directive() {
        let envelope: DirectiveEnvelope = serde_json::from_value(json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.Discovery",
                    "name": "Discover",
                    "payloadVersion": "3",
                    "messageId": "abc-123"
                },
                "payload": {"scope": {"type": "BearerToken", "token": "t"}}
            }
        }))
        .unwrap();

        assert!(envelope.directive.endpoint.is_none());
        assert!(envelope.directive.header.correlation_token.is_none());
    }

    #[test]
    fn test_serialize_response_shape() {
        let request = Header {
            namespace: "Alexa.PowerController".to_string(),
            name: "TurnOff".to_string(),
            payload_version: "3".to_string(),
            message_id: "m-1".to_string(),
            correlation_token: Some("c-1".to_string()),
        };
        let response: ControlResponse = EventEnvelope {
            context: Some(Context {
                properties: vec![Property {
                    namespace: "Alexa.PowerController".to_string(),
                    name: "powerState".to_string(),
                    value: json!("OFF"),
                    time_of_sample: "2017-02-03T16:20:50.00Z".to_string(),
                    uncertainty_in_milliseconds: 500,
                }],
            }),
            event: Event {
                header: Header::reply_to(&request, "Alexa", "Response"),
                endpoint: Some(Endpoint {
                    scope: None,
                    endpoint_id: "F1_HallLight".to_string(),
                    cookie: Map::new(),
                }),
                payload: EmptyPayload {},
            },
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "context": {
                    "properties": [{
                        "namespace": "Alexa.PowerController",
                        "name": "powerState",
                        "value": "OFF",
                        "timeOfSample": "2017-02-03T16:20:50.00Z",
                        "uncertaintyInMilliseconds": 500
                    }]
                },
                "event": {
                    "header": {
                        "namespace": "Alexa",
                        "name": "Response",
                        "payloadVersion": "3",
                        "messageId": "m-1",
                        "correlationToken": "c-1"
                    },
                    "endpoint": {"endpointId": "F1_HallLight"},
                    "payload": {}
                }
            })
        );
    }
}
