//! Discovery responses.
//!
//! Endpoint capabilities come from [`Category::interfaces`](crate::catalog::Category::interfaces),
//! the same mapping the reconciler uses to validate delta keys, so what the
//! voice platform is told an appliance supports and what the bridge accepts
//! in its shadow cannot drift apart.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::catalog::capability::Interface;
use crate::catalog::capability::ENDPOINT_HEALTH;
use crate::catalog::capability::PLATFORM_INTERFACE;
use crate::catalog::Appliance;
use crate::catalog::Catalog;
use crate::directive::message::Event;
use crate::directive::message::EventEnvelope;
use crate::directive::message::Header;
use crate::directive::message::PAYLOAD_VERSION;

pub const DISCOVERY_NAMESPACE: &str = "Alexa.Discovery";

const INTERFACE_VERSION: &str = "3";

pub type DiscoveryResponse = EventEnvelope<DiscoveryPayload>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPayload {
    pub endpoints: Vec<DiscoveredEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEndpoint {
    pub endpoint_id: String,
    pub manufacturer_name: String,
    pub friendly_name: String,
    pub description: String,
    pub display_categories: Vec<&'static str>,
    pub cookie: Map<String, Value>,
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capability {
    #[serde(rename = "type")]
    pub capability_type: &'static str,
    pub interface: &'static str,
    pub version: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<CapabilityProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    pub supported: Vec<SupportedProperty>,
    pub proactively_reported: bool,
    pub retrievable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportedProperty {
    pub name: &'static str,
}

impl Capability {
    fn interface(interface: &Interface) -> Self {
        Self {
            capability_type: "AlexaInterface",
            interface: interface.name,
            version: INTERFACE_VERSION,
            properties: Some(CapabilityProperties {
                supported: interface
                    .properties
                    .iter()
                    .map(|&name| SupportedProperty { name })
                    .collect(),
                proactively_reported: true,
                retrievable: true,
            }),
        }
    }

    fn platform_marker() -> Self {
        Self {
            capability_type: "AlexaInterface",
            interface: PLATFORM_INTERFACE,
            version: INTERFACE_VERSION,
            properties: None,
        }
    }
}

/// Enumerates the catalog as discovery endpoints.
#[derive(Debug, Clone)]
pub struct DiscoveryResponder {
    catalog: Arc<Catalog>,
}

impl DiscoveryResponder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Endpoints in catalog order.
    pub fn endpoints(&self) -> Vec<DiscoveredEndpoint> {
        self.catalog.all().iter().map(endpoint_for).collect()
    }

    /// Full `Discover.Response` event. The message id is freshly generated.
    pub fn discover(&self) -> DiscoveryResponse {
        EventEnvelope {
            context: None,
            event: Event {
                header: Header {
                    namespace: DISCOVERY_NAMESPACE.to_string(),
                    name: "Discover.Response".to_string(),
                    payload_version: PAYLOAD_VERSION.to_string(),
                    message_id: uuid::Uuid::new_v4().to_string(),
                    correlation_token: None,
                },
                endpoint: None,
                payload: DiscoveryPayload {
                    endpoints: self.endpoints(),
                },
            },
        }
    }
}

fn endpoint_for(appliance: &Appliance) -> DiscoveredEndpoint {
    let mut capabilities: Vec<Capability> = appliance
        .category
        .interfaces()
        .iter()
        .map(Capability::interface)
        .collect();
    capabilities.push(Capability::interface(&ENDPOINT_HEALTH));
    capabilities.push(Capability::platform_marker());

    DiscoveredEndpoint {
        endpoint_id: appliance.id.clone(),
        manufacturer_name: appliance.manufacturer.clone(),
        friendly_name: appliance.friendly_name.clone(),
        description: appliance.description.clone(),
        display_categories: vec![appliance.category.display_category()],
        cookie: appliance.details.clone(),
        capabilities,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::Category;

    fn responder() -> DiscoveryResponder {
        DiscoveryResponder::new(Arc::new(Catalog::builtin().unwrap()))
    }

    fn interfaces(endpoint: &DiscoveredEndpoint) -> Vec<&'static str> {
        endpoint.capabilities.iter().map(|c| c.interface).collect()
    }

    #[test]
    fn test_one_endpoint_per_appliance_in_order() {
        let catalog = Catalog::builtin().unwrap();
        let endpoints = responder().endpoints();

        let ids: Vec<_> = endpoints.iter().map(|e| e.endpoint_id.as_str()).collect();
        let expected: Vec<_> = catalog.all().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_every_endpoint_has_health_and_marker() {
        for endpoint in responder().endpoints() {
            let names = interfaces(&endpoint);
            assert_eq!(names[names.len() - 2], "Alexa.EndpointHealth");
            assert_eq!(names[names.len() - 1], "Alexa");
            assert!(endpoint.capabilities.last().unwrap().properties.is_none());
        }
    }

    #[test]
    fn test_capabilities_follow_category() {
        let endpoints = responder().endpoints();

        let thermostat = &endpoints[0];
        assert_eq!(thermostat.display_categories, vec!["THERMOSTAT"]);
        assert_eq!(
            interfaces(thermostat),
            vec![
                "Alexa.ThermostatController",
                "Alexa.TemperatureSensor",
                "Alexa.EndpointHealth",
                "Alexa"
            ]
        );

        let light = &endpoints[1];
        assert_eq!(light.display_categories, vec!["LIGHT"]);
        assert_eq!(
            interfaces(light),
            vec!["Alexa.PowerController", "Alexa.EndpointHealth", "Alexa"]
        );
    }

    #[test]
    fn test_other_category_is_on_off() {
        let mut appliance = crate::catalog::builtin_appliances().remove(1);
        appliance.id = "Fan".to_string();
        appliance.category = Category::Other;
        let responder = DiscoveryResponder::new(Arc::new(Catalog::new(vec![appliance]).unwrap()));

        let endpoint = &responder.endpoints()[0];
        assert_eq!(endpoint.display_categories, vec!["OTHER"]);
        assert_eq!(interfaces(endpoint)[0], "Alexa.PowerController");
    }

    #[test]
    fn test_empty_catalog() {
        let responder = DiscoveryResponder::new(Arc::new(Catalog::new(Vec::new()).unwrap()));
        let response = serde_json::to_value(responder.discover()).unwrap();
        assert_eq!(response["event"]["payload"], json!({"endpoints": []}));
    }

    #[test]
    fn test_discover_envelope() {
        let response = serde_json::to_value(responder().discover()).unwrap();

        let header = &response["event"]["header"];
        assert_eq!(header["namespace"], "Alexa.Discovery");
        assert_eq!(header["name"], "Discover.Response");
        assert_eq!(header["payloadVersion"], "3");
        assert!(uuid::Uuid::parse_str(header["messageId"].as_str().unwrap()).is_ok());
        assert!(response.get("context").is_none());

        let light = &response["event"]["payload"]["endpoints"][1];
        assert_eq!(light["manufacturerName"], "SmartHome");
        assert_eq!(
            light["capabilities"][0],
            json!({
                "type": "AlexaInterface",
                "interface": "Alexa.PowerController",
                "version": "3",
                "properties": {
                    "supported": [{"name": "powerState"}],
                    "proactivelyReported": true,
                    "retrievable": true
                }
            })
        );
    }
}
