use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

use super::capability::Interface;
use super::capability::ShadowKey;
use super::capability::POWER_CONTROLLER;
use super::capability::TEMPERATURE_SENSOR;
use super::capability::THERMOSTAT_CONTROLLER;

static POWER_INTERFACES: [Interface; 1] = [POWER_CONTROLLER];
static THERMOSTAT_INTERFACES: [Interface; 2] = [THERMOSTAT_CONTROLLER, TEMPERATURE_SENSOR];

/// Capability category of an appliance.
///
/// Everything category-specific (discovery capabilities, legal shadow keys,
/// which directives apply) is derived from [`Category::interfaces`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Light,
    Thermostat,
    #[default]
    Other,
}

impl Category {
    /// Interfaces advertised by appliances of this category.
    ///
    /// Categories without a dedicated mapping fall back to simple on/off.
    pub fn interfaces(self) -> &'static [Interface] {
        match self {
            Category::Light | Category::Other => &POWER_INTERFACES,
            Category::Thermostat => &THERMOSTAT_INTERFACES,
        }
    }

    /// Shadow keys that may legally appear in this category's desired state.
    pub fn shadow_keys(self) -> impl Iterator<Item = ShadowKey> {
        self.interfaces()
            .iter()
            .flat_map(|interface| interface.shadow_keys.iter().copied())
    }

    pub fn allows(self, key: ShadowKey) -> bool {
        self.shadow_keys().any(|k| k == key)
    }

    pub fn supports_interface(self, name: &str) -> bool {
        self.interfaces().iter().any(|i| i.name == name)
    }

    pub fn display_category(self) -> &'static str {
        match self {
            Category::Light => "LIGHT",
            Category::Thermostat => "THERMOSTAT",
            Category::Other => "OTHER",
        }
    }
}

/// Legacy action names an appliance declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Action {
    TurnOn,
    TurnOff,
    SetTargetTemperature,
    IncrementTargetTemperature,
    DecrementTargetTemperature,
}

/// A controllable appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct Appliance {
    /// Endpoint id, also the shadow thing name
    pub id: String,

    pub friendly_name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub version: String,

    /// Declared actions, in declaration order
    pub actions: Vec<Action>,

    pub category: Category,

    /// Opaque details handed back to the voice platform as the endpoint cookie
    pub details: serde_json::Map<String, serde_json::Value>,

    /// Name the actuator gateway uses for this appliance: a switch name for
    /// lights, a room name for thermostats
    pub gateway_target: String,
}
