use strum::Display;
use strum::EnumString;
use strum::IntoStaticStr;

/// A key in a device shadow's `state.desired` / `state.reported` maps.
///
/// The wire names are the ones the deployed devices already use, so they are
/// terser than the Rust names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr)]
pub enum ShadowKey {
    #[strum(serialize = "light")]
    Power,
    #[strum(serialize = "value")]
    TemperatureValue,
    #[strum(serialize = "scale")]
    TemperatureScale,
    #[strum(serialize = "mode")]
    Mode,
}

impl ShadowKey {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A voice-platform interface an endpoint can advertise.
///
/// `shadow_keys` lists the desired-state keys that directives on this
/// interface write. Interfaces that are only observed (sensors, health) have
/// none.
#[derive(Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: &'static str,
    pub properties: &'static [&'static str],
    pub shadow_keys: &'static [ShadowKey],
}

pub const POWER_CONTROLLER: Interface = Interface {
    name: "Alexa.PowerController",
    properties: &["powerState"],
    shadow_keys: &[ShadowKey::Power],
};

pub const THERMOSTAT_CONTROLLER: Interface = Interface {
    name: "Alexa.ThermostatController",
    properties: &["targetSetpoint", "thermostatMode"],
    shadow_keys: &[
        ShadowKey::TemperatureValue,
        ShadowKey::TemperatureScale,
        ShadowKey::Mode,
    ],
};

pub const TEMPERATURE_SENSOR: Interface = Interface {
    name: "Alexa.TemperatureSensor",
    properties: &["temperature"],
    shadow_keys: &[],
};

/// Appended to every discovered endpoint regardless of category.
pub const ENDPOINT_HEALTH: Interface = Interface {
    name: "Alexa.EndpointHealth",
    properties: &["connectivity"],
    shadow_keys: &[],
};

/// The bare platform marker every endpoint must advertise.
pub const PLATFORM_INTERFACE: &str = "Alexa";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_key_wire_names() {
        assert_eq!(ShadowKey::Power.as_str(), "light");
        assert_eq!(ShadowKey::TemperatureValue.as_str(), "value");
        assert_eq!(ShadowKey::TemperatureScale.as_str(), "scale");
        assert_eq!(ShadowKey::Mode.as_str(), "mode");

        assert_eq!("light".parse::<ShadowKey>().unwrap(), ShadowKey::Power);
        assert!("brightness".parse::<ShadowKey>().is_err());
    }
}
