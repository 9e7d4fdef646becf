use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use strum::Display;
use strum::EnumString;

use crate::catalog::ShadowKey;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureScale {
    Celsius,
    Fahrenheit,
    Kelvin,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermostatMode {
    Auto,
    Cool,
    Heat,
    Eco,
    Off,
    Custom,
}

/// A partial shadow state. Absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub power: Option<bool>,

    pub temperature: Option<f64>,

    pub scale: Option<TemperatureScale>,

    pub mode: Option<ThermostatMode>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Keys present in this patch, in wire order
    pub fn keys(&self) -> Vec<ShadowKey> {
        let mut keys = Vec::new();
        if self.power.is_some() {
            keys.push(ShadowKey::Power);
        }
        if self.temperature.is_some() {
            keys.push(ShadowKey::TemperatureValue);
        }
        if self.scale.is_some() {
            keys.push(ShadowKey::TemperatureScale);
        }
        if self.mode.is_some() {
            keys.push(ShadowKey::Mode);
        }
        keys
    }

    /// Set one key from an untyped shadow value.
    ///
    /// Fails when the value does not have the type the key requires; the
    /// patch is left unchanged in that case.
    pub fn insert(&mut self, key: ShadowKey, value: &Value) -> Result<(), serde_json::Error> {
        match key {
            ShadowKey::Power => self.power = Some(bool::deserialize(value)?),
            ShadowKey::TemperatureValue => self.temperature = Some(f64::deserialize(value)?),
            ShadowKey::TemperatureScale => {
                self.scale = Some(TemperatureScale::deserialize(value)?)
            }
            ShadowKey::Mode => self.mode = Some(ThermostatMode::deserialize(value)?),
        }
        Ok(())
    }

    /// Render as the JSON object the shadow store merges.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(power) = self.power {
            map.insert(ShadowKey::Power.to_string(), Value::Bool(power));
        }
        if let Some(temperature) = self.temperature {
            map.insert(ShadowKey::TemperatureValue.to_string(), Value::from(temperature));
        }
        if let Some(scale) = self.scale {
            map.insert(
                ShadowKey::TemperatureScale.to_string(),
                Value::String(scale.to_string()),
            );
        }
        if let Some(mode) = self.mode {
            map.insert(ShadowKey::Mode.to_string(), Value::String(mode.to_string()));
        }
        map
    }
}

/// Patch for `state.desired`. Only the directive translator builds these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredPatch(StatePatch);

impl DesiredPatch {
    pub fn power(on: bool) -> Self {
        Self(StatePatch {
            power: Some(on),
            ..Default::default()
        })
    }

    pub fn setpoint(value: f64, scale: TemperatureScale) -> Self {
        Self(StatePatch {
            temperature: Some(value),
            scale: Some(scale),
            ..Default::default()
        })
    }

    pub fn mode(mode: ThermostatMode) -> Self {
        Self(StatePatch {
            mode: Some(mode),
            ..Default::default()
        })
    }

    pub fn state(&self) -> &StatePatch {
        &self.0
    }
}

/// Patch for `state.reported`. Only the reconciler builds these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportedPatch(StatePatch);

impl ReportedPatch {
    /// Report exactly the keys that were applied.
    pub fn mirror(applied: StatePatch) -> Self {
        Self(applied)
    }

    pub fn state(&self) -> &StatePatch {
        &self.0
    }
}
