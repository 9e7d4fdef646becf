//! Configuration file parsing and structures.
//!
//! shadowlink is configured by a single TOML file loaded once at startup:
//! logging, the HTTP API listener, the shadow store connection, the actuator
//! gateway and the appliance catalog. Nothing here is reloaded at runtime.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use crate::catalog::Action;
use crate::catalog::Appliance;
use crate::catalog::Category;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub shadow: ShadowConfig,

    pub gateway: GatewayConfig,

    /// Appliance catalog; empty means the built-in household
    #[serde(default)]
    pub appliances: Vec<ApplianceConfig>,
}

#[derive(
    Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"shadowlink::shadow" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8565
}

/// HTTP API listener
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShadowBackend {
    #[default]
    Mqtt,
    Memory,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "shadowlink".to_string()
}

fn default_operation_timeout() -> u64 {
    5
}

/// Shadow store connection
#[derive(Debug, Clone, Deserialize)]
pub struct ShadowConfig {
    #[serde(default)]
    pub backend: ShadowBackend,

    /// MQTT broker hostname or IP address (mqtt backend only)
    #[serde(default)]
    pub broker: Option<String>,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Deadline for a single get/update round trip
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            backend: ShadowBackend::default(),
            broker: None,
            port: default_mqtt_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

impl ShadowConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

fn default_gateway_timeout() -> u64 {
    3
}

fn default_room() -> String {
    "home".to_string()
}

/// Actuator gateway
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://10.194.240.42:3000`
    pub base_url: String,

    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// Room used for thermostat and whole-house requests
    #[serde(default = "default_room")]
    pub room: String,
}

/// Most gateway requests a single actuation makes (thermostat mode + setpoint)
const MAX_REQUESTS_PER_ACTUATION: u32 = 2;

impl GatewayConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deadline for a whole actuation, long enough for every request it may make
    pub fn actuation_timeout(&self) -> Duration {
        self.timeout() * MAX_REQUESTS_PER_ACTUATION
    }
}

fn default_manufacturer() -> String {
    "SmartHome".to_string()
}

fn default_version() -> String {
    "1".to_string()
}

/// One `[[appliances]]` entry
#[derive(Debug, Deserialize)]
pub struct ApplianceConfig {
    pub id: String,

    pub friendly_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_version")]
    pub version: String,

    pub category: Category,

    pub actions: Vec<Action>,

    /// Switch name (lights) or room (thermostats) known to the gateway.
    /// Defaults to the appliance id for lights and the gateway room otherwise.
    #[serde(default)]
    pub gateway_target: Option<String>,

    /// Opaque details returned to the voice platform as the endpoint cookie
    #[serde(default)]
    pub cookie: toml::Table,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints serde cannot express. All problems are reported together.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.shadow.backend == ShadowBackend::Mqtt && self.shadow.broker.is_none() {
            problems.push("shadow.broker is required when shadow.backend = \"mqtt\"".to_string());
        }
        if self.shadow.operation_timeout_secs == 0 {
            problems.push("shadow.operation_timeout_secs must be greater than 0".to_string());
        }
        if self.gateway.timeout_secs == 0 {
            problems.push("gateway.timeout_secs must be greater than 0".to_string());
        }
        if !self.gateway.base_url.starts_with("http://")
            && !self.gateway.base_url.starts_with("https://")
        {
            problems.push(format!(
                "gateway.base_url must be an http(s) URL, got '{}'",
                self.gateway.base_url
            ));
        }
        for (i, appliance) in self.appliances.iter().enumerate() {
            if appliance.id.is_empty() {
                problems.push(format!("appliances[{}].id must not be empty", i));
            }
            if appliance.actions.is_empty() {
                problems.push(format!("appliances[{}].actions must not be empty", i));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Convert the configured appliances into catalog entries, in file order.
    pub fn appliances(&self) -> Result<Vec<Appliance>, ConfigError> {
        self.appliances
            .iter()
            .map(|entry| entry.to_appliance(&self.gateway.room))
            .collect()
    }
}

impl ApplianceConfig {
    fn to_appliance(&self, room: &str) -> Result<Appliance, ConfigError> {
        let gateway_target = match (&self.gateway_target, self.category) {
            (Some(target), _) => target.clone(),
            (None, Category::Thermostat) => room.to_string(),
            (None, _) => self.id.clone(),
        };

        Ok(Appliance {
            id: self.id.clone(),
            friendly_name: self.friendly_name.clone(),
            description: self.description.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            version: self.version.clone(),
            actions: self.actions.clone(),
            category: self.category,
            details: self.cookie_to_json()?,
            gateway_target,
        })
    }

    /// Convert the TOML cookie table to the JSON object sent to the voice platform
    fn cookie_to_json(&self) -> Result<serde_json::Map<String, serde_json::Value>, ConfigError> {
        let json_str = serde_json::to_string(&self.cookie).map_err(ConfigError::JsonConversion)?;

        serde_json::from_str(&json_str).map_err(ConfigError::JsonConversion)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("Failed to convert config to JSON: {0}")]
    JsonConversion(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [shadow]
            backend = "memory"

            [gateway]
            base_url = "http://10.194.240.42:3000"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.api.port, 8565);
        assert_eq!(config.shadow.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.gateway.timeout(), Duration::from_secs(3));
        assert_eq!(config.gateway.actuation_timeout(), Duration::from_secs(6));
        assert_eq!(config.gateway.room, "home");
        assert!(config.appliances.is_empty());
    }

    #[test]
    fn test_parse_logging_overrides() {
        let toml = r#"
            [logging]
            level = "warn"

            [logging.overrides]
            "shadowlink::reconciler" = "debug"

            [shadow]
            backend = "memory"

            [gateway]
            base_url = "http://localhost:3000"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(
            config.logging.overrides.get("shadowlink::reconciler"),
            Some(&LogLevel::Debug)
        );
    }

    #[test]
    fn test_parse_appliances() {
        let toml = r#"
            [shadow]
            broker = "localhost"
            username = "shadowlink"

            [gateway]
            base_url = "http://localhost:3000"
            room = "upstairs"

            [[appliances]]
            id = "F1_KitchenLight"
            friendly_name = "Kitchen Light"
            model = "Smart Light"
            category = "light"
            actions = ["turnOn", "turnOff"]
            gateway_target = "switch1c"
            cookie.floor = 1

            [[appliances]]
            id = "Thermostat"
            friendly_name = "Thermostat"
            category = "thermostat"
            actions = ["setTargetTemperature", "incrementTargetTemperature"]
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.shadow.backend, ShadowBackend::Mqtt);
        assert_eq!(config.shadow.broker.as_deref(), Some("localhost"));

        let appliances = config.appliances().unwrap();
        assert_eq!(appliances.len(), 2);
        assert_eq!(appliances[0].gateway_target, "switch1c");
        assert_eq!(appliances[0].manufacturer, "SmartHome");
        assert_eq!(appliances[0].details["floor"], 1);
        assert_eq!(appliances[1].category, Category::Thermostat);
        assert_eq!(appliances[1].gateway_target, "upstairs");
    }

    #[test]
    fn test_validation_reports_all_problems() {
        let toml = r#"
            [shadow]
            operation_timeout_secs = 0

            [gateway]
            base_url = "10.194.240.42:3000"

            [[appliances]]
            id = "Lamp"
            friendly_name = "Lamp"
            category = "other"
            actions = []
        "#;

        match Config::parse(toml) {
            Err(ConfigError::Invalid(problems)) => {
                assert_eq!(problems.len(), 4);
                assert!(problems[0].contains("shadow.broker"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let toml = r#"
            [gateway]
            base_url = "http://localhost:3000"

            [[appliances]]
            id = "Fan"
            friendly_name = "Fan"
            category = "fan"
            actions = ["turnOn"]
        "#;

        assert!(matches!(Config::parse(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shadowlink.toml");
        std::fs::write(
            &path,
            r#"
            [shadow]
            backend = "memory"

            [gateway]
            base_url = "http://localhost:3000"
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.shadow.backend, ShadowBackend::Memory);

        let missing = Config::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(..))));
    }
}
