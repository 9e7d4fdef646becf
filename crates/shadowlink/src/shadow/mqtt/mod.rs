mod client;
mod store;
mod topic;

pub use client::MqttClient;
pub use client::MqttMessage;
pub use client::RumqttcClient;
pub use store::MqttShadowStore;
