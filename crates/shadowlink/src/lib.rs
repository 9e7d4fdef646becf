pub mod api;
pub mod catalog;
pub mod config;
pub mod directive;
pub mod discovery;
pub mod gateway;
pub mod reconciler;
pub mod shadow;

pub use catalog::Appliance;
pub use catalog::Catalog;
pub use config::Config;
pub use config::LogLevel;
pub use directive::DirectiveHandler;
pub use discovery::DiscoveryResponder;
pub use gateway::ActuatorGateway;
pub use gateway::HttpGateway;
pub use reconciler::Dispatcher;
pub use shadow::MemoryShadowStore;
pub use shadow::ShadowStore;
