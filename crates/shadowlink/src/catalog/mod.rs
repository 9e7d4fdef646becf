//! Appliance catalog.
//!
//! The catalog is built once at startup and is read-only afterwards. It is
//! the leaf every other component reads from: discovery enumerates it, the
//! directive translator validates targets against it and the reconciler uses
//! it to decide which delta keys an appliance accepts.

mod appliance;
mod builtin;
pub mod capability;

use std::collections::HashMap;

pub use appliance::Action;
pub use appliance::Appliance;
pub use appliance::Category;
pub use builtin::builtin_appliances;
pub use capability::Interface;
pub use capability::ShadowKey;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("appliance id must not be empty")]
    EmptyId,

    #[error("duplicate appliance id: {0}")]
    DuplicateId(String),

    #[error("appliance {0} declares no actions")]
    NoActions(String),
}

/// Immutable, ordered registry of appliances keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    appliances: Vec<Appliance>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, preserving the given order.
    pub fn new(appliances: Vec<Appliance>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(appliances.len());

        for (position, appliance) in appliances.iter().enumerate() {
            if appliance.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if appliance.actions.is_empty() {
                return Err(CatalogError::NoActions(appliance.id.clone()));
            }
            if index.insert(appliance.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(appliance.id.clone()));
            }
        }

        Ok(Self { appliances, index })
    }

    /// Catalog of the built-in household
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_appliances())
    }

    pub fn lookup(&self, id: &str) -> Option<&Appliance> {
        self.index.get(id).map(|&position| &self.appliances[position])
    }

    pub fn all(&self) -> &[Appliance] {
        &self.appliances
    }

    pub fn len(&self) -> usize {
        self.appliances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appliances.is_empty()
    }
}
