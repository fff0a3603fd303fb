//! Declarative population of a registry from a JSON service manifest.
//!
//! Population is a bootstrapping path for installing pre-built descriptor
//! sets: a manifest names implementation types, a [`ClassIndex`] resolves
//! those names to class tokens, and everything is bound in one committed
//! transaction. The default populator works through a plain
//! [`RegistryConfiguration`], not through whichever configuration service is
//! currently best-ranked, so registration interceptors never see it.
//!
//! # Manifest format
//!
//! A JSON array whose entries are either a bare type name or an object with
//! an optional rank override:
//!
//! ```json
//! ["Clock", {"type": "FileGreeter", "rank": 2}]
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Configuration, RegistryConfiguration};
use crate::contract::ClassToken;
use crate::descriptor::ServiceDescriptor;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::ServiceRegistry;
use crate::service::Service;

// =============================================================================
// Populator
// =============================================================================

/// Installs pre-built descriptor sets from a manifest in a single transaction.
pub trait Populator: Send {
    /// Resolves `manifest` against `index` and binds every entry atomically.
    ///
    /// Returns the bound descriptors in manifest order. When any entry fails
    /// to resolve, nothing is applied.
    fn populate(
        &self,
        manifest: &Value,
        index: &ClassIndex,
    ) -> RegistryResult<Vec<Arc<ServiceDescriptor>>>;
}

// =============================================================================
// ClassIndex
// =============================================================================

/// Name → class-token table a manifest is resolved against.
#[derive(Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassToken>,
}

impl ClassIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers service type `T` under `name`, replacing any previous entry.
    pub fn with<T: Service>(mut self, name: impl Into<String>) -> Self {
        self.classes.insert(name.into(), ClassToken::of::<T>());
        self
    }

    /// Looks up the token registered under `name`.
    pub fn get(&self, name: &str) -> Option<&ClassToken> {
        self.classes.get(name)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no names are registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

// =============================================================================
// ManifestPopulator
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Name(String),
    Detailed {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        rank: Option<i32>,
    },
}

impl ManifestEntry {
    fn into_parts(self) -> (String, Option<i32>) {
        match self {
            ManifestEntry::Name(name) => (name, None),
            ManifestEntry::Detailed { type_name, rank } => (type_name, rank),
        }
    }
}

/// The default populator, handed out by the default configuration service.
pub struct ManifestPopulator {
    registry: ServiceRegistry,
}

impl ManifestPopulator {
    /// Creates a populator bound to `registry`.
    pub fn new(registry: ServiceRegistry) -> Self {
        Self { registry }
    }
}

impl Populator for ManifestPopulator {
    fn populate(
        &self,
        manifest: &Value,
        index: &ClassIndex,
    ) -> RegistryResult<Vec<Arc<ServiceDescriptor>>> {
        let entries: Vec<ManifestEntry> = serde_json::from_value(manifest.clone())
            .map_err(|error| RegistryError::Manifest(error.to_string()))?;

        let mut config = RegistryConfiguration::new(self.registry.clone());
        let mut bound = Vec::with_capacity(entries.len());
        for entry in entries {
            let (name, rank) = entry.into_parts();
            let class = index
                .get(&name)
                .ok_or(RegistryError::UnknownType { name: name.clone() })?;
            let descriptor = match rank {
                Some(rank) => class.describe().with_rank(rank),
                None => class.describe(),
            };
            bound.push(config.add_descriptor(descriptor)?);
        }
        Box::new(config).commit()?;
        debug!(count = bound.len(), "populated registry from manifest");
        Ok(bound)
    }
}
