//! # Braze Core
//!
//! The core of the Braze service registry: descriptors, contract-indexed
//! lookup, and atomic configuration transactions.
//!
//! ## Model
//!
//! - **Descriptors** ([`ServiceDescriptor`]) describe one registrable unit:
//!   implementation identity, advertised contracts, caching scope, selection
//!   rank, and a creation/disposal function pair.
//! - **The registry** ([`ServiceRegistry`]) stores bound descriptors and
//!   resolves instances by contract. Rank decides among competing bindings.
//! - **Transactions** ([`Configuration`]) batch descriptor additions and
//!   removals; a commit applies the batch atomically. Transactions are handed
//!   out by the [`ConfigurationService`] bound in the registry itself, which
//!   is how higher-ranked replacements can interpose on registration.
//! - **Population** ([`Populator`]) installs pre-built descriptor sets from a
//!   JSON manifest in one transaction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use braze_core::{Service, ServiceDescriptor, ServiceRegistry};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct PlainGreeter;
//!
//! impl Greeter for PlainGreeter {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! impl Service for PlainGreeter {
//!     fn create(_registry: &ServiceRegistry) -> braze_core::RegistryResult<Self> {
//!         Ok(PlainGreeter)
//!     }
//!
//!     fn descriptor() -> ServiceDescriptor {
//!         ServiceDescriptor::builder::<Self>()
//!             .contract::<dyn Greeter>(|arc| arc)
//!             .build()
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! let mut config = registry
//!     .configuration_service()?
//!     .create_configuration()?;
//! config.add_active::<PlainGreeter>()?;
//! config.commit()?;
//!
//! let greeter = registry.get_service::<dyn Greeter>()?;
//! assert_eq!(greeter.greet(), "hello");
//! ```

pub mod config;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod populate;
pub mod registry;
pub mod service;

pub use config::{
    Configuration, ConfigurationService, DefaultConfigurationService, RegistryConfiguration,
};
pub use contract::{ClassToken, ContractId, ImplType};
pub use descriptor::{
    ContractBinding, CreateFn, DescriptorBuilder, DisposeFn, Scope, ServiceDescriptor,
    ServiceObject,
};
pub use error::{RegistryError, RegistryResult};
pub use populate::{ClassIndex, ManifestPopulator, Populator};
pub use registry::{ServiceHandle, ServiceRegistry};
pub use service::Service;
