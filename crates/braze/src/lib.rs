//! # Braze
//!
//! A typed service registry for Rust: descriptors, contract-based lookup,
//! rank-based override selection, and atomic configuration transactions —
//! plus a registration-interception layer for suppressing instantiation of
//! selected implementation classes.
//!
//! ## Overview
//!
//! Services implement [`Service`](braze_core::Service) and are registered
//! through configuration transactions. Lookups go by contract (a concrete
//! type or a trait object); when several bindings compete, the highest rank
//! wins. The configuration service is itself a registry service, so a
//! higher-ranked replacement can interpose on the registration pipeline —
//! `braze-extras` uses exactly that to screen bare-class registrations
//! through an [`InstantiationFilter`](braze_extras::InstantiationFilter).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use braze::prelude::*;
//!
//! let registry = ServiceRegistry::new();
//! enable_instance_filtering::<DenyWidgets>(&registry)?;
//!
//! let mut config = registry.configuration_service()?.create_configuration()?;
//! config.add_active::<WidgetImpl>()?;  // suppressed by the filter
//! config.add_active::<ServiceImpl>()?; // registered normally
//! config.commit()?;
//! ```

pub use braze_core as core;
pub use braze_extras as extras;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use braze_core::{
        ClassIndex, ClassToken, Configuration, ConfigurationService, ContractId, ImplType,
        Populator, RegistryError, RegistryResult, Scope, Service, ServiceDescriptor,
        ServiceRegistry,
    };
    pub use braze_extras::{
        FilteredConfigurationService, InstantiationFilter, enable_instance_filtering,
    };
}
