//! # Braze Extras
//!
//! Extensions layered on top of the `braze-core` registry.
//!
//! The crate currently provides registration interception: a replacement
//! configuration service that out-ranks the registry default and screens
//! bare-class registrations through a pluggable [`InstantiationFilter`].
//! Matched classes stay visible to registry bookkeeping but are re-registered
//! as permanently non-instantiable descriptors.
//!
//! See [`enable_instance_filtering`] for the one-call installation path.

pub mod filter;
pub mod no_instances;

pub use filter::InstantiationFilter;
pub use no_instances::{FilteredConfigurationService, enable_instance_filtering};
