//! The [`Service`] trait — how a type teaches the registry to build it.

use std::any::Any;

use crate::descriptor::{Scope, ServiceDescriptor};
use crate::error::RegistryResult;
use crate::registry::ServiceRegistry;

/// Trait for types registrable by class.
///
/// Implementors declare how to construct themselves from the registry by
/// providing [`create`](Service::create); dependencies are resolved through
/// the registry reference during construction. The default
/// [`descriptor`](Service::descriptor) advertises the implementation under its
/// own type only — override it to advertise trait contracts or adjust the
/// selection rank:
///
/// ```rust,ignore
/// impl Service for FileGreeter {
///     fn create(registry: &ServiceRegistry) -> RegistryResult<Self> {
///         Ok(FileGreeter { clock: registry.get_service::<dyn Clock>()? })
///     }
///
///     fn descriptor() -> ServiceDescriptor {
///         ServiceDescriptor::builder::<Self>()
///             .contract::<dyn Greeter>(|arc| arc)
///             .build()
///     }
/// }
/// ```
pub trait Service: Any + Send + Sync + Sized {
    /// Constructs the instance. Called by the registry according to the
    /// descriptor's [`Scope`]: once for `Singleton`, per lookup otherwise.
    fn create(registry: &ServiceRegistry) -> RegistryResult<Self>;

    /// Caching policy for this implementation.
    fn scope() -> Scope {
        Scope::Singleton
    }

    /// Produces the descriptor registered when this type is added by class.
    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::builder::<Self>().build()
    }
}
