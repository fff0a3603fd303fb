//! Configuration transactions and the configuration-service contract.
//!
//! A [`Configuration`] is a mutable, single-use batch of pending descriptor
//! additions and removals. Nothing is visible to the registry until
//! [`commit`](Configuration::commit), which applies the whole batch
//! atomically and consumes the transaction. Each transaction is created,
//! mutated, and committed by one logical caller; sharing a transaction
//! between threads is not a supported usage.
//!
//! [`ConfigurationService`] is itself a registry service: a fresh registry
//! binds [`DefaultConfigurationService`] under `dyn ConfigurationService` at
//! rank 0, and higher-ranked replacements can interpose on registration by
//! out-ranking it.

use std::sync::Arc;

use tracing::debug;

use crate::contract::{ClassToken, ImplType};
use crate::descriptor::ServiceDescriptor;
use crate::error::RegistryResult;
use crate::populate::{ManifestPopulator, Populator};
use crate::registry::ServiceRegistry;
use crate::service::Service;

// =============================================================================
// Configuration
// =============================================================================

/// One registration transaction against a registry.
pub trait Configuration: Send {
    /// Registers an implementation type by its class token, using the
    /// descriptor the type declares for itself.
    ///
    /// Returns the pending descriptor; it is not bound until commit.
    fn add_active_class(&mut self, class: ClassToken) -> RegistryResult<Arc<ServiceDescriptor>>;

    /// Registers a pre-built descriptor as-is.
    fn add_descriptor(
        &mut self,
        descriptor: ServiceDescriptor,
    ) -> RegistryResult<Arc<ServiceDescriptor>>;

    /// Queues removal of every bound descriptor with the given implementation
    /// identity.
    fn unbind(&mut self, impl_type: ImplType);

    /// Number of descriptors queued for addition.
    fn pending_additions(&self) -> usize;

    /// Number of implementation identities queued for removal.
    fn pending_removals(&self) -> usize;

    /// Applies all queued changes to the registry as one atomic unit and
    /// consumes the transaction.
    fn commit(self: Box<Self>) -> RegistryResult<()>;
}

impl dyn Configuration {
    /// Typed sugar over [`Configuration::add_active_class`].
    pub fn add_active<T: Service>(&mut self) -> RegistryResult<Arc<ServiceDescriptor>> {
        self.add_active_class(ClassToken::of::<T>())
    }
}

// =============================================================================
// RegistryConfiguration
// =============================================================================

/// The default transaction: buffers additions and removals, applies them on
/// commit under a single registry write lock.
pub struct RegistryConfiguration {
    registry: ServiceRegistry,
    additions: Vec<Arc<ServiceDescriptor>>,
    removals: Vec<ImplType>,
}

impl RegistryConfiguration {
    /// Opens an empty transaction against `registry`.
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry,
            additions: Vec::new(),
            removals: Vec::new(),
        }
    }
}

impl Configuration for RegistryConfiguration {
    fn add_active_class(&mut self, class: ClassToken) -> RegistryResult<Arc<ServiceDescriptor>> {
        self.add_descriptor(class.describe())
    }

    fn add_descriptor(
        &mut self,
        descriptor: ServiceDescriptor,
    ) -> RegistryResult<Arc<ServiceDescriptor>> {
        let descriptor = Arc::new(descriptor);
        self.additions.push(descriptor.clone());
        Ok(descriptor)
    }

    fn unbind(&mut self, impl_type: ImplType) {
        self.removals.push(impl_type);
    }

    fn pending_additions(&self) -> usize {
        self.additions.len()
    }

    fn pending_removals(&self) -> usize {
        self.removals.len()
    }

    fn commit(self: Box<Self>) -> RegistryResult<()> {
        debug!(
            additions = self.additions.len(),
            removals = self.removals.len(),
            "committing configuration"
        );
        self.registry.apply(self.additions, &self.removals);
        Ok(())
    }
}

// =============================================================================
// ConfigurationService
// =============================================================================

/// The configuration-service contract: hands out registration transactions
/// and the populator.
pub trait ConfigurationService: Send + Sync {
    /// Opens a new, independent transaction. Transactions from separate calls
    /// never affect each other.
    fn create_configuration(&self) -> RegistryResult<Box<dyn Configuration>>;

    /// Returns the populator used to install pre-built descriptor sets.
    fn populator(&self) -> RegistryResult<Box<dyn Populator>>;
}

/// The registry's built-in configuration service, bound at rank 0 during
/// bootstrap.
pub struct DefaultConfigurationService {
    registry: ServiceRegistry,
}

impl Service for DefaultConfigurationService {
    fn create(registry: &ServiceRegistry) -> RegistryResult<Self> {
        Ok(Self {
            registry: registry.clone(),
        })
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::builder::<Self>()
            .contract::<dyn ConfigurationService>(|arc| arc)
            .build()
    }
}

impl ConfigurationService for DefaultConfigurationService {
    fn create_configuration(&self) -> RegistryResult<Box<dyn Configuration>> {
        Ok(Box::new(RegistryConfiguration::new(self.registry.clone())))
    }

    fn populator(&self) -> RegistryResult<Box<dyn Populator>> {
        Ok(Box::new(ManifestPopulator::new(self.registry.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    struct Widget;

    impl Service for Widget {
        fn create(_registry: &ServiceRegistry) -> RegistryResult<Self> {
            Ok(Widget)
        }
    }

    #[test]
    fn test_changes_invisible_until_commit() {
        let registry = ServiceRegistry::new();
        let mut config = RegistryConfiguration::new(registry.clone());
        Configuration::add_active_class(&mut config, ClassToken::of::<Widget>()).unwrap();

        assert!(registry.get_service::<Widget>().is_err());
        assert_eq!(config.pending_additions(), 1);

        Box::new(config).commit().unwrap();
        assert!(registry.get_service::<Widget>().is_ok());
    }

    #[test]
    fn test_unbind_removes_all_matching_descriptors() {
        let registry = ServiceRegistry::new();
        let mut config: Box<dyn Configuration> =
            Box::new(RegistryConfiguration::new(registry.clone()));
        config.add_active::<Widget>().unwrap();
        config.commit().unwrap();
        assert!(registry.get_service::<Widget>().is_ok());

        let mut config: Box<dyn Configuration> =
            Box::new(RegistryConfiguration::new(registry.clone()));
        config.unbind(ImplType::of::<Widget>());
        assert_eq!(config.pending_removals(), 1);
        config.commit().unwrap();

        assert!(matches!(
            registry.get_service::<Widget>(),
            Err(RegistryError::ServiceNotFound { .. })
        ));
        assert!(
            !registry
                .descriptors()
                .iter()
                .any(|d| d.impl_type().is::<Widget>())
        );
    }

    #[test]
    fn test_transactions_are_independent() {
        let registry = ServiceRegistry::new();
        let service = registry.configuration_service().unwrap();

        let mut first = service.create_configuration().unwrap();
        let second = service.create_configuration().unwrap();

        first.add_active::<Widget>().unwrap();
        assert_eq!(first.pending_additions(), 1);
        assert_eq!(second.pending_additions(), 0);

        // Dropping one uncommitted transaction leaves the other intact.
        drop(second);
        first.commit().unwrap();
        assert!(registry.get_service::<Widget>().is_ok());
    }

    #[test]
    fn test_batch_applies_as_a_unit() {
        struct Gadget;
        impl Service for Gadget {
            fn create(_r: &ServiceRegistry) -> RegistryResult<Self> {
                Ok(Gadget)
            }
        }

        let registry = ServiceRegistry::new();
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        config.add_active::<Widget>().unwrap();
        config.add_active::<Gadget>().unwrap();
        config.commit().unwrap();

        assert!(registry.get_service::<Widget>().is_ok());
        assert!(registry.get_service::<Gadget>().is_ok());
    }
}
