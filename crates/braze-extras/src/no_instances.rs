//! Registration interception: suppress instantiation of filtered classes.
//!
//! [`FilteredConfigurationService`] replaces the registry's default
//! configuration service by out-ranking it. Every transaction it hands out
//! screens bare-class registrations through the bound
//! [`InstantiationFilter`]; matched classes are re-registered as inert
//! descriptors that advertise no contracts and whose creation and disposal
//! functions always fail. The class stays visible to registry bookkeeping,
//! but no instance of it can ever be produced.
//!
//! ```rust,ignore
//! struct DenyWidgets;
//!
//! impl InstantiationFilter for DenyWidgets {
//!     fn matches(&self, class: &ClassToken) -> bool {
//!         class.is::<WidgetImpl>()
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! braze_extras::enable_instance_filtering::<DenyWidgets>(&registry)?;
//!
//! // Goes through the override service from here on.
//! let mut config = registry.configuration_service()?.create_configuration()?;
//! config.add_active::<WidgetImpl>()?; // suppressed
//! config.commit()?;
//! ```

use std::sync::Arc;

use tracing::debug;

use braze_core::{
    ClassToken, Configuration, ConfigurationService, ImplType, Populator, RegistryError,
    RegistryResult, Scope, Service, ServiceDescriptor, ServiceRegistry,
};

use crate::filter::InstantiationFilter;

// =============================================================================
// Inert descriptors
// =============================================================================

/// Builds the permanently non-instantiable descriptor for a matched class.
///
/// The contract set is empty, so the class cannot be resolved under any
/// contract, not even its own type. `PerLookup` keeps the registry from ever
/// caching (and later disposing) an instance. Creation and disposal fail with
/// [`RegistryError::Uninstantiable`]: reaching either function means a logic
/// error upstream, and it surfaces immediately instead of being swallowed.
fn inert_descriptor(class: &ClassToken) -> ServiceDescriptor {
    let type_name = class.impl_type().name();
    ServiceDescriptor::from_parts(
        class.impl_type(),
        Scope::PerLookup,
        Box::new(move |_| Err(RegistryError::Uninstantiable { type_name })),
        Box::new(move |_| Err(RegistryError::Uninstantiable { type_name })),
    )
}

// =============================================================================
// FilteringConfiguration
// =============================================================================

/// Transaction wrapper applying the bound filter to bare-class registrations.
///
/// Everything except [`add_active_class`](Configuration::add_active_class)
/// forwards verbatim to the wrapped transaction: no argument, return value,
/// or error is rewritten.
struct FilteringConfiguration {
    inner: Box<dyn Configuration>,
    filter: Arc<dyn InstantiationFilter>,
}

impl Configuration for FilteringConfiguration {
    fn add_active_class(&mut self, class: ClassToken) -> RegistryResult<Arc<ServiceDescriptor>> {
        if self.filter.matches(&class) {
            debug!(class = class.impl_type().name(), "suppressing registration");
            self.inner.add_descriptor(inert_descriptor(&class))
        } else {
            self.inner.add_active_class(class)
        }
    }

    fn add_descriptor(
        &mut self,
        descriptor: ServiceDescriptor,
    ) -> RegistryResult<Arc<ServiceDescriptor>> {
        self.inner.add_descriptor(descriptor)
    }

    fn unbind(&mut self, impl_type: ImplType) {
        self.inner.unbind(impl_type)
    }

    fn pending_additions(&self) -> usize {
        self.inner.pending_additions()
    }

    fn pending_removals(&self) -> usize {
        self.inner.pending_removals()
    }

    fn commit(self: Box<Self>) -> RegistryResult<()> {
        self.inner.commit()
    }
}

// =============================================================================
// FilteredConfigurationService
// =============================================================================

/// Configuration service that out-ranks the registry default and wraps its
/// transactions with instantiation filtering.
///
/// The service is stateless apart from the registry handle: every
/// [`create_configuration`](ConfigurationService::create_configuration) call
/// resolves the filter and the wrapped default anew, so concurrent callers
/// get fully independent transactions and registry changes between calls are
/// picked up.
pub struct FilteredConfigurationService {
    registry: ServiceRegistry,
}

impl FilteredConfigurationService {
    /// Self-excluding lookup of the configuration service being wrapped.
    ///
    /// Scans every binding of `dyn ConfigurationService` and takes the first
    /// whose implementation type is not this service itself. When no other
    /// binding exists the registry is mis-wired, which is fatal: retrying
    /// cannot change a static wiring defect.
    fn default_configuration_service(&self) -> RegistryResult<Arc<dyn ConfigurationService>> {
        let handles = self.registry.get_all_handles::<dyn ConfigurationService>();
        let handle = handles
            .iter()
            .find(|handle| !handle.descriptor().impl_type().is::<Self>())
            .ok_or(RegistryError::ServiceNotFound {
                contract: std::any::type_name::<dyn ConfigurationService>(),
            })?;
        handle.service()
    }
}

impl Service for FilteredConfigurationService {
    fn create(registry: &ServiceRegistry) -> RegistryResult<Self> {
        Ok(Self {
            registry: registry.clone(),
        })
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::builder::<Self>()
            .contract::<dyn ConfigurationService>(|arc| arc)
            // Out-rank the default configuration service.
            .rank(1)
            .build()
    }
}

impl ConfigurationService for FilteredConfigurationService {
    fn create_configuration(&self) -> RegistryResult<Box<dyn Configuration>> {
        let filter = self.registry.get_service::<dyn InstantiationFilter>()?;
        let inner = self.default_configuration_service()?.create_configuration()?;
        Ok(Box::new(FilteringConfiguration { inner, filter }))
    }

    fn populator(&self) -> RegistryResult<Box<dyn Populator>> {
        // Population passes straight through; pre-built descriptor sets are
        // never screened.
        self.default_configuration_service()?.populator()
    }
}

// =============================================================================
// Installation
// =============================================================================

/// Installs `F` as the instantiation filter and binds
/// [`FilteredConfigurationService`] over the default, in one committed
/// transaction.
///
/// Intended to be called once during registry bootstrap, before other
/// registrations. Afterwards,
/// [`ServiceRegistry::configuration_service`] resolves to the override.
pub fn enable_instance_filtering<F>(registry: &ServiceRegistry) -> RegistryResult<()>
where
    F: Service + InstantiationFilter,
{
    let mut config = registry.configuration_service()?.create_configuration()?;
    config.add_descriptor(
        ServiceDescriptor::builder::<F>()
            .contract::<dyn InstantiationFilter>(|arc| arc)
            .build(),
    )?;
    config.add_active::<FilteredConfigurationService>()?;
    config.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use braze_core::{ClassIndex, ContractId, DefaultConfigurationService};
    use serde_json::json;

    trait Widget: Send + Sync {}

    struct WidgetImpl;

    impl Widget for WidgetImpl {}

    impl Service for WidgetImpl {
        fn create(_registry: &ServiceRegistry) -> RegistryResult<Self> {
            Ok(WidgetImpl)
        }

        fn descriptor() -> ServiceDescriptor {
            ServiceDescriptor::builder::<Self>()
                .contract::<dyn Widget>(|arc| arc)
                .build()
        }
    }

    struct ServiceImpl;

    impl Service for ServiceImpl {
        fn create(_registry: &ServiceRegistry) -> RegistryResult<Self> {
            Ok(ServiceImpl)
        }
    }

    struct GadgetImpl;

    impl Service for GadgetImpl {
        fn create(_registry: &ServiceRegistry) -> RegistryResult<Self> {
            Ok(GadgetImpl)
        }
    }

    struct DenyWidgets;

    impl Service for DenyWidgets {
        fn create(_registry: &ServiceRegistry) -> RegistryResult<Self> {
            Ok(DenyWidgets)
        }
    }

    impl InstantiationFilter for DenyWidgets {
        fn matches(&self, class: &ClassToken) -> bool {
            class.is::<WidgetImpl>()
        }
    }

    fn filtered_registry() -> ServiceRegistry {
        let registry = ServiceRegistry::new();
        enable_instance_filtering::<DenyWidgets>(&registry).unwrap();
        registry
    }

    #[test]
    fn test_override_outranks_default() {
        let registry = filtered_registry();
        let handles = registry.get_all_handles::<dyn ConfigurationService>();
        assert_eq!(handles.len(), 2);
        assert!(
            handles[0]
                .descriptor()
                .impl_type()
                .is::<FilteredConfigurationService>()
        );
    }

    #[test]
    fn test_matched_class_becomes_inert() {
        let registry = filtered_registry();
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        let descriptor = config.add_active::<WidgetImpl>().unwrap();
        config.commit().unwrap();

        // Bound, but reachable through bookkeeping only.
        assert_eq!(descriptor.contract_count(), 0);
        assert!(
            registry
                .descriptors()
                .iter()
                .any(|d| d.impl_type().is::<WidgetImpl>() && d.contract_count() == 0)
        );

        // Not resolvable under any contract, not even its own type.
        assert!(matches!(
            registry.get_service::<WidgetImpl>(),
            Err(RegistryError::ServiceNotFound { .. })
        ));
        assert!(matches!(
            registry.get_service::<dyn Widget>(),
            Err(RegistryError::ServiceNotFound { .. })
        ));

        // The factory and disposer fail with the distinct error kind.
        assert!(matches!(
            descriptor.instantiate(&registry),
            Err(RegistryError::Uninstantiable { .. })
        ));
        assert!(matches!(
            descriptor.dispose(Arc::new(())),
            Err(RegistryError::Uninstantiable { .. })
        ));
    }

    #[test]
    fn test_unmatched_class_registers_normally() {
        let registry = filtered_registry();
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        let descriptor = config.add_active::<ServiceImpl>().unwrap();
        config.commit().unwrap();

        assert!(descriptor.has_contract(ContractId::of::<ServiceImpl>()));
        assert!(registry.get_service::<ServiceImpl>().is_ok());
    }

    #[test]
    fn test_unmatched_registration_is_byte_for_byte_delegation() {
        // Same class, registered through the wrapper and through the default
        // directly, must yield descriptors with identical shape.
        let filtered = filtered_registry();
        let mut config = filtered
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        let via_wrapper = config.add_active::<ServiceImpl>().unwrap();
        config.commit().unwrap();

        let plain = ServiceRegistry::new();
        let mut config = plain
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        let via_default = config.add_active::<ServiceImpl>().unwrap();
        config.commit().unwrap();

        assert_eq!(via_wrapper.impl_type(), via_default.impl_type());
        assert_eq!(via_wrapper.contract_count(), via_default.contract_count());
        assert_eq!(via_wrapper.scope(), via_default.scope());
        assert_eq!(via_wrapper.rank(), via_default.rank());
    }

    #[test]
    fn test_non_registration_operations_forward_verbatim() {
        let registry = filtered_registry();
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();

        config
            .add_descriptor(ServiceImpl::descriptor())
            .unwrap();
        assert_eq!(config.pending_additions(), 1);
        config.unbind(ImplType::of::<ServiceImpl>());
        assert_eq!(config.pending_removals(), 1);
        config.commit().unwrap();

        // Explicit descriptors pass through untouched even for matched types.
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        config.add_descriptor(WidgetImpl::descriptor()).unwrap();
        config.commit().unwrap();
        assert!(registry.get_service::<dyn Widget>().is_ok());
    }

    #[test]
    fn test_transactions_from_separate_calls_are_independent() {
        let registry = filtered_registry();
        let service = registry.configuration_service().unwrap();

        let mut first = service.create_configuration().unwrap();
        let second = service.create_configuration().unwrap();

        first.add_active::<ServiceImpl>().unwrap();
        assert_eq!(first.pending_additions(), 1);
        assert_eq!(second.pending_additions(), 0);

        drop(second);
        first.commit().unwrap();
        assert!(registry.get_service::<ServiceImpl>().is_ok());
    }

    #[test]
    fn test_parallel_transactions_commit_disjoint_services() {
        let registry = filtered_registry();

        let remote = registry.clone();
        let worker = std::thread::spawn(move || {
            let mut config = remote
                .configuration_service()
                .unwrap()
                .create_configuration()
                .unwrap();
            config.add_active::<ServiceImpl>().unwrap();
            config.commit().unwrap();
        });

        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        config.add_active::<GadgetImpl>().unwrap();
        config.commit().unwrap();

        worker.join().unwrap();
        assert!(registry.get_service::<ServiceImpl>().is_ok());
        assert!(registry.get_service::<GadgetImpl>().is_ok());
    }

    #[test]
    fn test_missing_filter_is_fatal() {
        let registry = ServiceRegistry::new();
        // Bind the override without any filter.
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        config.add_active::<FilteredConfigurationService>().unwrap();
        config.commit().unwrap();

        let service = registry.configuration_service().unwrap();
        assert!(matches!(
            service.create_configuration(),
            Err(RegistryError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_self_excluding_lookup_fails_without_real_default() {
        let registry = filtered_registry();
        let mut config = registry
            .configuration_service()
            .unwrap()
            .create_configuration()
            .unwrap();
        config.unbind(ImplType::of::<DefaultConfigurationService>());
        config.commit().unwrap();

        // The override is now the only configuration service bound; the
        // self-excluding lookup must fail rather than return itself.
        let service = registry.configuration_service().unwrap();
        assert!(matches!(
            service.create_configuration(),
            Err(RegistryError::ServiceNotFound { .. })
        ));
        assert!(matches!(
            service.populator(),
            Err(RegistryError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_population_bypasses_interception() {
        let registry = filtered_registry();
        let populator = registry
            .configuration_service()
            .unwrap()
            .populator()
            .unwrap();

        let index = ClassIndex::new().with::<WidgetImpl>("WidgetImpl");
        populator
            .populate(&json!(["WidgetImpl"]), &index)
            .unwrap();

        // Populated descriptors are never screened by the filter.
        assert!(registry.get_service::<dyn Widget>().is_ok());
    }
}
