//! Service descriptors — metadata plus a factory/disposal pair.
//!
//! A [`ServiceDescriptor`] tells the registry how to produce (and later tear
//! down) one service: the implementation identity, the contracts it is
//! reachable through, its caching [`Scope`], a selection rank, and the two
//! functions. Descriptors are immutable once bound.
//!
//! # Type erasure
//!
//! The registry stores every live instance as a [`ServiceObject`] — an
//! `Arc<dyn Any + Send + Sync>` holding the concrete `Arc<T>`. Each advertised
//! contract carries a [`ContractBinding`] whose cast closure downcasts the
//! erased value back to `Arc<T>`, coerces it to `Arc<C>` for the contract, and
//! re-boxes it for the typed accessor to unwrap.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::contract::{ContractId, ImplType};
use crate::error::RegistryResult;
use crate::registry::ServiceRegistry;
use crate::service::Service;

/// Type-erased live instance, as produced by factories and stored by the
/// registry. The erased value is the concrete `Arc<T>`.
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Creation function: a contextual factory producing an erased instance.
/// Receives the registry so dependencies can be resolved during construction.
pub type CreateFn =
    Box<dyn Fn(&ServiceRegistry) -> RegistryResult<ServiceObject> + Send + Sync>;

/// Disposal function, invoked for cached instances on registry shutdown or
/// when a bound descriptor is removed.
pub type DisposeFn = Box<dyn Fn(ServiceObject) -> RegistryResult<()> + Send + Sync>;

// =============================================================================
// Scope
// =============================================================================

/// Instance caching policy for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One instance per registry, created on first lookup and cached.
    #[default]
    Singleton,
    /// A fresh instance on every lookup; never cached and never disposed by
    /// the registry.
    PerLookup,
}

// =============================================================================
// ContractBinding
// =============================================================================

/// One advertised contract plus the cast from the erased concrete instance to
/// that contract's `Arc`.
pub struct ContractBinding {
    id: ContractId,
    name: &'static str,
    cast: Box<dyn Fn(&ServiceObject) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>,
}

impl ContractBinding {
    /// Binds contract `C` for implementation `T` through the given coercion.
    ///
    /// The cast is a plain fn pointer (`|arc| arc` for any `C` that `T`
    /// implements); unsizing happens at the return position.
    pub fn of<T, C>(cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        T: Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
    {
        Self {
            id: ContractId::of::<C>(),
            name: std::any::type_name::<C>(),
            cast: Box::new(move |object| {
                let concrete = object.clone().downcast::<T>().ok()?;
                Some(Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// The contract's identity.
    pub fn id(&self) -> ContractId {
        self.id
    }

    /// The contract's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn cast(&self, object: &ServiceObject) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cast)(object)
    }
}

impl fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ServiceDescriptor
// =============================================================================

/// Metadata and factory/disposal pair for one registrable service.
///
/// A descriptor with an **empty** contract set is never returned by
/// contract-based lookups; it remains visible only through
/// [`ServiceRegistry::descriptors`](crate::registry::ServiceRegistry::descriptors).
pub struct ServiceDescriptor {
    impl_type: ImplType,
    contracts: Vec<ContractBinding>,
    scope: Scope,
    rank: i32,
    create: CreateFn,
    dispose: DisposeFn,
}

impl ServiceDescriptor {
    /// Starts a builder for service type `T`, pre-advertising `T` under its
    /// own type.
    pub fn builder<T: Service>() -> DescriptorBuilder<T> {
        DescriptorBuilder::new()
    }

    /// Builds a descriptor from raw parts, with an **empty** contract set.
    ///
    /// The result is reachable through the registry's bookkeeping enumeration
    /// only; use [`builder`](Self::builder) when the service should be
    /// resolvable by contract.
    pub fn from_parts(
        impl_type: ImplType,
        scope: Scope,
        create: CreateFn,
        dispose: DisposeFn,
    ) -> Self {
        Self {
            impl_type,
            contracts: Vec::new(),
            scope,
            rank: 0,
            create,
            dispose,
        }
    }

    /// Returns this descriptor with its rank replaced.
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    /// The implementation identity.
    pub fn impl_type(&self) -> ImplType {
        self.impl_type
    }

    /// The caching policy.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The selection rank. Higher ranks win contract lookups.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Number of advertised contracts.
    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }

    /// Iterates the advertised contract identities.
    pub fn contract_ids(&self) -> impl Iterator<Item = ContractId> + '_ {
        self.contracts.iter().map(ContractBinding::id)
    }

    /// Iterates the advertised contract names.
    pub fn contract_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.contracts.iter().map(ContractBinding::name)
    }

    /// Returns `true` if the descriptor advertises the given contract.
    pub fn has_contract(&self, id: ContractId) -> bool {
        self.contracts.iter().any(|c| c.id() == id)
    }

    /// Invokes the creation function.
    pub fn instantiate(&self, registry: &ServiceRegistry) -> RegistryResult<ServiceObject> {
        (self.create)(registry)
    }

    /// Invokes the disposal function on `object`.
    pub fn dispose(&self, object: ServiceObject) -> RegistryResult<()> {
        (self.dispose)(object)
    }

    pub(crate) fn binding_for(&self, id: ContractId) -> Option<&ContractBinding> {
        self.contracts.iter().find(|c| c.id() == id)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("impl_type", &self.impl_type)
            .field("contracts", &self.contracts)
            .field("scope", &self.scope)
            .field("rank", &self.rank)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// DescriptorBuilder
// =============================================================================

/// Builder assembling a [`ServiceDescriptor`] for a [`Service`] type.
///
/// Seeded with the self contract, the type's declared scope, rank 0, and a
/// creation function delegating to [`Service::create`].
pub struct DescriptorBuilder<T: Service> {
    contracts: Vec<ContractBinding>,
    scope: Scope,
    rank: i32,
    dispose: DisposeFn,
    _impl: PhantomData<fn() -> T>,
}

impl<T: Service> DescriptorBuilder<T> {
    fn new() -> Self {
        Self {
            contracts: vec![ContractBinding::of::<T, T>(|arc| arc)],
            scope: T::scope(),
            rank: 0,
            dispose: Box::new(|_| Ok(())),
            _impl: PhantomData,
        }
    }

    /// Advertises `T` under the additional contract `C`.
    ///
    /// The cast is spelled `|arc| arc`; the compiler inserts the unsizing
    /// coercion from `Arc<T>` to `Arc<C>`.
    pub fn contract<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.contracts.push(ContractBinding::of::<T, C>(cast));
        self
    }

    /// Overrides the caching policy declared by [`Service::scope`].
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the selection rank (default 0). Higher ranks win contract lookups.
    pub fn rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    /// Sets the disposal function, invoked on the cached instance when the
    /// descriptor is unbound or the registry shuts down (default: no-op).
    pub fn dispose(mut self, dispose: fn(Arc<T>) -> RegistryResult<()>) -> Self {
        self.dispose = Box::new(move |object| match object.downcast::<T>() {
            Ok(service) => dispose(service),
            Err(_) => Ok(()),
        });
        self
    }

    /// Finalizes the descriptor.
    pub fn build(self) -> ServiceDescriptor {
        ServiceDescriptor {
            impl_type: ImplType::of::<T>(),
            contracts: self.contracts,
            scope: self.scope,
            rank: self.rank,
            create: Box::new(|registry| {
                T::create(registry).map(|service| Arc::new(service) as ServiceObject)
            }),
            dispose: self.dispose,
        }
    }
}
