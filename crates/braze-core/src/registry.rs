//! The service registry — descriptor storage and contract-indexed lookup.
//!
//! [`ServiceRegistry`] is a shared, long-lived resource. Cloning the handle is
//! cheap (`Arc` inner); all operations are synchronous, and no lock is held
//! while a service factory runs. Mutation happens only through committed
//! [`Configuration`](crate::config::Configuration) transactions, which apply
//! their batched changes under a single write lock.
//!
//! # Selection
//!
//! When several descriptors are bound to one contract, lookup picks the
//! highest rank; ties go to the earliest registration. Dependency cycles
//! between singleton factories are not supported.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ConfigurationService, DefaultConfigurationService};
use crate::contract::{ContractId, ImplType};
use crate::descriptor::{Scope, ServiceDescriptor, ServiceObject};
use crate::error::{RegistryError, RegistryResult};
use crate::service::Service;

// =============================================================================
// ServiceEntry (internal)
// =============================================================================

/// One bound descriptor plus its singleton cache slot.
pub(crate) struct ServiceEntry {
    id: u64,
    descriptor: Arc<ServiceDescriptor>,
    /// Populated lazily for `Scope::Singleton`; `PerLookup` never caches.
    /// Never locked across the factory call, so concurrent first lookups may
    /// each run the factory; the first instance stored wins and the losers'
    /// instances are dropped without disposal.
    cached: Mutex<Option<ServiceObject>>,
}

impl ServiceEntry {
    fn instance(&self, registry: &ServiceRegistry) -> RegistryResult<ServiceObject> {
        match self.descriptor.scope() {
            Scope::PerLookup => self.descriptor.instantiate(registry),
            Scope::Singleton => {
                if let Some(object) = self.cached.lock().clone() {
                    return Ok(object);
                }
                let object = self.descriptor.instantiate(registry)?;
                let mut cached = self.cached.lock();
                if let Some(existing) = cached.as_ref() {
                    return Ok(existing.clone());
                }
                *cached = Some(object.clone());
                Ok(object)
            }
        }
    }

    fn take_cached(&self) -> Option<ServiceObject> {
        self.cached.lock().take()
    }
}

struct RegistryState {
    /// Bind order; also the bookkeeping enumeration order.
    entries: Vec<Arc<ServiceEntry>>,
    by_contract: HashMap<ContractId, Vec<Arc<ServiceEntry>>>,
}

struct RegistryInner {
    next_id: AtomicU64,
    state: RwLock<RegistryState>,
}

// =============================================================================
// ServiceRegistry
// =============================================================================

/// Shared handle to one service registry.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// Creates a registry with the default configuration service bound under
    /// `dyn ConfigurationService` at rank 0.
    pub fn new() -> Self {
        let registry = Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(0),
                state: RwLock::new(RegistryState {
                    entries: Vec::new(),
                    by_contract: HashMap::new(),
                }),
            }),
        };
        registry.apply(
            vec![Arc::new(DefaultConfigurationService::descriptor())],
            &[],
        );
        registry
    }

    /// Resolves a single instance of contract `C`.
    ///
    /// The highest-ranked binding wins; ties go to the earliest registration.
    /// Fails with [`RegistryError::ServiceNotFound`] when nothing advertises
    /// the contract — including descriptors whose contract set is empty.
    pub fn get_service<C>(&self) -> RegistryResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let entry = self
            .select(ContractId::of::<C>())
            .ok_or(RegistryError::ServiceNotFound {
                contract: std::any::type_name::<C>(),
            })?;
        self.materialize::<C>(&entry)
    }

    /// Returns a handle for every binding of contract `C`, best rank first.
    ///
    /// Each handle exposes the descriptor (implementation identity) without
    /// instantiating anything; the instance is materialized on demand through
    /// [`ServiceHandle::service`].
    pub fn get_all_handles<C>(&self) -> Vec<ServiceHandle<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mut entries = {
            let state = self.inner.state.read();
            state
                .by_contract
                .get(&ContractId::of::<C>())
                .cloned()
                .unwrap_or_default()
        };
        entries.sort_by(|a, b| {
            b.descriptor
                .rank()
                .cmp(&a.descriptor.rank())
                .then(a.id.cmp(&b.id))
        });
        entries
            .into_iter()
            .map(|entry| ServiceHandle {
                registry: self.clone(),
                entry,
                _contract: PhantomData,
            })
            .collect()
    }

    /// Enumerates every bound descriptor in bind order.
    ///
    /// This is the bookkeeping path: descriptors with an empty contract set
    /// appear here even though no contract lookup can reach them.
    pub fn descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        let state = self.inner.state.read();
        state
            .entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Resolves the currently best-ranked configuration service.
    pub fn configuration_service(&self) -> RegistryResult<Arc<dyn ConfigurationService>> {
        self.get_service::<dyn ConfigurationService>()
    }

    /// Disposes every cached singleton in reverse bind order.
    ///
    /// Descriptors stay bound; only the cached instances are torn down.
    pub fn shutdown(&self) {
        let entries = {
            let state = self.inner.state.read();
            state.entries.clone()
        };
        for entry in entries.iter().rev() {
            self.dispose_cached(entry);
        }
        info!("registry shut down");
    }

    // ─── Internal ────────────────────────────────────────────────────────────

    /// Applies one committed transaction: removals first, then additions.
    pub(crate) fn apply(&self, additions: Vec<Arc<ServiceDescriptor>>, removals: &[ImplType]) {
        let mut dropped: Vec<Arc<ServiceEntry>> = Vec::new();
        {
            let mut state = self.inner.state.write();

            if !removals.is_empty() {
                let removed = |entry: &Arc<ServiceEntry>| {
                    removals.contains(&entry.descriptor.impl_type())
                };
                dropped = state
                    .entries
                    .iter()
                    .filter(|e| removed(*e))
                    .cloned()
                    .collect();
                state.entries.retain(|e| !removed(e));
                for slots in state.by_contract.values_mut() {
                    slots.retain(|e| !removed(e));
                }
                state.by_contract.retain(|_, slots| !slots.is_empty());
            }

            for descriptor in additions {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let entry = Arc::new(ServiceEntry {
                    id,
                    descriptor: descriptor.clone(),
                    cached: Mutex::new(None),
                });
                for contract in descriptor.contract_ids() {
                    state
                        .by_contract
                        .entry(contract)
                        .or_default()
                        .push(entry.clone());
                }
                debug!(
                    service = %descriptor.impl_type(),
                    contracts = ?descriptor.contract_names().collect::<Vec<_>>(),
                    rank = descriptor.rank(),
                    "bound descriptor"
                );
                state.entries.push(entry);
            }
        }

        // Dispose outside the write lock.
        for entry in dropped {
            debug!(service = %entry.descriptor.impl_type(), "unbound descriptor");
            self.dispose_cached(&entry);
        }
    }

    fn dispose_cached(&self, entry: &ServiceEntry) {
        if let Some(object) = entry.take_cached() {
            if let Err(error) = entry.descriptor.dispose(object) {
                warn!(
                    service = %entry.descriptor.impl_type(),
                    %error,
                    "disposal failed"
                );
            }
        }
    }

    fn select(&self, contract: ContractId) -> Option<Arc<ServiceEntry>> {
        let state = self.inner.state.read();
        state
            .by_contract
            .get(&contract)?
            .iter()
            .max_by(|a, b| {
                a.descriptor
                    .rank()
                    .cmp(&b.descriptor.rank())
                    .then(b.id.cmp(&a.id))
            })
            .cloned()
    }

    fn materialize<C>(&self, entry: &ServiceEntry) -> RegistryResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mismatch = || RegistryError::ContractMismatch {
            contract: std::any::type_name::<C>(),
            implementation: entry.descriptor.impl_type().name(),
        };
        let object = entry.instance(self)?;
        let binding = entry
            .descriptor
            .binding_for(ContractId::of::<C>())
            .ok_or_else(mismatch)?;
        let boxed = binding.cast(&object).ok_or_else(mismatch)?;
        boxed
            .downcast::<Arc<C>>()
            .map(|arc| *arc)
            .map_err(|_| mismatch())
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ServiceRegistry")
            .field("descriptors", &state.entries.len())
            .field("contracts", &state.by_contract.len())
            .finish()
    }
}

// =============================================================================
// ServiceHandle
// =============================================================================

/// One candidate binding for a contract, as returned by
/// [`ServiceRegistry::get_all_handles`].
pub struct ServiceHandle<C: ?Sized> {
    registry: ServiceRegistry,
    entry: Arc<ServiceEntry>,
    _contract: PhantomData<fn() -> Box<C>>,
}

impl<C> ServiceHandle<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    /// The bound descriptor, exposing the implementation identity.
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.entry.descriptor
    }

    /// Materializes the live service instance, honoring the descriptor scope.
    pub fn service(&self) -> RegistryResult<Arc<C>> {
        self.registry.materialize(&self.entry)
    }
}

impl<C: ?Sized> std::fmt::Debug for ServiceHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("impl_type", &self.entry.descriptor.impl_type())
            .finish_non_exhaustive()
    }
}
