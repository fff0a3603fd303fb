//! Contract and implementation identities.
//!
//! Lookups in the registry are keyed by [`ContractId`] — the `TypeId` of a
//! (possibly unsized) contract type such as `dyn Greeter`. Descriptors are
//! identified by [`ImplType`], the `TypeId` of the concrete implementation.
//! [`ClassToken`] packages an implementation type as a plain value so that
//! "register this class" stays an object-safe, non-generic call.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::descriptor::ServiceDescriptor;
use crate::service::Service;

// =============================================================================
// ContractId
// =============================================================================

/// Identity of a lookup contract.
///
/// A contract is any `'static` type a descriptor advertises itself as
/// satisfying — usually a trait object, sometimes the concrete type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId(TypeId);

impl ContractId {
    /// Returns the contract identity for `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self(TypeId::of::<C>())
    }
}

// =============================================================================
// ImplType
// =============================================================================

/// Identity of one implementation type: its `TypeId` plus its type name.
///
/// Equality and hashing use only the `TypeId`; the name rides along for
/// diagnostics.
#[derive(Debug, Clone, Copy, Eq)]
pub struct ImplType {
    type_id: TypeId,
    name: &'static str,
}

impl ImplType {
    /// Returns the identity of implementation type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The `TypeId` of the implementation.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The implementation's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this identity is the type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for ImplType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Hash for ImplType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ImplType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// ClassToken
// =============================================================================

/// Value-level handle to a registrable implementation type.
///
/// A token carries the implementation identity and a function producing that
/// type's [`ServiceDescriptor`]. Bare-class registration
/// ([`Configuration::add_active_class`](crate::config::Configuration::add_active_class))
/// and instantiation filters both operate on tokens, which keeps the
/// transaction trait object safe.
#[derive(Clone, Copy)]
pub struct ClassToken {
    impl_type: ImplType,
    describe: fn() -> ServiceDescriptor,
}

impl ClassToken {
    /// Returns the token for service type `T`.
    pub fn of<T: Service>() -> Self {
        Self {
            impl_type: ImplType::of::<T>(),
            describe: T::descriptor,
        }
    }

    /// The implementation identity this token stands for.
    pub fn impl_type(&self) -> ImplType {
        self.impl_type
    }

    /// Returns `true` if this token stands for type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.impl_type.is::<T>()
    }

    /// Produces the descriptor the type declares for itself.
    pub fn describe(&self) -> ServiceDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for ClassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassToken")
            .field("impl_type", &self.impl_type)
            .finish()
    }
}
