//! Unified error types for the Braze core crate.
//!
//! Every failure in this crate is a wiring or programmer error, not an
//! expected runtime condition. Nothing here is retried or recovered locally;
//! errors propagate to the caller unchanged.

use thiserror::Error;

/// Errors raised by registry lookups, configuration transactions, and
/// population.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// No descriptor is bound for the requested contract.
    #[error("no service is bound for contract '{contract}'")]
    ServiceNotFound {
        /// Name of the contract that had no binding.
        contract: &'static str,
    },

    /// The implementation was registered as permanently non-instantiable.
    ///
    /// Raised by the creation and disposal functions of descriptors built by
    /// the instantiation-filtering layer. Reaching this error means some code
    /// path tried to use a class the policy marked off-limits.
    #[error("'{type_name}' is registered without contracts and can never be instantiated")]
    Uninstantiable {
        /// Name of the non-instantiable implementation type.
        type_name: &'static str,
    },

    /// A contract cast failed against the stored instance.
    ///
    /// Indicates a corrupted contract binding; cannot happen for descriptors
    /// assembled through [`DescriptorBuilder`](crate::descriptor::DescriptorBuilder).
    #[error("contract '{contract}' is not satisfiable by implementation '{implementation}'")]
    ContractMismatch {
        /// Name of the requested contract.
        contract: &'static str,
        /// Name of the implementation that failed the cast.
        implementation: &'static str,
    },

    /// A manifest entry names a type absent from the class index.
    #[error("manifest references unknown type '{name}'")]
    UnknownType {
        /// The unresolved type name.
        name: String,
    },

    /// The service manifest could not be parsed.
    #[error("invalid service manifest: {0}")]
    Manifest(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
