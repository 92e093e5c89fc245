use derive_more::{Display, Error, From};

use crate::registry::{MultiplexError, RegistryError};

/// Internal, typed failure reasons. Every variant collapses to an empty
/// answer slice at the `query_lookup` boundary; callers never see this
/// type, but keeping it typed internally means no transport or registry
/// failure is ever swallowed by a panic, and tests can assert *why* a
/// resolution came back empty.
#[derive(Debug, Display, From, Error)]
pub enum ResolverError {
    Registry(RegistryError),
    Multiplex(MultiplexError),
    /// Depth cap (label count of the original name) exceeded.
    RecursionLimit,
    /// No usable nameserver remained at the current delegation: every NS
    /// either had no cached glue or failed to answer. Also covers a
    /// `bestNS` entry with no parseable NS records, which cannot happen
    /// once the root is bootstrapped but is modeled as an error rather
    /// than a panic so a corrupted cache degrades safely.
    NoDelegation,
}

pub type Result<T> = std::result::Result<T, ResolverError>;
