//! Core of an iterative DNS resolver: a concurrent, sharded in-memory
//! record cache, the iterative resolution engine that drives it, and the
//! per-nameserver communication multiplexer that serializes outgoing
//! queries to a single remote server.
//!
//! Wire-format encoding/decoding, the socket layer, CLI, configuration
//! loading, and logging setup are all external collaborators and live
//! outside this crate; see each module for the boundary it owns.

pub mod cache;
pub mod context;
pub mod hasher;
pub mod protocol;
pub mod registry;
pub mod resolver;

pub use cache::{CacheConfig, CacheEntry, ShardedCache};
pub use context::ResolverContext;
pub use protocol::{Answer, DnsClass, Message, Name, Record, RecordData, RecordType, ResponseCode, SoaData};
pub use registry::{ConnectFn, MultiplexError, PendingRequest, RegistryConfig, RegistryError, ServerCommRegistry, ServerMultiplexer};
pub use resolver::{IterativeResolver, ResolverError};
