//! Per-server communication multiplexer and the sharded registry that
//! creates one on demand per remote nameserver address (C3).

mod comm_registry;
mod multiplexer;

pub use comm_registry::{RegistryConfig, RegistryError, ServerCommRegistry};
pub use multiplexer::{ConnectFn, MultiplexError, PendingRequest, ServerMultiplexer};
