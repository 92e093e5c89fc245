//! The iterative resolution engine (C4): the query entry point that walks
//! the DNS namespace from the best-known delegation toward an answer,
//! folding responses back into the cache.

mod error;
mod iterative;

pub use error::{Result, ResolverError};
pub use iterative::IterativeResolver;
