//! Randomized, seeded hashing used to pick a shard for a name or a server
//! address (C1). The seed is drawn once from a cryptographic source and
//! never exposed, so an attacker cannot precompute names that collide onto
//! one shard (an algorithmic-complexity / hash-flooding attack).

use std::net::SocketAddr;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::protocol::Name;

/// FNV-1a is a fast, well-understood non-cryptographic hash; mixing in a
/// random per-process seed is what makes shard assignment unpredictable to
/// an adversary, not the choice of hash function itself.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic within one process, nondeterministic across process
/// restarts. Shared by the record cache (C2) and the server registry (C3),
/// each of which owns its own instance and seed.
#[derive(Debug)]
pub struct SeededHasher {
    seed: [u8; 8],
}

impl SeededHasher {
    /// Draws a fresh seed from the OS cryptographic RNG. Failing to obtain
    /// randomness here is the one fatal condition in the whole system:
    /// we panic rather than ever run with a predictable seed.
    pub fn new() -> Self {
        let mut seed = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut seed)
            .expect("failed to obtain cryptographic randomness for shard hash seed");
        SeededHasher { seed }
    }

    pub fn hash_name(&self, name: &Name) -> u32 {
        self.hash_str(name.as_str())
    }

    pub fn hash_server(&self, addr: &SocketAddr) -> u32 {
        self.hash_str(&addr.to_string())
    }

    fn hash_str(&self, input: &str) -> u32 {
        let lowered = input.to_ascii_lowercase();
        let mut bytes = Vec::with_capacity(lowered.len() + self.seed.len());
        bytes.extend_from_slice(lowered.as_bytes());
        bytes.extend_from_slice(&self.seed);
        fnv1a_32(&bytes)
    }
}

impl Default for SeededHasher {
    fn default() -> Self {
        Self::new()
    }
}
