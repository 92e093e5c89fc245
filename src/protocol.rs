//! Opaque value types exchanged between the cache, the resolver, and the
//! per-server multiplexer. Wire-format encoding/decoding and record-type
//! registries are a transport-layer concern and are not implemented here.
//! This module only carries the variants the core engine needs to inspect
//! (`A`, `NS`) plus a closed set of passively-cached types.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde_derive::{Deserialize, Serialize};

/// A case-insensitive domain name, always stored normalized: lowercased,
/// with at most no trailing dot (the root is the single exception,
/// represented as `"."`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(String);

impl Name {
    /// Normalizes `raw` per the cache's key rules:
    /// strip one trailing `.`, lowercase ASCII, empty becomes `"."`.
    pub fn new(raw: &str) -> Self {
        let stripped = raw.strip_suffix('.').unwrap_or(raw);
        let mut lower = stripped.to_ascii_lowercase();
        if lower.is_empty() {
            lower = ".".to_string();
        }
        Name(lower)
    }

    pub fn root() -> Self {
        Name(".".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    /// Number of labels in the name (the root has zero).
    pub fn label_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.split('.').count()
        }
    }

    /// This name and every ancestor obtained by stripping the leftmost
    /// label repeatedly, ending at the root. Used by `bestNS` to walk up
    /// the namespace looking for the most specific cached delegation.
    pub fn ancestors(&self) -> Vec<Name> {
        if self.is_root() {
            return vec![Name::root()];
        }
        let labels: Vec<&str> = self.0.split('.').collect();
        let mut chain = Vec::with_capacity(labels.len() + 1);
        for i in 0..labels.len() {
            chain.push(Name(labels[i..].join(".")));
        }
        chain.push(Name::root());
        chain
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(raw: &str) -> Self {
        Name::new(raw)
    }
}

/// Closed enumeration of record types the core understands. Only `A` and
/// `NS` are interpreted by the resolution algorithm; the rest are cached
/// passively.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Ns,
    Cname,
    Soa,
    Ptr,
    Unknown(u16),
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Ns => write!(f, "NS"),
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Soa => write!(f, "SOA"),
            RecordType::Ptr => write!(f, "PTR"),
            RecordType::Unknown(n) => write!(f, "TYPE{}", n),
        }
    }
}

/// `IN` is the only record class the core ever produces or consumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DnsClass {
    In,
}

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IN")
    }
}

/// Start-of-authority payload, carried opaquely by the cache.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SoaData {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// A sum type over record payloads. `A` and `Ns` are interpreted by the
/// resolver; everything else is stored and returned unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(Name),
    Cname(Name),
    Soa(SoaData),
    Ptr(Name),
    /// Any other record type: stored and returned as an opaque byte blob.
    Opaque { rtype: u16, bytes: Vec<u8> },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::Aaaa(_) => RecordType::Aaaa,
            RecordData::Ns(_) => RecordType::Ns,
            RecordData::Cname(_) => RecordType::Cname,
            RecordData::Soa(_) => RecordType::Soa,
            RecordData::Ptr(_) => RecordType::Ptr,
            RecordData::Opaque { rtype, .. } => RecordType::Unknown(*rtype),
        }
    }
}

/// A record as carried on the wire between the multiplexer and a remote
/// nameserver. `ttl` is the record's own advertised TTL; the core
/// intentionally ignores it in favor of a fixed ingestion TTL. It is
/// carried here only so a future caller can honor it without a data-model
/// change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: Name,
    pub rtype: RecordType,
    pub class: DnsClass,
    pub ttl: u32,
    pub data: RecordData,
}

/// The externally-returned answer form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub name: Name,
    pub rtype: RecordType,
    pub class: DnsClass,
    pub data: RecordData,
}

/// Response code on a `Message`. Not consulted by the core: SERVFAIL is
/// treated identically to an answerless referral.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Unknown(u8),
}

/// The message exchanged with a remote nameserver through a multiplexer.
/// Opaque to the core beyond its three record sections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub rescode: ResponseCode,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    pub fn empty(rescode: ResponseCode) -> Self {
        Message {
            rescode,
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }
}
