use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use crate::cache::ShardedCache;
use crate::protocol::{Answer, DnsClass, Name, Record, RecordData, RecordType};
use crate::registry::ServerCommRegistry;

use super::error::{Result, ResolverError};

/// Per-NS response wait.
const NS_TIMEOUT: Duration = Duration::from_secs(3);

/// The core ignores each record's own advertised TTL and ingests every
/// response with this fixed, deliberately oversized expiry. A production
/// build should thread the record's own TTL through instead; the change
/// is local to `ingest` since `CacheEntry` already carries `expires` per
/// entry.
const INGEST_TTL_SECS: i64 = 365 * 24 * 3600;

/// Starting point for a query: consults the cache, walks delegations using
/// the cache and the server registry, and folds responses back into the
/// cache.
pub struct IterativeResolver {
    cache: Arc<ShardedCache>,
    registry: Arc<ServerCommRegistry>,
}

impl IterativeResolver {
    pub fn new(cache: Arc<ShardedCache>, registry: Arc<ServerCommRegistry>) -> Self {
        IterativeResolver { cache, registry }
    }

    /// Empty slice is the sole failure indicator the caller sees; the core
    /// does not distinguish NXDOMAIN from SERVFAIL from timeout. Internally
    /// this delegates to `resolve`, which carries the typed reason for any
    /// failure, and records the recursion-depth histogram exactly once
    /// regardless of which exit path was taken.
    #[tracing::instrument(skip(self))]
    pub async fn query_lookup(&self, name: &str, qtype: RecordType) -> Vec<Answer> {
        let parsed = Name::new(name);
        let mut depth_reached = 0usize;
        let outcome = self.resolve(&parsed, qtype, &mut depth_reached).await;
        metrics::histogram!("resolver_recursion_depth", depth_reached as f64);
        match outcome {
            Ok(answers) => answers,
            Err(err) => {
                warn!(%parsed, %qtype, %err, "query_lookup failed, returning no answers");
                Vec::new()
            }
        }
    }

    /// Typed internal resolution path. Writes the recursion depth reached
    /// into `depth_reached` on every exit, so `query_lookup` can record the
    /// histogram once regardless of which exit was taken.
    async fn resolve(&self, name: &Name, qtype: RecordType, depth_reached: &mut usize) -> Result<Vec<Answer>> {
        // CNAME queries are not serviced directly; CNAMEs are only
        // followed as a side effect of other lookups.
        if matches!(qtype, RecordType::Cname) {
            return Err(ResolverError::NoDelegation);
        }

        // Defensive loop-break: each iteration should move strictly deeper
        // in the delegation chain, so the depth cap is rarely reached in
        // correct operation.
        let depth_cap = name.label_count();

        'depths: for attempt in 0..=depth_cap {
            *depth_reached = attempt;

            if let Some(entry) = self.cache.lookup(name.as_str(), qtype) {
                debug!(%name, %qtype, "cache hit");
                return Ok(to_answers(name, qtype, entry.data));
            }

            let ns_entry = self.cache.best_ns(name.as_str());
            let mut last_err: Option<ResolverError> = None;

            for rdata in &ns_entry.data {
                let ns_name = match rdata {
                    RecordData::Ns(n) => n.clone(),
                    _ => continue,
                };

                let Some(glue) = self.cache.lookup(ns_name.as_str(), RecordType::A) else {
                    warn!(ns = %ns_name, "missing glue A record, giving up on this NS");
                    last_err = Some(ResolverError::NoDelegation);
                    continue;
                };
                let Some(addr) = first_v4(&glue.data) else {
                    warn!(ns = %ns_name, "cached A entry has no address, giving up on this NS");
                    last_err = Some(ResolverError::NoDelegation);
                    continue;
                };

                let server: SocketAddr = SocketAddr::new(addr.into(), 53);
                let mux = match self.registry.get_server_comm(server) {
                    Ok(mux) => mux,
                    Err(err) => {
                        warn!(ns = %ns_name, %server, %err, "could not establish transport, trying next NS");
                        last_err = Some(ResolverError::from(err));
                        continue;
                    }
                };

                info!(%name, %qtype, %server, "querying nameserver");
                let started = Instant::now();
                let response = match mux.query(name.clone(), qtype, NS_TIMEOUT).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(%server, %err, "nameserver unresponsive, trying next NS");
                        metrics::histogram!("ns_round_trip_seconds", started.elapsed().as_secs_f64(), "outcome" => "timeout");
                        last_err = Some(ResolverError::from(err));
                        continue;
                    }
                };
                metrics::histogram!("ns_round_trip_seconds", started.elapsed().as_secs_f64(), "outcome" => "reply");

                let expires = Utc::now() + ChronoDuration::seconds(INGEST_TTL_SECS);
                self.ingest(&response.answers, expires);
                self.ingest(&response.authorities, expires);
                self.ingest(&response.additionals, expires);

                if !response.answers.is_empty() {
                    info!(%name, %qtype, "resolved");
                    let answers = response
                        .answers
                        .into_iter()
                        .map(|r| Answer {
                            name: r.name,
                            rtype: r.rtype,
                            class: r.class,
                            data: r.data,
                        })
                        .collect();
                    return Ok(answers);
                }

                // The freshly-ingested delegation/glue moves `best_ns` and
                // the per-NS A lookup one step deeper on the next pass.
                debug!(%name, %qtype, "no direct answer, recursing one delegation level deeper");
                continue 'depths;
            }

            // Every NS at this depth was unusable: no recursion was
            // triggered, so iteration stops with the most recent reason.
            return Err(last_err.unwrap_or(ResolverError::NoDelegation));
        }

        warn!(%name, %qtype, depth_cap, "recursion limit exceeded");
        *depth_reached = depth_cap;
        Err(ResolverError::RecursionLimit)
    }

    /// Groups records by (name, type) before writing, since `set` replaces
    /// a whole entry atomically and performs no merging.
    fn ingest(&self, records: &[Record], expires: chrono::DateTime<Utc>) {
        use std::collections::HashMap;

        let mut groups: HashMap<(Name, RecordType), Vec<RecordData>> = HashMap::new();
        for record in records {
            groups
                .entry((record.name.clone(), record.rtype))
                .or_default()
                .push(record.data.clone());
        }

        for ((name, rtype), data) in groups {
            self.cache.set(name.as_str(), rtype, expires, data);
        }
    }
}

fn first_v4(data: &[RecordData]) -> Option<std::net::Ipv4Addr> {
    data.iter().find_map(|d| match d {
        RecordData::A(addr) => Some(*addr),
        _ => None,
    })
}

fn to_answers(name: &Name, qtype: RecordType, data: Vec<RecordData>) -> Vec<Answer> {
    data.into_iter()
        .map(|data| Answer {
            name: name.clone(),
            rtype: qtype,
            class: DnsClass::In,
            data,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::protocol::{Message, ResponseCode};
    use crate::registry::{PendingRequest, RegistryConfig, ServerMultiplexer};
    use std::net::Ipv4Addr;
    use tokio::sync::mpsc;

    fn cache_with(shard_count: usize) -> Arc<ShardedCache> {
        Arc::new(ShardedCache::init(CacheConfig { shard_count }))
    }

    fn registry_with(connect: crate::registry::ConnectFn) -> Arc<ServerCommRegistry> {
        Arc::new(ServerCommRegistry::new(RegistryConfig { shard_count: 4 }, connect))
    }

    #[tokio::test]
    async fn cache_hit_returns_without_touching_transport() {
        let cache = cache_with(4);
        cache.set(
            "example.com",
            RecordType::A,
            Utc::now() + ChronoDuration::seconds(60),
            vec![RecordData::A(Ipv4Addr::new(93, 184, 216, 34))],
        );
        let connect: crate::registry::ConnectFn = Arc::new(|_addr| {
            panic!("transport must not be used on a cache hit");
        });
        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let answers = resolver.query_lookup("example.com", RecordType::A).await;
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].data, RecordData::A(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[tokio::test]
    async fn cname_query_is_rejected_without_cache_or_transport() {
        let cache = cache_with(4);
        let connect: crate::registry::ConnectFn = Arc::new(|_addr| {
            panic!("transport must not be used for CNAME queries");
        });
        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let answers = resolver.query_lookup("anything.example", RecordType::Cname).await;
        assert!(answers.is_empty());
    }

    #[tokio::test]
    async fn two_step_delegation_resolves_to_final_answer() {
        let cache = cache_with(4);

        let connect: crate::registry::ConnectFn = Arc::new(|addr| {
            let (tx, mut rx) = mpsc::channel::<PendingRequest>(16);
            tokio::spawn(async move {
                while let Some(req) = rx.recv().await {
                    let msg = if addr.ip() == std::net::IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4)) {
                        Message {
                            rescode: ResponseCode::NoError,
                            answers: Vec::new(),
                            authorities: vec![Record {
                                name: Name::new("com."),
                                rtype: RecordType::Ns,
                                class: DnsClass::In,
                                ttl: 3600,
                                data: RecordData::Ns(Name::new("a.gtld-servers.net.")),
                            }],
                            additionals: vec![Record {
                                name: Name::new("a.gtld-servers.net."),
                                rtype: RecordType::A,
                                class: DnsClass::In,
                                ttl: 3600,
                                data: RecordData::A(Ipv4Addr::new(192, 5, 6, 30)),
                            }],
                        }
                    } else {
                        Message {
                            rescode: ResponseCode::NoError,
                            answers: vec![Record {
                                name: Name::new("foo.com."),
                                rtype: RecordType::A,
                                class: DnsClass::In,
                                ttl: 3600,
                                data: RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
                            }],
                            authorities: Vec::new(),
                            additionals: Vec::new(),
                        }
                    };
                    let _ = req.reply.send(msg);
                }
            });
            Ok(ServerMultiplexer::new(addr, tx))
        });

        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let answers = resolver.query_lookup("foo.com", RecordType::A).await;
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].data, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[tokio::test]
    async fn missing_glue_gives_up_on_that_ns() {
        let cache = cache_with(4);
        // Seed a delegation whose NS has no cached A record (no glue).
        cache.set(
            "example.com",
            RecordType::Ns,
            Utc::now() + ChronoDuration::seconds(60),
            vec![RecordData::Ns(Name::new("ns1.example.com."))],
        );

        let connect: crate::registry::ConnectFn = Arc::new(|_addr| {
            panic!("transport must not be reached without glue");
        });
        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let answers = resolver.query_lookup("example.com", RecordType::A).await;
        assert!(answers.is_empty());
    }

    #[tokio::test]
    async fn missing_glue_is_reported_as_no_delegation_internally() {
        let cache = cache_with(4);
        cache.set(
            "example.com",
            RecordType::Ns,
            Utc::now() + ChronoDuration::seconds(60),
            vec![RecordData::Ns(Name::new("ns1.example.com."))],
        );

        let connect: crate::registry::ConnectFn = Arc::new(|_addr| {
            panic!("transport must not be reached without glue");
        });
        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let mut depth = 0usize;
        let name = Name::new("example.com");
        let err = resolver
            .resolve(&name, RecordType::A, &mut depth)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::NoDelegation));
    }

    #[tokio::test]
    async fn recursion_limit_is_reported_when_depth_cap_is_exceeded() {
        // A cache with no delegation deeper than root for this name, but
        // where every response keeps coming back answerless, burns through
        // the depth cap and must surface `RecursionLimit`, not an empty
        // success.
        let cache = cache_with(4);
        let connect: crate::registry::ConnectFn = Arc::new(|addr| {
            let (tx, mut rx) = mpsc::channel::<PendingRequest>(16);
            tokio::spawn(async move {
                while let Some(req) = rx.recv().await {
                    // Always answerless but re-delegates to itself, so the
                    // resolver keeps recursing until the depth cap trips.
                    let msg = Message {
                        rescode: ResponseCode::NoError,
                        answers: Vec::new(),
                        authorities: vec![Record {
                            name: req.name.clone(),
                            rtype: RecordType::Ns,
                            class: DnsClass::In,
                            ttl: 3600,
                            data: RecordData::Ns(Name::new("ns1.example.com.")),
                        }],
                        additionals: vec![Record {
                            name: Name::new("ns1.example.com."),
                            rtype: RecordType::A,
                            class: DnsClass::In,
                            ttl: 3600,
                            data: RecordData::A(Ipv4Addr::new(10, 10, 10, 10)),
                        }],
                    };
                    let _ = req.reply.send(msg);
                }
            });
            Ok(ServerMultiplexer::new(addr, tx))
        });

        let registry = registry_with(connect);
        let resolver = IterativeResolver::new(cache, registry);

        let mut depth = 0usize;
        let name = Name::new("example.com");
        let err = resolver
            .resolve(&name, RecordType::A, &mut depth)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::RecursionLimit));
        assert_eq!(depth, name.label_count());
    }
}
