//! Public entry point: one query in, one batch of canonical records out.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;

use crate::aggregate::{Aggregator, ResultAggregate};
use crate::breaker::{Breaker, Breakers};
use crate::candidates::{self, Candidate};
use crate::config::ResolverConfig;
use crate::error::{ResolveResult, TransportError};
use crate::merge::merge_candidate;
use crate::mirror::MirrorStore;
use crate::model::{CanonicalRecord, Lookup};
use crate::normalize::Query;
use crate::registry::{
    EnrollmentRegistry, IdentityRegistry, NppesClient, PecosClient, RegistryHttp,
};

/// State of a single batch. Breakers live here, never in the resolver, so
/// concurrent batches cannot see each other's failures.
pub struct BatchContext<'a> {
    pub identity: &'a dyn IdentityRegistry,
    pub enrollment: &'a dyn EnrollmentRegistry,
    pub mirror: &'a MirrorStore,
    pub breakers: Breakers,
    pub name_search_limit: usize,
    /// Bound on one registry call, retries included.
    pub call_deadline: Duration,
}

impl BatchContext<'_> {
    /// Runs a registry call under `call_deadline`. A call that outlives it
    /// is dropped and reported as a timeout against `breaker`'s source.
    pub async fn bounded<T>(
        &self,
        breaker: &Breaker,
        call: impl Future<Output = Lookup<T>>,
    ) -> Lookup<T> {
        match tokio::time::timeout(self.call_deadline, call).await {
            Ok(outcome) => outcome,
            Err(_) => Lookup::Unavailable(TransportError::Timeout {
                registry: breaker.source(),
                timeout: self.call_deadline,
            }),
        }
    }

    /// Opens `breaker` after a failed remote call about `subject`.
    pub fn record_failure(&self, breaker: &Breaker, subject: &str, err: &TransportError) {
        if breaker.trip() {
            tracing::warn!(
                "{} registry unavailable ({subject}): {err}; using mirror for the rest of this batch",
                breaker.source()
            );
        } else {
            tracing::debug!("{} registry failed again ({subject}): {err}", breaker.source());
        }
    }
}

#[derive(Clone)]
pub struct Resolver {
    identity: Arc<dyn IdentityRegistry>,
    enrollment: Arc<dyn EnrollmentRegistry>,
    mirror: MirrorStore,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        identity: Arc<dyn IdentityRegistry>,
        enrollment: Arc<dyn EnrollmentRegistry>,
        mirror: MirrorStore,
        config: ResolverConfig,
    ) -> Self {
        Self {
            identity,
            enrollment,
            mirror,
            config,
        }
    }

    /// Resolver backed by the NPPES and PECOS HTTP registries.
    pub fn from_config(config: ResolverConfig, mirror: MirrorStore) -> Result<Self, reqwest::Error> {
        let http = RegistryHttp::new(&config)?;
        let identity = NppesClient::new(
            http.clone(),
            config.identity_api_url.clone(),
            config.identity_api_version.clone(),
        );
        let enrollment = PecosClient::new(http, config.enrollment_api_url.clone());
        Ok(Self::new(
            Arc::new(identity),
            Arc::new(enrollment),
            mirror,
            config,
        ))
    }

    /// Runs one batch with fresh breakers. Once a candidate is found the
    /// batch always answers; only a mirror read error aborts it. Dropping
    /// the returned future cancels any in-flight remote calls.
    pub async fn resolve(&self, query: &Query) -> ResolveResult<ResultAggregate> {
        let started = Instant::now();
        let ctx = BatchContext {
            identity: self.identity.as_ref(),
            enrollment: self.enrollment.as_ref(),
            mirror: &self.mirror,
            breakers: Breakers::new(),
            name_search_limit: self.config.name_search_limit(),
            call_deadline: self.config.call_deadline(),
        };
        tracing::info!(kind = query.kind(), "resolving {query}");

        let candidates = candidates::discover(&ctx, query).await?;
        let total = candidates.len();
        let mut aggregator = Aggregator::new(started, total);

        let concurrency = self.config.concurrency();
        let mut queue = candidates.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        for _ in 0..concurrency {
            if let Some((index, candidate)) = queue.next() {
                in_flight.push(merge_indexed(&ctx, index, candidate));
            }
        }

        while let Some((index, result)) = in_flight.next().await {
            let record = result?;
            tracing::debug!(
                "merged {}/{total}: {} (identity {:?}, enrollment {:?})",
                index + 1,
                record.identifier,
                record.identity_source,
                record.enrollment_source
            );
            aggregator.insert(index, record);

            if let Some((next_index, next_candidate)) = queue.next() {
                in_flight.push(merge_indexed(&ctx, next_index, next_candidate));
            }
        }

        let aggregate = aggregator.finish(&query.to_string())?;
        tracing::info!(
            "{query}: {} record(s), {} degraded, {:.2}s (identity breaker {:?}, enrollment breaker {:?})",
            aggregate.count(),
            aggregate.degraded_count(),
            aggregate.elapsed.as_secs_f64(),
            ctx.breakers.identity.state(),
            ctx.breakers.enrollment.state()
        );
        Ok(aggregate)
    }
}

async fn merge_indexed(
    ctx: &BatchContext<'_>,
    index: usize,
    candidate: Candidate,
) -> (usize, ResolveResult<CanonicalRecord>) {
    (index, merge_candidate(ctx, candidate).await)
}
