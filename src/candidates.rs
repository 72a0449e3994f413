//! Turns a query into the ordered list of identifiers to resolve.

use crate::error::{ResolveError, ResolveResult};
use crate::merge::{ResolvedIdentity, require_identity};
use crate::model::{Lookup, Provenance};
use crate::normalize::{Identifier, NameQuery, PhoneNumber, Query};
use crate::registry::RegistryMatch;
use crate::resolver::BatchContext;

/// An identifier awaiting a full merge. Identifier queries and registry name
/// searches already hold the identity; it is carried so the merger does not
/// ask the registry again.
#[derive(Debug)]
pub struct Candidate {
    pub identifier: Identifier,
    pub identity: Option<ResolvedIdentity>,
}

impl Candidate {
    fn bare(identifier: Identifier) -> Self {
        Self {
            identifier,
            identity: None,
        }
    }

    fn from_search(hit: RegistryMatch) -> Self {
        Self {
            identifier: hit.identifier,
            identity: Some(ResolvedIdentity {
                record: hit.record,
                source: Provenance::Remote,
                found: true,
            }),
        }
    }
}

pub async fn discover(ctx: &BatchContext<'_>, query: &Query) -> ResolveResult<Vec<Candidate>> {
    let candidates = match query {
        Query::ByIdentifier(id) => by_identifier(ctx, id).await?,
        Query::ByPhone(phone) => by_phone(ctx, phone).await?,
        Query::ByName(name) => by_name(ctx, name).await?,
    };
    if candidates.is_empty() {
        return Err(ResolveError::NotFound(query.to_string()));
    }
    tracing::debug!("{query}: {} candidate(s)", candidates.len());
    Ok(candidates)
}

async fn by_identifier(ctx: &BatchContext<'_>, id: &Identifier) -> ResolveResult<Vec<Candidate>> {
    let identity = require_identity(ctx, id).await?;
    if !identity.found {
        return Ok(Vec::new());
    }
    Ok(vec![Candidate {
        identifier: id.clone(),
        identity: Some(identity),
    }])
}

/// The identity registry offers no phone search, so this always scans the mirror.
async fn by_phone(ctx: &BatchContext<'_>, phone: &PhoneNumber) -> ResolveResult<Vec<Candidate>> {
    let ids = ctx.mirror.identifiers_by_phone(phone).await?;
    Ok(ids.into_iter().map(Candidate::bare).collect())
}

async fn by_name(ctx: &BatchContext<'_>, name: &NameQuery) -> ResolveResult<Vec<Candidate>> {
    let breaker = &ctx.breakers.identity;
    if !breaker.tripped() {
        let search = ctx.identity.search_by_name(name, ctx.name_search_limit);
        match ctx.bounded(breaker, search).await {
            Lookup::Found(hits) => {
                return Ok(hits.into_iter().map(Candidate::from_search).collect());
            }
            Lookup::NotFound => return Ok(Vec::new()),
            Lookup::Unavailable(err) => {
                ctx.record_failure(breaker, &format!("name '{name}'"), &err);
            }
        }
    }

    tracing::debug!("name '{name}': scanning mirror");
    let ids = ctx.mirror.identifiers_by_name(name).await?;
    Ok(ids.into_iter().map(Candidate::bare).collect())
}
