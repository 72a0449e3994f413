//! Builds one canonical record per candidate.
//!
//! Identity and enrollment are resolved independently. Each asks its remote
//! registry while that registry's breaker is closed and reads the mirror
//! otherwise. A transport failure opens the breaker for the rest of the
//! batch and falls through to the mirror for the current candidate.

use crate::candidates::Candidate;
use crate::error::{MirrorError, ResolveResult};
use crate::mirror::{MirrorRow, identity_col as col};
use crate::model::{
    Address, CanonicalRecord, Contact, EnrollmentStatus, Field, IdentityRecord, Lookup, Provenance,
};
use crate::normalize::Identifier;
use crate::resolver::BatchContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub record: IdentityRecord,
    pub source: Provenance,
    /// False when the answering source had no entry; `record` is then all `UNKNOWN`.
    pub found: bool,
}

impl ResolvedIdentity {
    fn missing(source: Provenance) -> Self {
        Self {
            record: IdentityRecord::unknown(),
            source,
            found: false,
        }
    }
}

pub async fn merge_candidate(
    ctx: &BatchContext<'_>,
    candidate: Candidate,
) -> ResolveResult<CanonicalRecord> {
    let Candidate {
        identifier,
        identity,
    } = candidate;

    let identity = match identity {
        Some(resolved) => resolved,
        None => resolve_identity(ctx, &identifier).await?,
    };
    let (enrollment, enrollment_source) = resolve_enrollment(ctx, &identifier).await?;

    Ok(CanonicalRecord {
        identifier,
        identity: identity.record,
        enrollment,
        identity_source: identity.source,
        enrollment_source,
    })
}

/// Identity for one candidate. An unloaded identity table reads as a miss.
pub async fn resolve_identity(
    ctx: &BatchContext<'_>,
    id: &Identifier,
) -> ResolveResult<ResolvedIdentity> {
    match identity_from_sources(ctx, id).await {
        Err(MirrorError::MissingTable(table)) => {
            tracing::debug!("{id}: mirror table `{table}` not loaded");
            Ok(ResolvedIdentity::missing(Provenance::Mirror))
        }
        other => other.map_err(Into::into),
    }
}

/// Identity used to prove an identifier exists. Nothing else can answer
/// that question, so an unloaded identity table is a storage failure here.
pub async fn require_identity(
    ctx: &BatchContext<'_>,
    id: &Identifier,
) -> ResolveResult<ResolvedIdentity> {
    Ok(identity_from_sources(ctx, id).await?)
}

async fn identity_from_sources(
    ctx: &BatchContext<'_>,
    id: &Identifier,
) -> Result<ResolvedIdentity, MirrorError> {
    let breaker = &ctx.breakers.identity;
    if !breaker.tripped() {
        match ctx.bounded(breaker, ctx.identity.lookup(id)).await {
            Lookup::Found(record) => {
                return Ok(ResolvedIdentity {
                    record,
                    source: Provenance::Remote,
                    found: true,
                });
            }
            Lookup::NotFound => return Ok(ResolvedIdentity::missing(Provenance::Remote)),
            Lookup::Unavailable(err) => ctx.record_failure(breaker, id.as_str(), &err),
        }
    }

    match ctx.mirror.identity_by_identifier(id).await? {
        Some(row) => Ok(ResolvedIdentity {
            record: identity_from_mirror_row(&row),
            source: Provenance::Mirror,
            found: true,
        }),
        None => {
            tracing::debug!("{id}: no identity row in mirror");
            Ok(ResolvedIdentity::missing(Provenance::Mirror))
        }
    }
}

pub async fn resolve_enrollment(
    ctx: &BatchContext<'_>,
    id: &Identifier,
) -> ResolveResult<(EnrollmentStatus, Provenance)> {
    let breaker = &ctx.breakers.enrollment;
    if !breaker.tripped() {
        match ctx.bounded(breaker, ctx.enrollment.lookup(id)).await {
            Lookup::Found(status) => return Ok((status, Provenance::Remote)),
            Lookup::NotFound => return Ok((EnrollmentStatus::No, Provenance::Remote)),
            Lookup::Unavailable(err) => ctx.record_failure(breaker, id.as_str(), &err),
        }
    }

    match ctx.mirror.enrollment_flags(id).await {
        Ok(flags) => Ok((enrollment_from_mirror_flags(&flags), Provenance::Mirror)),
        Err(MirrorError::MissingTable(table)) => {
            tracing::debug!("{id}: mirror table `{table}` not loaded");
            Ok((EnrollmentStatus::Unknown, Provenance::Mirror))
        }
        Err(err) => Err(err.into()),
    }
}

/// The last matching row decides; earlier rows are ignored. No rows means
/// not enrolled.
// TODO: replace with an OR over rows once the registry owners confirm how
// duplicate enrollment rows should combine.
pub fn enrollment_from_mirror_flags(flags: &[String]) -> EnrollmentStatus {
    flags
        .last()
        .map_or(EnrollmentStatus::No, |flag| EnrollmentStatus::from_mirror_flag(flag))
}

pub fn identity_from_mirror_row(row: &MirrorRow) -> IdentityRecord {
    let text = |idx| Field::new(row.get(idx));
    let digits = |idx| Field::digits(Some(row.get(idx)));

    IdentityRecord {
        first_name: text(col::FIRST_NAME),
        middle_name: text(col::MIDDLE_NAME),
        last_name: text(col::LAST_NAME),
        organization_name: text(col::ORGANIZATION_NAME),
        credential: text(col::CREDENTIAL),
        mailing: Contact {
            address: Address {
                line1: text(col::MAILING_LINE1),
                line2: text(col::MAILING_LINE2),
                city: text(col::MAILING_CITY),
                state: text(col::MAILING_STATE),
                postal_code: text(col::MAILING_POSTAL),
            },
            phone: digits(col::MAILING_PHONE),
            fax: digits(col::MAILING_FAX),
        },
        practice: Contact {
            address: Address {
                line1: text(col::PRACTICE_LINE1),
                line2: text(col::PRACTICE_LINE2),
                city: text(col::PRACTICE_CITY),
                state: text(col::PRACTICE_STATE),
                postal_code: text(col::PRACTICE_POSTAL),
            },
            phone: digits(col::PRACTICE_PHONE),
            fax: digits(col::PRACTICE_FAX),
        },
        other_practice: Address::default(),
        endpoint: Field::Unknown,
    }
}
