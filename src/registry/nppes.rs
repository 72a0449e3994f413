use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentityRegistry, RegistryHttp, RegistryMatch, RegistryNumber};
use crate::model::{Address, Contact, Field, IdentityRecord, Lookup};
use crate::normalize::{Identifier, NameQuery};

const REGISTRY: &str = "NPPES";

/// Client for the NPPES provider-identity registry API.
#[derive(Debug, Clone)]
pub struct NppesClient {
    http: RegistryHttp,
    base_url: String,
    api_version: String,
}

impl NppesClient {
    pub fn new(http: RegistryHttp, base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_version: api_version.into(),
        }
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<NppesResponse, crate::error::TransportError> {
        self.http.get_json(REGISTRY, &self.base_url, query).await
    }
}

#[async_trait]
impl IdentityRegistry for NppesClient {
    async fn lookup(&self, id: &Identifier) -> Lookup<IdentityRecord> {
        let query = [
            ("version", self.api_version.clone()),
            ("number", id.as_str().to_string()),
        ];
        match self.fetch(&query).await {
            Ok(body) => {
                body.log_errors();
                match body.results.first() {
                    Some(result) => Lookup::Found(identity_from_result(result)),
                    None => Lookup::NotFound,
                }
            }
            Err(err) => Lookup::Unavailable(err),
        }
    }

    async fn search_by_name(&self, name: &NameQuery, limit: usize) -> Lookup<Vec<RegistryMatch>> {
        let mut query = vec![
            ("version", self.api_version.clone()),
            ("last_name", name.last.clone()),
        ];
        if let Some(first) = &name.first {
            query.push(("first_name", first.clone()));
        }
        if let Some(region) = &name.region {
            query.push(("state", region.clone()));
        }
        query.push(("limit", limit.to_string()));

        match self.fetch(&query).await {
            Ok(body) => {
                body.log_errors();
                let matches: Vec<RegistryMatch> = body
                    .results
                    .iter()
                    .filter_map(|result| {
                        Some(RegistryMatch {
                            identifier: result.number.as_ref()?.to_identifier()?,
                            record: identity_from_result(result),
                        })
                    })
                    .take(limit)
                    .collect();
                if matches.is_empty() {
                    Lookup::NotFound
                } else {
                    Lookup::Found(matches)
                }
            }
            Err(err) => Lookup::Unavailable(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NppesResponse {
    #[serde(default)]
    results: Vec<NppesResult>,
    #[serde(default, rename = "Errors")]
    errors: Vec<serde_json::Value>,
}

impl NppesResponse {
    /// The registry answers rejected queries with 200 and an `Errors` list.
    fn log_errors(&self) {
        if !self.errors.is_empty() {
            tracing::debug!("{REGISTRY} rejected query: {:?}", self.errors);
        }
    }
}

#[derive(Debug, Deserialize)]
struct NppesResult {
    number: Option<RegistryNumber>,
    #[serde(default)]
    basic: NppesBasic,
    #[serde(default)]
    addresses: Vec<NppesAddress>,
    #[serde(default, rename = "practiceLocations")]
    practice_locations: Vec<NppesAddress>,
    #[serde(default)]
    endpoints: Vec<NppesEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
struct NppesBasic {
    first_name: Option<String>,
    middle_name: Option<String>,
    last_name: Option<String>,
    organization_name: Option<String>,
    credential: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NppesAddress {
    address_purpose: Option<String>,
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    telephone_number: Option<String>,
    fax_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NppesEndpoint {
    endpoint: Option<String>,
}

fn identity_from_result(result: &NppesResult) -> IdentityRecord {
    let basic = &result.basic;
    IdentityRecord {
        first_name: Field::from_opt(basic.first_name.as_deref()),
        middle_name: Field::from_opt(basic.middle_name.as_deref()),
        last_name: Field::from_opt(basic.last_name.as_deref()),
        organization_name: Field::from_opt(basic.organization_name.as_deref()),
        credential: Field::from_opt(basic.credential.as_deref()),
        mailing: pick_address(&result.addresses, "MAILING", 0)
            .map(contact_of)
            .unwrap_or_default(),
        practice: pick_address(&result.addresses, "LOCATION", 1)
            .map(contact_of)
            .unwrap_or_default(),
        other_practice: result
            .practice_locations
            .first()
            .map(address_of)
            .unwrap_or_default(),
        endpoint: Field::from_opt(
            result
                .endpoints
                .iter()
                .find_map(|e| e.endpoint.as_deref().filter(|v| !v.trim().is_empty())),
        ),
    }
}

/// Prefer the entry tagged with `purpose`; fall back to the conventional
/// position (mailing first, location second).
fn pick_address<'a>(
    addresses: &'a [NppesAddress],
    purpose: &str,
    fallback: usize,
) -> Option<&'a NppesAddress> {
    addresses
        .iter()
        .find(|a| {
            a.address_purpose
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(purpose))
        })
        .or_else(|| addresses.get(fallback))
}

fn address_of(a: &NppesAddress) -> Address {
    Address {
        line1: Field::from_opt(a.address_1.as_deref()),
        line2: Field::from_opt(a.address_2.as_deref()),
        city: Field::from_opt(a.city.as_deref()),
        state: Field::from_opt(a.state.as_deref()),
        postal_code: Field::from_opt(a.postal_code.as_deref()),
    }
}

fn contact_of(a: &NppesAddress) -> Contact {
    Contact {
        address: address_of(a),
        phone: Field::digits(a.telephone_number.as_deref()),
        fax: Field::digits(a.fax_number.as_deref()),
    }
}
