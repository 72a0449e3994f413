use async_trait::async_trait;
use serde::Deserialize;

use super::{EnrollmentRegistry, RegistryHttp, RegistryNumber};
use crate::model::{EnrollmentStatus, Lookup};
use crate::normalize::Identifier;

const REGISTRY: &str = "PECOS";

/// Client for the order-and-referring enrollment dataset on data.cms.gov.
#[derive(Debug, Clone)]
pub struct PecosClient {
    http: RegistryHttp,
    base_url: String,
}

impl PecosClient {
    pub fn new(http: RegistryHttp, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EnrollmentRegistry for PecosClient {
    async fn lookup(&self, id: &Identifier) -> Lookup<EnrollmentStatus> {
        let query = [
            ("column", "DME,NPI".to_string()),
            ("keyword", id.as_str().to_string()),
        ];
        match self
            .http
            .get_json::<Vec<PecosRow>>(REGISTRY, &self.base_url, &query)
            .await
        {
            Ok(rows) => match flag_for(&rows, id) {
                Some(flag) => Lookup::Found(EnrollmentStatus::from_flag(flag)),
                None => Lookup::NotFound,
            },
            Err(err) => Lookup::Unavailable(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PecosRow {
    #[serde(rename = "NPI")]
    npi: Option<RegistryNumber>,
    #[serde(rename = "DME")]
    dme: Option<String>,
}

/// Keyword search can match other columns, so only a row carrying the
/// identifier itself supplies the flag.
fn flag_for<'a>(rows: &'a [PecosRow], id: &Identifier) -> Option<&'a str> {
    rows.iter()
        .find(|row| {
            row.npi
                .as_ref()
                .and_then(RegistryNumber::to_identifier)
                .is_some_and(|npi| npi == *id)
        })
        .map(|row| row.dme.as_deref().unwrap_or(""))
}
