#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, params_from_iter};
use tempfile::TempDir;

use npi_lookup::error::TransportError;
use npi_lookup::mirror::{
    ENROLLMENT_COLUMNS, IDENTITY_COLUMNS, MirrorStore, enrollment_col, identity_col,
};
use npi_lookup::model::{EnrollmentStatus, Field, IdentityRecord, Lookup};
use npi_lookup::normalize::{Identifier, NameQuery};
use npi_lookup::registry::{EnrollmentRegistry, IdentityRegistry, RegistryMatch};
use npi_lookup::{Resolver, ResolverConfig};

pub fn id(raw: &str) -> Identifier {
    Identifier::parse(raw).expect("valid identifier")
}

/// A throwaway SQLite snapshot laid out like the export loader writes it.
pub struct MirrorFixture {
    _tmp: TempDir,
    pub path: PathBuf,
    conn: Connection,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderRow {
    pub npi: &'static str,
    pub first: &'static str,
    pub last: &'static str,
    pub credential: &'static str,
    pub mailing_state: &'static str,
    pub mailing_phone: &'static str,
    pub practice_state: &'static str,
    pub practice_phone: &'static str,
}

impl MirrorFixture {
    pub fn new() -> Self {
        let fixture = Self::without_tables();
        fixture.create_identity_table();
        fixture.create_enrollment_table();
        fixture
    }

    pub fn without_tables() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("npi.db");
        let conn = Connection::open(&path).expect("create mirror db");
        Self {
            _tmp: tmp,
            path,
            conn,
        }
    }

    pub fn create_identity_table(&self) {
        self.create_table("npi", &IDENTITY_COLUMNS);
    }

    pub fn create_enrollment_table(&self) {
        self.create_table("pecos", &ENROLLMENT_COLUMNS);
    }

    fn create_table(&self, table: &str, columns: &[&str]) {
        let cols: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let ty = if idx == 0 { "INTEGER" } else { "TEXT" };
                format!("\"{name}\" {ty}")
            })
            .collect();
        self.conn
            .execute_batch(&format!("CREATE TABLE {table} ({});", cols.join(", ")))
            .expect("create mirror table");
    }

    pub fn add_provider(&self, row: ProviderRow) {
        let mut cells = vec![String::new(); IDENTITY_COLUMNS.len()];
        cells[identity_col::NPI] = row.npi.to_string();
        cells[identity_col::FIRST_NAME] = row.first.to_string();
        cells[identity_col::LAST_NAME] = row.last.to_string();
        cells[identity_col::CREDENTIAL] = row.credential.to_string();
        cells[identity_col::MAILING_STATE] = row.mailing_state.to_string();
        cells[identity_col::MAILING_PHONE] = row.mailing_phone.to_string();
        cells[identity_col::PRACTICE_STATE] = row.practice_state.to_string();
        cells[identity_col::PRACTICE_PHONE] = row.practice_phone.to_string();
        self.insert("npi", cells);
    }

    pub fn add_enrollment(&self, npi: &str, dme: &str) {
        let mut cells = vec![String::new(); ENROLLMENT_COLUMNS.len()];
        cells[enrollment_col::NPI] = npi.to_string();
        cells[enrollment_col::DME] = dme.to_string();
        self.insert("pecos", cells);
    }

    fn insert(&self, table: &str, cells: Vec<String>) {
        let placeholders = vec!["?"; cells.len()].join(", ");
        self.conn
            .execute(
                &format!("INSERT INTO {table} VALUES ({placeholders})"),
                params_from_iter(cells.iter()),
            )
            .expect("insert mirror row");
    }

    pub fn store(&self) -> MirrorStore {
        MirrorStore::open(&self.path).expect("open mirror")
    }
}

pub fn provider(npi: &'static str, first: &'static str, last: &'static str) -> ProviderRow {
    ProviderRow {
        npi,
        first,
        last,
        credential: "MD",
        ..ProviderRow::default()
    }
}

pub fn timeout_error(registry: &'static str) -> TransportError {
    TransportError::Timeout {
        registry,
        timeout: Duration::from_secs(10),
    }
}

pub fn remote_identity(first: &str, last: &str) -> IdentityRecord {
    IdentityRecord {
        first_name: Field::new(first),
        last_name: Field::new(last),
        credential: Field::new("DO"),
        ..IdentityRecord::default()
    }
}

/// Scripted identity registry. Fails its first `failures` calls, then
/// answers from `records`.
#[derive(Default)]
pub struct FakeIdentity {
    pub records: HashMap<String, IdentityRecord>,
    pub search_hits: Vec<Identifier>,
    pub delays: HashMap<String, Duration>,
    failures: AtomicUsize,
    hang: bool,
    pub lookup_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn down() -> Self {
        Self {
            failures: AtomicUsize::new(usize::MAX),
            ..Self::default()
        }
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            failures: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn with_record(mut self, npi: &str, record: IdentityRecord) -> Self {
        self.records.insert(npi.to_string(), record);
        self
    }

    pub fn with_search_hits(mut self, hits: &[&str]) -> Self {
        self.search_hits = hits.iter().map(|h| id(h)).collect();
        self
    }

    pub fn with_delay(mut self, npi: &str, delay: Duration) -> Self {
        self.delays.insert(npi.to_string(), delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), TransportError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        let consumed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if consumed {
            Err(timeout_error("NPPES"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityRegistry for FakeIdentity {
    async fn lookup(&self, id: &Identifier) -> Lookup<IdentityRecord> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        if let Err(err) = self.gate().await {
            return Lookup::Unavailable(err);
        }
        match self.records.get(id.as_str()) {
            Some(record) => Lookup::Found(record.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn search_by_name(&self, _name: &NameQuery, limit: usize) -> Lookup<Vec<RegistryMatch>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.gate().await {
            return Lookup::Unavailable(err);
        }
        let hits: Vec<RegistryMatch> = self
            .search_hits
            .iter()
            .take(limit)
            .map(|identifier| RegistryMatch {
                identifier: identifier.clone(),
                record: self
                    .records
                    .get(identifier.as_str())
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();
        if hits.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::Found(hits)
        }
    }
}

/// Scripted enrollment registry.
#[derive(Default)]
pub struct FakeEnrollment {
    pub statuses: HashMap<String, EnrollmentStatus>,
    failures: AtomicUsize,
    pub lookup_calls: AtomicUsize,
}

impl FakeEnrollment {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn down() -> Self {
        Self {
            failures: AtomicUsize::new(usize::MAX),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, npi: &str, status: EnrollmentStatus) -> Self {
        self.statuses.insert(npi.to_string(), status);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrollmentRegistry for FakeEnrollment {
    async fn lookup(&self, id: &Identifier) -> Lookup<EnrollmentStatus> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Lookup::Unavailable(timeout_error("PECOS"));
        }
        match self.statuses.get(id.as_str()) {
            Some(status) => Lookup::Found(*status),
            None => Lookup::NotFound,
        }
    }
}

pub fn resolver(
    identity: &Arc<FakeIdentity>,
    enrollment: &Arc<FakeEnrollment>,
    mirror: MirrorStore,
) -> Resolver {
    resolver_with(identity, enrollment, mirror, ResolverConfig::default())
}

pub fn resolver_with(
    identity: &Arc<FakeIdentity>,
    enrollment: &Arc<FakeEnrollment>,
    mirror: MirrorStore,
    config: ResolverConfig,
) -> Resolver {
    Resolver::new(
        Arc::clone(identity) as Arc<dyn IdentityRegistry>,
        Arc::clone(enrollment) as Arc<dyn EnrollmentRegistry>,
        mirror,
        config,
    )
}
