//! Read-only access to the local registry snapshot.
//!
//! The snapshot is a SQLite file produced by the offline export loader:
//! table `npi` holds the identity export and table `pecos` the
//! order-and-referring enrollment export, both with their upstream column
//! order. Rows are read by column position, predicates are written against
//! the upstream column names.

use std::path::Path;
use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::error::MirrorError;
use crate::normalize::{Identifier, NameQuery, PhoneNumber};

pub const IDENTITY_TABLE: &str = "npi";
pub const ENROLLMENT_TABLE: &str = "pecos";

/// Leading columns of the identity export, in file order.
pub const IDENTITY_COLUMNS: [&str; 36] = [
    "NPI",
    "Entity Type Code",
    "Replacement NPI",
    "Employer Identification Number (EIN)",
    "Provider Organization Name (Legal Business Name)",
    "Provider Last Name (Legal Name)",
    "Provider First Name",
    "Provider Middle Name",
    "Provider Name Prefix Text",
    "Provider Name Suffix Text",
    "Provider Credential Text",
    "Provider Other Organization Name",
    "Provider Other Organization Name Type Code",
    "Provider Other Last Name",
    "Provider Other First Name",
    "Provider Other Middle Name",
    "Provider Other Name Prefix Text",
    "Provider Other Name Suffix Text",
    "Provider Other Credential Text",
    "Provider Other Last Name Type Code",
    "Provider First Line Business Mailing Address",
    "Provider Second Line Business Mailing Address",
    "Provider Business Mailing Address City Name",
    "Provider Business Mailing Address State Name",
    "Provider Business Mailing Address Postal Code",
    "Provider Business Mailing Address Country Code (If outside U.S.)",
    "Provider Business Mailing Address Telephone Number",
    "Provider Business Mailing Address Fax Number",
    "Provider First Line Business Practice Location Address",
    "Provider Second Line Business Practice Location Address",
    "Provider Business Practice Location Address City Name",
    "Provider Business Practice Location Address State Name",
    "Provider Business Practice Location Address Postal Code",
    "Provider Business Practice Location Address Country Code (If outside U.S.)",
    "Provider Business Practice Location Address Telephone Number",
    "Provider Business Practice Location Address Fax Number",
];

/// Columns of the enrollment export, in file order.
pub const ENROLLMENT_COLUMNS: [&str; 8] = [
    "NPI", "LAST_NAME", "FIRST_NAME", "PARTB", "DME", "HHA", "PMD", "HOSPICE",
];

/// Positions within an identity row.
pub mod identity_col {
    pub const NPI: usize = 0;
    pub const ORGANIZATION_NAME: usize = 4;
    pub const LAST_NAME: usize = 5;
    pub const FIRST_NAME: usize = 6;
    pub const MIDDLE_NAME: usize = 7;
    pub const CREDENTIAL: usize = 10;
    pub const MAILING_LINE1: usize = 20;
    pub const MAILING_LINE2: usize = 21;
    pub const MAILING_CITY: usize = 22;
    pub const MAILING_STATE: usize = 23;
    pub const MAILING_POSTAL: usize = 24;
    pub const MAILING_PHONE: usize = 26;
    pub const MAILING_FAX: usize = 27;
    pub const PRACTICE_LINE1: usize = 28;
    pub const PRACTICE_LINE2: usize = 29;
    pub const PRACTICE_CITY: usize = 30;
    pub const PRACTICE_STATE: usize = 31;
    pub const PRACTICE_POSTAL: usize = 32;
    pub const PRACTICE_PHONE: usize = 34;
    pub const PRACTICE_FAX: usize = 35;
}

/// Positions within an enrollment row.
pub mod enrollment_col {
    pub const NPI: usize = 0;
    pub const DME: usize = 4;
}

/// One identity row, every cell rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRow(Vec<String>);

impl MirrorRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Missing trailing columns read as empty.
    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Clone)]
pub struct MirrorStore {
    conn: Arc<Mutex<Connection>>,
}

impl MirrorStore {
    pub fn open(path: &Path) -> Result<Self, MirrorError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |source| MirrorError::Open {
                path: path.display().to_string(),
                source,
            },
        )?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub async fn identity_by_identifier(
        &self,
        id: &Identifier,
    ) -> Result<Option<MirrorRow>, MirrorError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, IDENTITY_TABLE)?;
        let query_err = |source| MirrorError::Query {
            table: IDENTITY_TABLE,
            context: format!("identity lookup for {id}"),
            source,
        };

        let mut stmt = conn
            .prepare(r#"SELECT * FROM npi WHERE "NPI" = ?1 LIMIT 1"#)
            .map_err(query_err)?;
        let width = stmt.column_count();
        stmt.query_row(params![id.as_str()], |row| read_cells(row, width))
            .optional()
            .map(|cells| cells.map(MirrorRow::new))
            .map_err(query_err)
    }

    /// Identifiers whose mailing or practice phone equals `phone`, in scan order.
    pub async fn identifiers_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Vec<Identifier>, MirrorError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, IDENTITY_TABLE)?;
        let sql = r#"
            SELECT "NPI" FROM npi
            WHERE "Provider Business Mailing Address Telephone Number" = ?1
               OR "Provider Business Practice Location Address Telephone Number" = ?1
            ORDER BY rowid
        "#;
        collect_identifiers(&conn, sql, params![phone.as_str()], || {
            format!("phone search for {phone}")
        })
    }

    /// Exact last name, optional exact first name, and an optional region
    /// matched against either the mailing or the practice state.
    pub async fn identifiers_by_name(
        &self,
        name: &NameQuery,
    ) -> Result<Vec<Identifier>, MirrorError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, IDENTITY_TABLE)?;
        let sql = r#"
            SELECT "NPI" FROM npi
            WHERE "Provider Last Name (Legal Name)" = ?1
              AND (?2 IS NULL OR "Provider First Name" = ?2)
              AND (?3 IS NULL
                   OR "Provider Business Mailing Address State Name" = ?3
                   OR "Provider Business Practice Location Address State Name" = ?3)
            ORDER BY rowid
        "#;
        collect_identifiers(
            &conn,
            sql,
            params![name.last, name.first, name.region],
            || format!("name search for '{name}'"),
        )
    }

    /// DME flags of every enrollment row for `id`, in scan order.
    pub async fn enrollment_flags(&self, id: &Identifier) -> Result<Vec<String>, MirrorError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, ENROLLMENT_TABLE)?;
        let query_err = |source| MirrorError::Query {
            table: ENROLLMENT_TABLE,
            context: format!("enrollment lookup for {id}"),
            source,
        };

        let mut stmt = conn
            .prepare(r#"SELECT * FROM pecos WHERE "NPI" = ?1 ORDER BY rowid"#)
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![id.as_str()], |row| {
                row.get_ref(enrollment_col::DME).map(cell_text)
            })
            .map_err(query_err)?;

        let mut flags = Vec::new();
        for row in rows {
            flags.push(row.map_err(query_err)?);
        }
        Ok(flags)
    }
}

fn ensure_table(conn: &Connection, table: &'static str) -> Result<(), MirrorError> {
    let present: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| MirrorError::Query {
            table,
            context: "schema check".to_string(),
            source,
        })?;
    match present {
        Some(_) => Ok(()),
        None => Err(MirrorError::MissingTable(table)),
    }
}

fn collect_identifiers(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    context: impl Fn() -> String,
) -> Result<Vec<Identifier>, MirrorError> {
    let query_err = |source| MirrorError::Query {
        table: IDENTITY_TABLE,
        context: context(),
        source,
    };
    let mut stmt = conn.prepare(sql).map_err(query_err)?;
    let rows = stmt
        .query_map(params, |row| row.get_ref(identity_col::NPI).map(cell_text))
        .map_err(query_err)?;

    let mut out = Vec::new();
    for row in rows {
        let raw = row.map_err(query_err)?;
        match Identifier::parse(&raw) {
            Ok(id) => out.push(id),
            Err(_) => tracing::debug!("skipping mirror row with malformed NPI {raw:?}"),
        }
    }
    Ok(out)
}

fn read_cells(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<String>> {
    let mut cells = Vec::with_capacity(width);
    for idx in 0..width {
        cells.push(cell_text(row.get_ref(idx)?));
    }
    Ok(cells)
}

/// The loader stores numeric-looking columns as INTEGER or REAL, so every
/// cell is rendered back to the text the export carried.
fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_store() -> MirrorStore {
        MirrorStore::from_connection(Connection::open_in_memory().unwrap())
    }

    #[test]
    fn positions_line_up_with_column_names() {
        use identity_col::*;
        assert_eq!(IDENTITY_COLUMNS[NPI], "NPI");
        assert_eq!(IDENTITY_COLUMNS[LAST_NAME], "Provider Last Name (Legal Name)");
        assert_eq!(IDENTITY_COLUMNS[FIRST_NAME], "Provider First Name");
        assert_eq!(IDENTITY_COLUMNS[CREDENTIAL], "Provider Credential Text");
        assert_eq!(
            IDENTITY_COLUMNS[MAILING_PHONE],
            "Provider Business Mailing Address Telephone Number"
        );
        assert_eq!(
            IDENTITY_COLUMNS[PRACTICE_FAX],
            "Provider Business Practice Location Address Fax Number"
        );
        assert_eq!(ENROLLMENT_COLUMNS[enrollment_col::DME], "DME");
    }

    #[test]
    fn cells_render_as_export_text() {
        assert_eq!(cell_text(ValueRef::Integer(1234567893)), "1234567893");
        assert_eq!(cell_text(ValueRef::Real(5551234567.0)), "5551234567");
        assert_eq!(cell_text(ValueRef::Text(b"MD")), "MD");
        assert_eq!(cell_text(ValueRef::Null), "");
    }

    #[test]
    fn short_rows_read_as_empty() {
        let row = MirrorRow::new(vec!["1234567893".to_string()]);
        assert_eq!(row.get(0), "1234567893");
        assert_eq!(row.get(35), "");
    }

    #[tokio::test]
    async fn missing_tables_are_reported() {
        let store = empty_store();
        let id = Identifier::parse("1234567893").unwrap();
        assert!(matches!(
            store.identity_by_identifier(&id).await,
            Err(MirrorError::MissingTable("npi"))
        ));
        assert!(matches!(
            store.enrollment_flags(&id).await,
            Err(MirrorError::MissingTable("pecos"))
        ));
    }
}
