use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Tables reported by `table_counts`, in schema order
pub const TABLES: [&str; 15] = [
    "race",
    "event_category",
    "witness_category",
    "location_category",
    "location",
    "notary",
    "ledger",
    "person",
    "person_alias",
    "person_occupation",
    "event",
    "event_participant",
    "witness",
    "residence",
    "audit_log",
];

/// Audit trail entry ("every imported row leaves a trace")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEntry {
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub data: serde_json::Value,
    pub actor: String,
}

impl AuditEntry {
    pub fn new(
        action: &str,
        entity_type: &str,
        entity_id: i64,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            data,
            actor: actor.to_string(),
        }
    }
}

/// SHA-256 fingerprint of a normalized row (fields joined by U+001F)
pub fn row_fingerprint(fields: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("\u{1f}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Open (or create) the records database and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    setup_database(&conn)?;

    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Lookup tables (small reference data, unique by name)
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS race (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            label TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS event_category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            label TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS witness_category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            label TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS location_category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            label TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS location (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            category_id INTEGER REFERENCES location_category(id)
        );
        CREATE TABLE IF NOT EXISTS notary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );
        CREATE TABLE IF NOT EXISTS ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            notary_id INTEGER NOT NULL REFERENCES notary(id),
            year INTEGER NOT NULL,
            UNIQUE(notary_id, year)
        );",
    )?;

    // ==========================================================================
    // People and the facts attached to them
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            race_id INTEGER REFERENCES race(id),
            sex TEXT NOT NULL,
            written_race TEXT,
            status TEXT,
            birth_status TEXT,
            native_id INTEGER REFERENCES location(id),
            notes TEXT,
            birth_id INTEGER REFERENCES event(id),
            baptism_id INTEGER REFERENCES event(id),
            death_id INTEGER REFERENCES event(id),
            father_id INTEGER REFERENCES person(id),
            mother_id INTEGER REFERENCES person(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS person_alias (
            person_id INTEGER NOT NULL REFERENCES person(id),
            alias TEXT NOT NULL,
            UNIQUE(person_id, alias)
        );
        CREATE TABLE IF NOT EXISTS person_occupation (
            person_id INTEGER NOT NULL REFERENCES person(id),
            occupation TEXT NOT NULL,
            UNIQUE(person_id, occupation)
        );",
    )?;

    // ==========================================================================
    // Events, roles, witnesses, residences
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES event_category(id),
            written_date TEXT,
            date TEXT,
            location_id INTEGER REFERENCES location(id),
            ledger_id INTEGER REFERENCES ledger(id)
        );
        CREATE TABLE IF NOT EXISTS event_participant (
            event_id INTEGER NOT NULL REFERENCES event(id),
            person_id INTEGER NOT NULL REFERENCES person(id),
            role TEXT NOT NULL,
            UNIQUE(event_id, person_id, role)
        );
        CREATE TABLE IF NOT EXISTS witness (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL REFERENCES person(id),
            event_id INTEGER NOT NULL REFERENCES event(id),
            category_id INTEGER REFERENCES witness_category(id),
            UNIQUE(person_id, event_id, category_id)
        );
        CREATE TABLE IF NOT EXISTS residence (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL REFERENCES person(id),
            written_date TEXT,
            date TEXT,
            location_id INTEGER NOT NULL REFERENCES location(id),
            UNIQUE(person_id, written_date, location_id)
        );",
    )?;

    // ==========================================================================
    // Audit trail
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_person_identity
            ON person(first_name, last_name, race_id, sex);
        CREATE INDEX IF NOT EXISTS idx_person_last_name ON person(last_name);
        CREATE INDEX IF NOT EXISTS idx_participant_person ON event_participant(person_id, role);
        CREATE INDEX IF NOT EXISTS idx_residence_person ON residence(person_id);
        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id);",
    )?;

    Ok(())
}

/// Insert entry into the audit trail
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> rusqlite::Result<()> {
    let data_json = entry.data.to_string();

    conn.execute(
        "INSERT INTO audit_log (
            entry_id, timestamp, action, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.entry_id,
            entry.timestamp.to_rfc3339(),
            entry.action,
            entry.entity_type,
            entry.entity_id,
            data_json,
            entry.actor,
        ],
    )?;

    Ok(())
}

/// Get audit entries for a specific entity, newest first
pub fn get_audit_entries(
    conn: &Connection,
    entity_type: &str,
    entity_id: i64,
) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, timestamp, action, entity_type, entity_id, data, actor
         FROM audit_log
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let entries = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(AuditEntry {
                entry_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc),
                action: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Row count of a single table
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    if !TABLES.contains(&table) {
        anyhow::bail!("Unknown table: {}", table);
    }
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;

    Ok(count)
}

/// Row counts for every table, in schema order
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        counts.push((table, count_rows(conn, table)?));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.len(), TABLES.len());
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(count_rows(&conn, "person; DROP TABLE person").is_err());
    }

    #[test]
    fn test_audit_log() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let entry = AuditEntry::new(
            "row_imported",
            "person",
            42,
            serde_json::json!({"file": "a.csv", "row": 2}),
            "test_actor",
        );

        insert_audit_entry(&conn, &entry).unwrap();

        let entries = get_audit_entries(&conn, "person", 42).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "row_imported");
        assert_eq!(entries[0].actor, "test_actor");
        assert_eq!(entries[0].data["row"], 2);
    }

    #[test]
    fn test_row_fingerprint() {
        let row = vec!["Smith".to_string(), "John".to_string()];
        let hash1 = row_fingerprint(&row);
        let hash2 = row_fingerprint(&row);
        let other = row_fingerprint(&["SmithJohn".to_string(), String::new()]);

        assert_eq!(hash1, hash2, "Same row should produce same fingerprint");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_ne!(hash1, other, "Field boundaries must change the fingerprint");
    }

    #[test]
    fn test_open_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        let conn = open_database(&path).unwrap();
        assert!(path.exists());
        assert_eq!(count_rows(&conn, "person").unwrap(), 0);
    }
}
