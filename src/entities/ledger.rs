// 📒 Ledgers and residences
//
// A ledger is a notary's register for one year. A residence places one
// person somewhere, optionally at a date.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::entities::person::escape_like;

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ledger {
    pub id: i64,
    pub notary_id: i64,
    pub notary_name: String,
    pub year: i32,
}

impl Ledger {
    pub fn title(&self) -> String {
        format!("{} {}", self.notary_name, self.year)
    }
}

const SELECT_LEDGER: &str = "SELECT l.id, l.notary_id, n.name, l.year
     FROM ledger l JOIN notary n ON n.id = l.notary_id";

fn ledger_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ledger> {
    Ok(Ledger {
        id: row.get(0)?,
        notary_id: row.get(1)?,
        notary_name: row.get(2)?,
        year: row.get(3)?,
    })
}

pub fn find(conn: &Connection, notary_id: i64, year: i32) -> rusqlite::Result<Option<Ledger>> {
    conn.query_row(
        &format!("{SELECT_LEDGER} WHERE l.notary_id = ?1 AND l.year = ?2"),
        params![notary_id, year],
        ledger_from_row,
    )
    .optional()
}

/// The notary's ledger for a year, created on first use
pub fn find_or_create(conn: &Connection, notary_id: i64, year: i32) -> rusqlite::Result<Ledger> {
    if let Some(ledger) = find(conn, notary_id, year)? {
        return Ok(ledger);
    }

    conn.execute(
        "INSERT INTO ledger (notary_id, year) VALUES (?1, ?2)",
        params![notary_id, year],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, notary_id, year, "created ledger");

    let notary_name: String =
        conn.query_row("SELECT name FROM notary WHERE id = ?1", [notary_id], |row| row.get(0))?;

    Ok(Ledger {
        id,
        notary_id,
        notary_name,
        year,
    })
}

/// Ledgers whose notary name starts with `q`, by notary name then year
pub fn typeahead(conn: &Connection, q: &str) -> rusqlite::Result<Vec<Ledger>> {
    let pattern = format!("{}%", escape_like(q));
    let mut stmt = conn.prepare(&format!(
        "{SELECT_LEDGER} WHERE n.name LIKE ?1 ESCAPE '\\' ORDER BY n.name, l.year"
    ))?;

    let ledgers = stmt
        .query_map([pattern], ledger_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ledgers)
}

// ============================================================================
// RESIDENCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Residence {
    pub id: i64,
    pub person_id: i64,
    pub written_date: Option<String>,
    pub date: Option<NaiveDate>,
    pub location_id: i64,
    pub location_name: String,
}

/// Record a residence; the same (person, written date, place) is stored once
pub fn add_residence(
    conn: &Connection,
    person_id: i64,
    written_date: Option<&str>,
    date: Option<NaiveDate>,
    location_id: i64,
) -> rusqlite::Result<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM residence
             WHERE person_id = ?1 AND written_date IS ?2 AND location_id = ?3",
            params![person_id, written_date, location_id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO residence (person_id, written_date, date, location_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            person_id,
            written_date,
            date.map(|d| d.format("%Y-%m-%d").to_string()),
            location_id,
        ],
    )?;
    Ok(true)
}

/// Residences of one person, in the order they were recorded
pub fn residences_for_person(conn: &Connection, person_id: i64) -> rusqlite::Result<Vec<Residence>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.person_id, r.written_date, r.date, r.location_id, l.name
         FROM residence r JOIN location l ON l.id = r.location_id
         WHERE r.person_id = ?1
         ORDER BY r.id",
    )?;

    let rows = stmt
        .query_map([person_id], |row| {
            let date: Option<String> = row.get(3)?;
            Ok(Residence {
                id: row.get(0)?,
                person_id: row.get(1)?,
                written_date: row.get(2)?,
                date: date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
                location_id: row.get(4)?,
                location_name: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
