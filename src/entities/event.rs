// 📅 Events - births, baptisms, marriages, deaths, manumissions
//
// An event is a dated occurrence with people attached in roles. The
// written date is kept exactly as transcribed; the parsed date sits
// beside it in ISO form.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// CATEGORIES AND ROLES
// ============================================================================

/// Event categories the importer creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Birth,
    Baptism,
    Marriage,
    Death,
    Manumission,
}

impl EventKind {
    /// Category name as stored in `event_category.name`
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Birth => "birth",
            EventKind::Baptism => "baptism",
            EventKind::Marriage => "marriage",
            EventKind::Death => "death",
            EventKind::Manumission => "manumission",
        }
    }

    pub const ALL: [EventKind; 5] = [
        EventKind::Birth,
        EventKind::Baptism,
        EventKind::Marriage,
        EventKind::Death,
        EventKind::Manumission,
    ];
}

/// Capacity in which a person takes part in an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Principal,
    Spouse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Principal => "principal",
            Role::Spouse => "spouse",
        }
    }
}

/// Witness categories the importer creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessKind {
    Wedding,
    Godfather,
    Godmother,
}

impl WitnessKind {
    pub fn name(&self) -> &'static str {
        match self {
            WitnessKind::Wedding => "wedding",
            WitnessKind::Godfather => "godfather",
            WitnessKind::Godmother => "godmother",
        }
    }

    pub const ALL: [WitnessKind; 3] = [
        WitnessKind::Wedding,
        WitnessKind::Godfather,
        WitnessKind::Godmother,
    ];
}

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: i64,
    pub category_id: i64,
    pub written_date: Option<String>,
    pub date: Option<NaiveDate>,
    pub location_id: Option<i64>,
    pub ledger_id: Option<i64>,
}

impl Event {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
        let date: Option<String> = row.get("date")?;
        let date = match date {
            Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?),
            None => None,
        };

        Ok(Event {
            id: row.get("id")?,
            category_id: row.get("category_id")?,
            written_date: row.get("written_date")?,
            date,
            location_id: row.get("location_id")?,
            ledger_id: row.get("ledger_id")?,
        })
    }
}

/// Fields of an event about to be created
#[derive(Debug, Clone, Default)]
pub struct NewEvent<'a> {
    pub written_date: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub location_id: Option<i64>,
    pub ledger_id: Option<i64>,
}

pub fn create(conn: &Connection, category_id: i64, new: &NewEvent<'_>) -> rusqlite::Result<Event> {
    conn.execute(
        "INSERT INTO event (category_id, written_date, date, location_id, ledger_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            category_id,
            new.written_date,
            new.date.map(|d| d.format("%Y-%m-%d").to_string()),
            new.location_id,
            new.ledger_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, category_id, written_date = new.written_date, "created event");

    Ok(Event {
        id,
        category_id,
        written_date: new.written_date.map(str::to_string),
        date: new.date,
        location_id: new.location_id,
        ledger_id: new.ledger_id,
    })
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Event>> {
    conn.query_row(
        "SELECT id, category_id, written_date, date, location_id, ledger_id
         FROM event WHERE id = ?1",
        [id],
        Event::from_row,
    )
    .optional()
}

/// Event of a category where the person is principal, matched on written date
pub fn find_for_principal(
    conn: &Connection,
    category_id: i64,
    person_id: i64,
    written_date: Option<&str>,
) -> rusqlite::Result<Option<Event>> {
    conn.query_row(
        "SELECT e.id, e.category_id, e.written_date, e.date, e.location_id, e.ledger_id
         FROM event e
         JOIN event_participant p ON p.event_id = e.id
         WHERE e.category_id = ?1 AND p.person_id = ?2 AND p.role = 'principal'
           AND e.written_date IS ?3
         ORDER BY e.id LIMIT 1",
        params![category_id, person_id, written_date],
        Event::from_row,
    )
    .optional()
}

pub fn add_participant(
    conn: &Connection,
    event_id: i64,
    person_id: i64,
    role: Role,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO event_participant (event_id, person_id, role) VALUES (?1, ?2, ?3)",
        params![event_id, person_id, role.as_str()],
    )?;
    Ok(inserted > 0)
}

/// Person ids taking part in an event in a role
pub fn participants(conn: &Connection, event_id: i64, role: Role) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT person_id FROM event_participant WHERE event_id = ?1 AND role = ?2 ORDER BY rowid",
    )?;
    let ids = stmt
        .query_map(params![event_id, role.as_str()], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Events of a category in which the person is principal
pub fn for_principal(
    conn: &Connection,
    category_id: i64,
    person_id: i64,
) -> rusqlite::Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.category_id, e.written_date, e.date, e.location_id, e.ledger_id
         FROM event e
         JOIN event_participant p ON p.event_id = e.id
         WHERE e.category_id = ?1 AND p.person_id = ?2 AND p.role = 'principal'
         ORDER BY e.id",
    )?;
    let events = stmt
        .query_map(params![category_id, person_id], Event::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

// ============================================================================
// WITNESS
// ============================================================================

/// Who witnessed which event, in what capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Witness {
    pub id: i64,
    pub person_id: i64,
    pub event_id: i64,
    pub category_id: i64,
}

/// Record a witness; a repeat of the same triple is ignored
pub fn add_witness(
    conn: &Connection,
    person_id: i64,
    event_id: i64,
    category_id: i64,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO witness (person_id, event_id, category_id) VALUES (?1, ?2, ?3)",
        params![person_id, event_id, category_id],
    )?;
    Ok(inserted > 0)
}

pub fn witnesses(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Witness>> {
    let mut stmt = conn.prepare(
        "SELECT id, person_id, event_id, category_id FROM witness WHERE event_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([event_id], |row| {
            Ok(Witness {
                id: row.get(0)?,
                person_id: row.get(1)?,
                event_id: row.get(2)?,
                category_id: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
