// 🏷️ Lookup entities - small reference tables resolved by exact name
//
// Categories, races, places and notaries are shared across thousands of
// rows. Each one is found by its exact name or created on first sight,
// never twice. Labelled kinds derive their label by title-casing the name.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// LOOKUP KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    EventCategory,
    WitnessCategory,
    LocationCategory,
    Race,
    Location,
    Notary,
}

impl LookupKind {
    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::EventCategory => "event_category",
            LookupKind::WitnessCategory => "witness_category",
            LookupKind::LocationCategory => "location_category",
            LookupKind::Race => "race",
            LookupKind::Location => "location",
            LookupKind::Notary => "notary",
        }
    }

    /// Whether rows of this kind carry a display label
    pub fn has_label(&self) -> bool {
        !matches!(self, LookupKind::Location | LookupKind::Notary)
    }
}

// ============================================================================
// LOOKUP ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub id: i64,
    pub name: String,
    pub label: Option<String>,
}

/// Title-case a name the way multibyte title casing does.
///
/// A letter is upper-cased unless the last significant character before it
/// was a cased letter, in which case it is lower-cased. Case-ignorable
/// characters (apostrophes, periods, combining marks) are not significant,
/// so "o'brien" stays one word while a digit ends one ("1st" → "1St").
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut after_cased = false;

    for c in name.chars() {
        if after_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        if !is_case_ignorable(c) {
            after_cased = c.is_lowercase() || c.is_uppercase();
        }
    }

    out
}

/// Characters that neither start nor end a word when title-casing
fn is_case_ignorable(c: char) -> bool {
    matches!(
        c,
        '\'' | '.' | ':' | '^' | '`'
            | '\u{a8}' | '\u{ad}' | '\u{af}' | '\u{b4}' | '\u{b7}' | '\u{b8}'
            | '\u{2018}' | '\u{2019}' | '\u{2024}' | '\u{2027}'
            | '\u{200b}'..='\u{200f}'
            | '\u{300}'..='\u{36f}'
            | '\u{1ab0}'..='\u{1aff}'
            | '\u{1dc0}'..='\u{1dff}'
            | '\u{20d0}'..='\u{20ff}'
            | '\u{fe20}'..='\u{fe2f}'
    )
}

pub fn find(conn: &Connection, kind: LookupKind, name: &str) -> rusqlite::Result<Option<Lookup>> {
    let sql = if kind.has_label() {
        format!("SELECT id, name, label FROM {} WHERE name = ?1", kind.table())
    } else {
        format!("SELECT id, name, NULL FROM {} WHERE name = ?1", kind.table())
    };

    conn.query_row(&sql, [name], |row| {
        Ok(Lookup {
            id: row.get(0)?,
            name: row.get(1)?,
            label: row.get(2)?,
        })
    })
    .optional()
}

pub fn create(conn: &Connection, kind: LookupKind, name: &str) -> rusqlite::Result<Lookup> {
    let label = if kind.has_label() {
        let label = title_case(name);
        conn.execute(
            &format!("INSERT INTO {} (name, label) VALUES (?1, ?2)", kind.table()),
            params![name, label],
        )?;
        Some(label)
    } else {
        conn.execute(
            &format!("INSERT INTO {} (name) VALUES (?1)", kind.table()),
            [name],
        )?;
        None
    };

    let id = conn.last_insert_rowid();
    debug!(table = kind.table(), id, name, "created lookup");

    Ok(Lookup {
        id,
        name: name.to_string(),
        label,
    })
}

/// Resolve-before-create. Returns the row and whether it was created.
pub fn find_or_create(
    conn: &Connection,
    kind: LookupKind,
    name: &str,
) -> rusqlite::Result<(Lookup, bool)> {
    if let Some(existing) = find(conn, kind, name)? {
        return Ok((existing, false));
    }
    Ok((create(conn, kind, name)?, true))
}

// ============================================================================
// LOOKUP CACHE
// ============================================================================

/// In-memory id cache for lookups across a long import.
///
/// Entries created inside the current row stay pending until the row
/// commits; a rollback drops them so no id of a rolled-back insert is
/// ever handed to a later row.
#[derive(Debug, Default)]
pub struct LookupCache {
    ids: HashMap<(LookupKind, String), i64>,
    pending: Vec<(LookupKind, String)>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: LookupKind, name: &str) -> Option<i64> {
        self.ids.get(&(kind, name.to_string())).copied()
    }

    /// Remember a row that already existed before this row began
    pub fn insert_committed(&mut self, kind: LookupKind, name: &str, id: i64) {
        self.ids.insert((kind, name.to_string()), id);
    }

    /// Remember a row created by the current row
    pub fn insert_pending(&mut self, kind: LookupKind, name: &str, id: i64) {
        let key = (kind, name.to_string());
        self.ids.insert(key.clone(), id);
        self.pending.push(key);
    }

    /// The row committed: pending entries become permanent
    pub fn promote(&mut self) {
        self.pending.clear();
    }

    /// The row rolled back: forget everything it created
    pub fn discard_pending(&mut self) {
        for key in self.pending.drain(..) {
            self.ids.remove(&key);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, setup_database};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("baptism"), "Baptism");
        assert_eq!(title_case("FIRST communion"), "First Communion");
        assert_eq!(title_case("saint-louis"), "Saint-Louis");
        assert_eq!(title_case("élise"), "Élise");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_title_case_word_boundaries() {
        // Apostrophes and periods stay inside a word, digits end one
        assert_eq!(title_case("o'brien"), "O'brien");
        assert_eq!(title_case("st.louis"), "St.louis");
        assert_eq!(title_case("1st baptism"), "1St Baptism");
        assert_eq!(title_case("l\u{2019}ÉGLISE"), "L\u{2019}église");
    }

    #[test]
    fn test_find_or_create_creates_once() {
        let conn = test_db();

        let (first, created1) = find_or_create(&conn, LookupKind::EventCategory, "baptism").unwrap();
        let (second, created2) = find_or_create(&conn, LookupKind::EventCategory, "baptism").unwrap();

        assert!(created1);
        assert!(!created2);
        assert_eq!(first.id, second.id);
        assert_eq!(first.label.as_deref(), Some("Baptism"));
        assert_eq!(count_rows(&conn, "event_category").unwrap(), 1);
    }

    #[test]
    fn test_exact_match_only() {
        let conn = test_db();

        find_or_create(&conn, LookupKind::Location, "St. Louis Cathedral").unwrap();
        find_or_create(&conn, LookupKind::Location, "st. louis cathedral").unwrap();

        assert_eq!(count_rows(&conn, "location").unwrap(), 2);
    }

    #[test]
    fn test_unlabelled_kinds() {
        let conn = test_db();

        let (notary, _) = find_or_create(&conn, LookupKind::Notary, "Pedro Pedesclaux").unwrap();
        assert_eq!(notary.label, None);

        let found = find(&conn, LookupKind::Notary, "Pedro Pedesclaux").unwrap();
        assert_eq!(found, Some(notary));
    }

    #[test]
    fn test_cache_discard_forgets_only_pending() {
        let mut cache = LookupCache::new();
        cache.insert_committed(LookupKind::Race, "1", 1);
        cache.insert_pending(LookupKind::Race, "2", 2);

        assert_eq!(cache.pending_count(), 1);
        cache.discard_pending();

        assert_eq!(cache.get(LookupKind::Race, "1"), Some(1));
        assert_eq!(cache.get(LookupKind::Race, "2"), None);
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_cache_promote_keeps_entries() {
        let mut cache = LookupCache::new();
        cache.insert_pending(LookupKind::Notary, "Broutin", 7);
        cache.promote();
        cache.discard_pending();

        assert_eq!(cache.get(LookupKind::Notary, "Broutin"), Some(7));
        assert_eq!(cache.len(), 1);
    }
}
