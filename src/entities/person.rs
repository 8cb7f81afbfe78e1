// 👤 Person Entity - identity is (first name, last name, race, sex)
//
// A person is created the first time a row names them and then collects
// facts from every later row that mentions them again, as principal,
// parent, godparent, spouse or witness. The importer never deletes one.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

/// Sex written for the principal's spouse, given the principal's sex
pub fn opposite_sex(sex: &str) -> &'static str {
    match sex {
        "M" | "m" => "F",
        "F" | "f" => "M",
        _ => "",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub race_id: Option<i64>,
    pub sex: String,

    // Facts attached by the importer
    pub written_race: Option<String>,
    pub status: Option<String>,
    pub birth_status: Option<String>,
    pub native_id: Option<i64>,
    pub notes: Option<String>,

    // Links to events and relatives
    pub birth_id: Option<i64>,
    pub baptism_id: Option<i64>,
    pub death_id: Option<i64>,
    pub father_id: Option<i64>,
    pub mother_id: Option<i64>,
}

impl Person {
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            _ => self.last_name.clone(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
        Ok(Person {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            race_id: row.get("race_id")?,
            sex: row.get("sex")?,
            written_race: row.get("written_race")?,
            status: row.get("status")?,
            birth_status: row.get("birth_status")?,
            native_id: row.get("native_id")?,
            notes: row.get("notes")?,
            birth_id: row.get("birth_id")?,
            baptism_id: row.get("baptism_id")?,
            death_id: row.get("death_id")?,
            father_id: row.get("father_id")?,
            mother_id: row.get("mother_id")?,
        })
    }
}

const SELECT_PERSON: &str = "SELECT id, first_name, last_name, race_id, sex, written_race, status,
        birth_status, native_id, notes, birth_id, baptism_id, death_id, father_id, mother_id
     FROM person";

/// Exact match on the identity tuple; a missing race only matches a missing race
pub fn find(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    race_id: Option<i64>,
    sex: &str,
) -> rusqlite::Result<Option<Person>> {
    conn.query_row(
        &format!(
            "{SELECT_PERSON}
             WHERE first_name = ?1 AND last_name = ?2 AND race_id IS ?3 AND sex = ?4
             ORDER BY id LIMIT 1"
        ),
        params![first_name, last_name, race_id, sex],
        Person::from_row,
    )
    .optional()
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Person>> {
    conn.query_row(
        &format!("{SELECT_PERSON} WHERE id = ?1"),
        [id],
        Person::from_row,
    )
    .optional()
}

pub fn create(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    race_id: Option<i64>,
    sex: &str,
) -> rusqlite::Result<Person> {
    conn.execute(
        "INSERT INTO person (first_name, last_name, race_id, sex) VALUES (?1, ?2, ?3, ?4)",
        params![first_name, last_name, race_id, sex],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, first_name, last_name, sex, "created person");

    Ok(Person {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        race_id,
        sex: sex.to_string(),
        written_race: None,
        status: None,
        birth_status: None,
        native_id: None,
        notes: None,
        birth_id: None,
        baptism_id: None,
        death_id: None,
        father_id: None,
        mother_id: None,
    })
}

/// Resolve the person with this identity, creating them if unseen
pub fn find_or_create(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    race_id: Option<i64>,
    sex: &str,
) -> rusqlite::Result<Person> {
    match find(conn, first_name, last_name, race_id, sex)? {
        Some(person) => Ok(person),
        None => create(conn, first_name, last_name, race_id, sex),
    }
}

/// Write every mutable fact of the person back to storage
pub fn save(conn: &Connection, person: &Person) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE person SET
            written_race = ?2, status = ?3, birth_status = ?4, native_id = ?5, notes = ?6,
            birth_id = ?7, baptism_id = ?8, death_id = ?9, father_id = ?10, mother_id = ?11
         WHERE id = ?1",
        params![
            person.id,
            person.written_race,
            person.status,
            person.birth_status,
            person.native_id,
            person.notes,
            person.birth_id,
            person.baptism_id,
            person.death_id,
            person.father_id,
            person.mother_id,
        ],
    )?;
    Ok(())
}

pub fn add_alias(conn: &Connection, person_id: i64, alias: &str) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO person_alias (person_id, alias) VALUES (?1, ?2)",
        params![person_id, alias],
    )?;
    Ok(inserted > 0)
}

pub fn aliases(conn: &Connection, person_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT alias FROM person_alias WHERE person_id = ?1 ORDER BY rowid")?;
    let aliases = stmt
        .query_map([person_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(aliases)
}

pub fn add_occupation(conn: &Connection, person_id: i64, occupation: &str) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO person_occupation (person_id, occupation) VALUES (?1, ?2)",
        params![person_id, occupation],
    )?;
    Ok(inserted > 0)
}

pub fn occupations(conn: &Connection, person_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT occupation FROM person_occupation WHERE person_id = ?1 ORDER BY rowid")?;
    let occupations = stmt
        .query_map([person_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(occupations)
}

/// Persons whose last or first name starts with `q`
pub fn typeahead(conn: &Connection, q: &str, limit: usize) -> rusqlite::Result<Vec<Person>> {
    let pattern = format!("{}%", escape_like(q));
    let mut stmt = conn.prepare(&format!(
        "{SELECT_PERSON}
         WHERE last_name LIKE ?1 ESCAPE '\\' OR first_name LIKE ?1 ESCAPE '\\'
         ORDER BY last_name, first_name, id
         LIMIT ?2"
    ))?;

    let people = stmt
        .query_map(params![pattern, limit as i64], Person::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(people)
}

/// Escape LIKE wildcards so user input matches literally
pub fn escape_like(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
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
    fn test_find_or_create_is_idempotent() {
        let conn = test_db();

        let first = find_or_create(&conn, "John", "Smith", None, "M").unwrap();
        let second = find_or_create(&conn, "John", "Smith", None, "M").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(count_rows(&conn, "person").unwrap(), 1);
    }

    #[test]
    fn test_identity_includes_race_and_sex() {
        let conn = test_db();
        conn.execute("INSERT INTO race (name, label) VALUES ('1', '1')", []).unwrap();
        let race = conn.last_insert_rowid();

        let a = find_or_create(&conn, "Marie", "Smith", None, "F").unwrap();
        let b = find_or_create(&conn, "Marie", "Smith", Some(race), "F").unwrap();
        let c = find_or_create(&conn, "Marie", "Smith", Some(race), "M").unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_eq!(count_rows(&conn, "person").unwrap(), 3);
    }

    #[test]
    fn test_save_round_trips_facts() {
        let conn = test_db();
        let mut person = find_or_create(&conn, "John", "Smith", None, "M").unwrap();
        person.status = Some("free".to_string());
        person.notes = Some("left margin illegible".to_string());
        save(&conn, &person).unwrap();

        let loaded = get(&conn, person.id).unwrap().unwrap();
        assert_eq!(loaded, person);
    }

    #[test]
    fn test_aliases_and_occupations_ignore_duplicates() {
        let conn = test_db();
        let person = find_or_create(&conn, "John", "Smith", None, "M").unwrap();

        assert!(add_alias(&conn, person.id, "Jack").unwrap());
        assert!(!add_alias(&conn, person.id, "Jack").unwrap());
        assert!(add_occupation(&conn, person.id, "carpenter").unwrap());
        assert!(!add_occupation(&conn, person.id, "carpenter").unwrap());

        assert_eq!(aliases(&conn, person.id).unwrap(), vec!["Jack"]);
        assert_eq!(occupations(&conn, person.id).unwrap(), vec!["carpenter"]);
    }

    #[test]
    fn test_typeahead_prefix() {
        let conn = test_db();
        find_or_create(&conn, "John", "Smith", None, "M").unwrap();
        find_or_create(&conn, "Anne", "Smithson", None, "F").unwrap();
        find_or_create(&conn, "Paul", "Jones", None, "M").unwrap();

        let names: Vec<String> = typeahead(&conn, "Smith", 10)
            .unwrap()
            .iter()
            .map(Person::full_name)
            .collect();
        assert_eq!(names, vec!["John Smith", "Anne Smithson"]);

        assert_eq!(typeahead(&conn, "Pa", 10).unwrap().len(), 1);
        assert!(typeahead(&conn, "%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_opposite_sex() {
        assert_eq!(opposite_sex("M"), "F");
        assert_eq!(opposite_sex("f"), "M");
        assert_eq!(opposite_sex(""), "");
        assert_eq!(opposite_sex("?"), "");
    }
}
