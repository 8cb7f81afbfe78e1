// 🌱 Reference data - default categories every records database starts with

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::entities::event::{EventKind, WitnessKind};
use crate::entities::lookup::{self, LookupKind};

/// Location categories loaded by `seed_defaults`
pub const LOCATION_CATEGORIES: [&str; 1] = ["church"];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}

/// Load the default event, witness and location categories.
/// Running it again changes nothing.
pub fn seed_defaults(conn: &Connection) -> rusqlite::Result<SeedReport> {
    let event_categories = EventKind::ALL.iter().map(|k| (LookupKind::EventCategory, k.name()));
    let witness_categories = WitnessKind::ALL
        .iter()
        .map(|k| (LookupKind::WitnessCategory, k.name()));
    let location_categories = LOCATION_CATEGORIES
        .iter()
        .map(|name| (LookupKind::LocationCategory, *name));

    let mut report = SeedReport::default();
    for (kind, name) in event_categories
        .chain(witness_categories)
        .chain(location_categories)
    {
        let (_, created) = lookup::find_or_create(conn, kind, name)?;
        if created {
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    info!(created = report.created, existing = report.existing, "seeded reference data");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, setup_database};

    #[test]
    fn test_seed_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let first = seed_defaults(&conn).unwrap();
        let second = seed_defaults(&conn).unwrap();

        assert_eq!(first.created, 9);
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 9);
        assert_eq!(count_rows(&conn, "event_category").unwrap(), 5);
        assert_eq!(count_rows(&conn, "witness_category").unwrap(), 3);

        let wedding = lookup::find(&conn, LookupKind::WitnessCategory, "wedding")
            .unwrap()
            .unwrap();
        assert_eq!(wedding.label.as_deref(), Some("Wedding"));
        let church = lookup::find(&conn, LookupKind::LocationCategory, "church")
            .unwrap()
            .unwrap();
        assert_eq!(church.label.as_deref(), Some("Church"));
    }
}
