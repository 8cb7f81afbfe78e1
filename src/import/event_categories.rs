// Event category import - one category name per row, in column 0
//
// Runs in autocommit mode: each new category is stored as soon as it is
// seen, and the first error ends the command. Categories stored before
// the error stay.

use csv::ReaderBuilder;
use rusqlite::Connection;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::entities::lookup::{self, LookupKind};
use crate::error::RowImportError;
use crate::import::sacrament::physical_line;
use crate::normalizer::normalize_field;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EventCategoryReport {
    pub created: usize,
    pub existing: usize,
    pub skipped_blank: usize,
}

pub fn import_event_categories<P: AsRef<Path>>(
    conn: &Connection,
    files: &[P],
    skip: usize,
) -> Result<EventCategoryReport, RowImportError> {
    let mut report = EventCategoryReport::default();

    for path in files {
        let path = path.as_ref();
        let file = path.display().to_string();

        let raw = fs::read(path).map_err(|e| RowImportError::new(&file, 0, e.into()))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(raw.as_slice());

        let before = report.clone();
        for (i, result) in reader.byte_records().enumerate() {
            let record = result.map_err(|e| RowImportError::new(&file, i + 1, e.into()))?;
            let row_number = physical_line(&raw, &record).unwrap_or(i + 1);
            if row_number <= skip {
                continue;
            }

            let name = normalize_field(record.get(0).unwrap_or_default());
            if name.is_empty() {
                report.skipped_blank += 1;
                continue;
            }

            let (_, created) = lookup::find_or_create(conn, LookupKind::EventCategory, &name)
                .map_err(|e| RowImportError::new(&file, row_number, e.into()))?;
            if created {
                report.created += 1;
            } else {
                report.existing += 1;
            }
        }

        info!(
            file = %file,
            created = report.created - before.created,
            existing = report.existing - before.existing,
            "imported event categories"
        );
    }

    Ok(report)
}
