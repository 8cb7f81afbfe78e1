// 📥 Sacrament import command - CSV files → entity graph, one transaction per row
//
// A bad row never stops the batch: its transaction is rolled back, the
// failure is printed as "{file}:{row} - {message}" and the next row runs.

use csv::{ByteRecord, ReaderBuilder};
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::columns::{check_width, SacramentRow};
use crate::db::{insert_audit_entry, row_fingerprint, AuditEntry};
use crate::entities::lookup::LookupCache;
use crate::entities::person::Person;
use crate::error::{Result, RowImportError};
use crate::import::service::ImportService;
use crate::normalizer::normalize_record;
use crate::unit_of_work::RowScope;

/// Actor recorded on audit entries written by this importer
pub const ACTOR: &str = "sacrament_importer";

/// Outcome of one `SacramentImporter::run`
#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: usize,
    /// Files rejected as a whole (unreadable, or a header of the wrong width)
    pub files_rejected: usize,
    pub rows_imported: usize,
    pub failures: Vec<RowImportError>,
}

impl ImportReport {
    pub fn rows_failed(&self) -> usize {
        self.failures.len() - self.files_rejected
    }

    fn record_failure(&mut self, failure: RowImportError) {
        println!("{}", failure);
        warn!(
            file = %failure.file,
            row = failure.row,
            error = %failure.source,
            "row import failed"
        );
        self.failures.push(failure);
    }
}

/// 1-based line on which a record's data starts in `raw`.
///
/// The reader stamps a record's position before the blank lines it skips,
/// so the newlines between that offset and the data are counted here.
pub(crate) fn physical_line(raw: &[u8], record: &ByteRecord) -> Option<usize> {
    let pos = record.position()?;
    let start = usize::try_from(pos.byte()).ok()?;
    let blank_lines = raw
        .get(start..)?
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|b| **b == b'\n')
        .count();
    Some(pos.line() as usize + blank_lines)
}

pub struct SacramentImporter {
    skip: usize,
    service: ImportService,
}

impl SacramentImporter {
    pub fn new(skip: usize) -> Self {
        SacramentImporter {
            skip,
            service: ImportService::new(),
        }
    }

    /// Import every file in order. Failures are reported, never returned.
    pub fn run<P: AsRef<Path>>(&self, conn: &mut Connection, files: &[P]) -> ImportReport {
        let mut report = ImportReport::default();
        let mut lookups = LookupCache::new();

        for path in files {
            report.files += 1;
            self.import_file(conn, &mut lookups, path.as_ref(), &mut report);
        }

        info!(
            files = report.files,
            imported = report.rows_imported,
            failed = report.failures.len(),
            "sacrament import finished"
        );
        report
    }

    fn import_file(
        &self,
        conn: &mut Connection,
        lookups: &mut LookupCache,
        path: &Path,
        report: &mut ImportReport,
    ) {
        let file = path.display().to_string();

        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                report.files_rejected += 1;
                report.record_failure(RowImportError::new(&file, 0, e.into()));
                return;
            }
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(raw.as_slice());

        let mut record = ByteRecord::new();
        let mut records = 0;
        let mut last_line = 0;
        let mut imported = 0;
        let mut failed = 0;

        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => records += 1,
                Ok(false) => break,
                Err(e) => {
                    // The reader cannot resync after an I/O error
                    report.record_failure(RowImportError::new(&file, last_line + 1, e.into()));
                    failed += 1;
                    break;
                }
            }

            // Blank lines yield no record; rows are numbered by physical line
            let row_number = physical_line(&raw, &record).unwrap_or(records);
            last_line = row_number;

            if row_number <= self.skip {
                if records == 1 {
                    if let Err(e) = check_width(record.len()) {
                        report.files_rejected += 1;
                        report.record_failure(RowImportError::new(&file, row_number, e));
                        return;
                    }
                }
                continue;
            }

            let fields = normalize_record(&record);
            match self.import_record(conn, lookups, &file, row_number, fields) {
                Ok(_) => imported += 1,
                Err(e) => {
                    report.record_failure(RowImportError::new(&file, row_number, e));
                    failed += 1;
                }
            }
        }

        report.rows_imported += imported;
        info!(file = %file, imported, failed, "imported file");
    }

    /// Import one normalized row inside its own transaction
    pub fn import_record(
        &self,
        conn: &mut Connection,
        lookups: &mut LookupCache,
        file: &str,
        row_number: usize,
        fields: Vec<String>,
    ) -> Result<Person> {
        let row = SacramentRow::new(fields)?;
        let mut scope = RowScope::begin(conn, lookups)?;

        match self.import_in_scope(&mut scope, file, row_number, &row) {
            Ok(person) => {
                scope.commit()?;
                Ok(person)
            }
            Err(e) => {
                scope.discard();
                Err(e)
            }
        }
    }

    fn import_in_scope(
        &self,
        scope: &mut RowScope<'_, '_>,
        file: &str,
        row_number: usize,
        row: &SacramentRow,
    ) -> Result<Person> {
        let person = self.service.import_row(scope, row)?;

        let entry = AuditEntry::new(
            "row_imported",
            "person",
            person.id,
            json!({
                "file": file,
                "row": row_number,
                "fingerprint": row_fingerprint(row.fields()),
            }),
            ACTOR,
        );
        insert_audit_entry(scope.conn(), &entry)?;

        Ok(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{Column, COLUMN_COUNT};
    use crate::db::{count_rows, get_audit_entries, setup_database, table_counts};
    use crate::error::ImportError;
    use crate::entities::{event, person};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn header() -> String {
        Column::ALL.iter().map(|c| c.name()).collect::<Vec<_>>().join(",")
    }

    fn line(values: &[(Column, &str)]) -> String {
        let mut fields = vec![""; COLUMN_COUNT];
        for (column, value) in values {
            fields[column.index()] = *value;
        }
        fields.join(",")
    }

    fn john_smith_birth() -> String {
        line(&[
            (Column::LastName, "Smith"),
            (Column::FirstName, "John"),
            (Column::Race, "1"),
            (Column::Sex, "M"),
            (Column::BirthDate, "01/02/1800"),
        ])
    }

    fn write_csv(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    #[test]
    fn test_end_to_end_birth_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "births.csv", &[header(), john_smith_birth()]);
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        assert!(report.failures.is_empty());

        let people = person::typeahead(&conn, "Smith", 10).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].full_name(), "John Smith");

        let birth = event::get(&conn, people[0].birth_id.unwrap()).unwrap().unwrap();
        assert_eq!(birth.date, NaiveDate::from_ymd_opt(1800, 2, 1));
        assert_eq!(count_rows(&conn, "event").unwrap(), 1);
        assert_eq!(count_rows(&conn, "event_participant").unwrap(), 1);

        let audit = get_audit_entries(&conn, "person", people[0].id).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor, ACTOR);
        assert_eq!(audit[0].data["row"], 2);
        assert_eq!(audit[0].data["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_second_run_creates_nothing_new() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "mixed.csv",
            &[
                header(),
                john_smith_birth(),
                line(&[
                    (Column::LastName, "Dupré"),
                    (Column::FirstName, "Marie"),
                    (Column::Sex, "F"),
                    (Column::BaptismDate, "10/02/1800"),
                    (Column::BaptismPlace, "St. Louis Cathedral"),
                    (Column::GodmotherFirstName, "Anne"),
                    (Column::GodmotherLastName, "Jones"),
                ]),
            ],
        );
        let mut conn = test_db();
        let importer = SacramentImporter::new(1);

        importer.run(&mut conn, &[&path]);
        let before = table_counts(&conn).unwrap();
        let report = importer.run(&mut conn, &[&path]);
        let after = table_counts(&conn).unwrap();

        assert_eq!(report.rows_imported, 2);
        for ((table, n_before), (_, n_after)) in before.iter().zip(after.iter()) {
            if *table == "audit_log" {
                assert_eq!(*n_after, n_before + 2);
            } else {
                assert_eq!(n_before, n_after, "{} grew on re-import", table);
            }
        }
    }

    #[test]
    fn test_failed_row_rolls_back_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "batch.csv",
            &[
                header(),
                john_smith_birth(),
                // Godparent without a baptism: creates a race, a person and a
                // location before failing
                line(&[
                    (Column::LastName, "Roche"),
                    (Column::FirstName, "Pierre"),
                    (Column::Race, "7"),
                    (Column::Sex, "M"),
                    (Column::BirthPlace, "Pointe Coupée"),
                    (Column::GodfatherLastName, "Jones"),
                ]),
                line(&[
                    (Column::LastName, "Jones"),
                    (Column::FirstName, "Paul"),
                    (Column::Sex, "M"),
                    (Column::DeathDate, "1831-07-14"),
                ]),
            ],
        );
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 2);
        assert_eq!(report.rows_failed(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.row, 3);
        assert_eq!(
            failure.to_string(),
            format!("{}:3 - godparents requires a baptism in the same row", path.display())
        );

        assert_eq!(count_rows(&conn, "person").unwrap(), 2);
        assert_eq!(count_rows(&conn, "race").unwrap(), 1);
        assert_eq!(count_rows(&conn, "location").unwrap(), 0);
        assert_eq!(count_rows(&conn, "event").unwrap(), 2);
        assert_eq!(count_rows(&conn, "event_participant").unwrap(), 2);
        assert_eq!(count_rows(&conn, "witness").unwrap(), 0);
        assert_eq!(count_rows(&conn, "audit_log").unwrap(), 2);
    }

    #[test]
    fn test_row_numbers_count_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "gaps.csv",
            &[
                header(),
                String::new(),
                line(&[
                    (Column::LastName, "Roche"),
                    (Column::FirstName, "Pierre"),
                    (Column::DeathDate, "garbage"),
                ]),
                String::new(),
                String::new(),
                john_smith_birth(),
            ],
        );
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].to_string(),
            format!("{}:3 - cannot parse death_date \"garbage\" as a date", path.display())
        );

        let smith = person::typeahead(&conn, "Smith", 10).unwrap();
        let audit = get_audit_entries(&conn, "person", smith[0].id).unwrap();
        assert_eq!(audit[0].data["row"], 6);
    }

    #[test]
    fn test_short_row_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "short.csv",
            &[header(), "Smith,John,1,M".to_string(), john_smith_birth()],
        );
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        assert!(matches!(
            report.failures[0].source,
            ImportError::ColumnCountMismatch { expected: COLUMN_COUNT, found: 4 }
        ));
        assert_eq!(report.failures[0].row, 2);
    }

    #[test]
    fn test_row_numbers_with_crlf_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.csv");
        let bad = line(&[(Column::LastName, "Roche"), (Column::BirthDate, "1800")]);
        let text = [header(), String::new(), john_smith_birth(), bad].join("\r\n") + "\r\n";
        fs::write(&path, text).unwrap();
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        assert_eq!(report.failures[0].row, 4);
    }

    #[test]
    fn test_narrow_header_rejects_file_but_not_batch() {
        let dir = TempDir::new().unwrap();
        let narrow = write_csv(&dir, "narrow.csv", &["a,b,c".to_string(), john_smith_birth()]);
        let good = write_csv(&dir, "good.csv", &[header(), john_smith_birth()]);
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&narrow, &good]);

        assert_eq!(report.files, 2);
        assert_eq!(report.rows_imported, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row, 1);
        assert_eq!(report.files_rejected, 1);
    }

    #[test]
    fn test_missing_file_is_row_zero() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.csv");
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&missing]);

        assert_eq!(report.rows_imported, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row, 0);
        assert!(matches!(report.failures[0].source, ImportError::Io(_)));
        assert_eq!(report.rows_failed(), 0);
        assert_eq!(report.files_rejected, 1);
    }

    #[test]
    fn test_skip_zero_imports_first_line() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "noheader.csv", &[john_smith_birth()]);
        let mut conn = test_db();

        let report = SacramentImporter::new(0).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        let audit = get_audit_entries(&conn, "person", 1).unwrap();
        assert_eq!(audit[0].data["row"], 1);
    }

    #[test]
    fn test_latin1_bytes_do_not_abort_the_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut bytes = header().into_bytes();
        bytes.push(b'\n');
        bytes.extend_from_slice(b"Dupr\xe9,Marie");
        bytes.extend_from_slice(",".repeat(COLUMN_COUNT - 2).as_bytes());
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();
        let mut conn = test_db();

        let report = SacramentImporter::new(1).run(&mut conn, &[&path]);

        assert_eq!(report.rows_imported, 1);
        let people = person::typeahead(&conn, "Dupr", 10).unwrap();
        assert_eq!(people[0].last_name, "Dupr\u{fffd}");
    }
}
