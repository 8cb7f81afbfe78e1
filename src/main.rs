// Sacramental Records - command line
//
// sen [--database PATH] import:sacrament FILE... [--skip N]
// sen [--database PATH] import:event-categories FILE... [--skip N]
// sen [--database PATH] seed
// sen [--database PATH] stats

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use sen_records::config::{self, DEFAULT_SKIP};
use sen_records::{import_event_categories, open_database, seed_defaults, table_counts, SacramentImporter};

/// Import sacramental records into a SQLite database
#[derive(Parser, Debug)]
#[command(name = "sen")]
#[command(about = "Sacramental records importer")]
#[command(version)]
struct Args {
    /// Database file (falls back to SEN_DATABASE, then sen.db)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import sacrament transcription CSV files, one transaction per row
    #[command(name = "import:sacrament")]
    ImportSacrament {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Header rows to skip in each file
        #[arg(long, default_value_t = DEFAULT_SKIP)]
        skip: usize,
    },

    /// Import event category names from column 0 of CSV files
    #[command(name = "import:event-categories")]
    ImportEventCategories {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Header rows to skip in each file
        #[arg(long, default_value_t = DEFAULT_SKIP)]
        skip: usize,
    },

    /// Load the default event, witness and location categories
    Seed,

    /// Print row counts per table
    Stats,
}

fn main() -> Result<()> {
    config::init_logging();
    let args = Args::parse();

    let db_path = config::database_path(args.database.as_deref());
    info!(database = %db_path.display(), "opening database");
    let mut conn = open_database(&db_path)?;

    match args.command {
        Command::ImportSacrament { files, skip } => {
            let report = SacramentImporter::new(skip).run(&mut conn, &files);
            println!(
                "✓ Imported {} rows from {} files ({} rows failed, {} files rejected)",
                report.rows_imported,
                report.files,
                report.rows_failed(),
                report.files_rejected
            );
            // Row failures were already printed; the exit status stays 0
        }
        Command::ImportEventCategories { files, skip } => {
            let report = import_event_categories(&conn, &files, skip)
                .context("Event category import aborted")?;
            println!(
                "✓ Event categories: {} created, {} already present, {} blank rows skipped",
                report.created, report.existing, report.skipped_blank
            );
        }
        Command::Seed => {
            let report = seed_defaults(&conn).context("Failed to seed reference data")?;
            println!(
                "✓ Reference data: {} created, {} already present",
                report.created, report.existing
            );
        }
        Command::Stats => {
            println!("📊 {}", db_path.display());
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for (table, count) in table_counts(&conn)? {
                println!("{:<20} {:>8}", table, count);
            }
        }
    }

    Ok(())
}
