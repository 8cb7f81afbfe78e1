// Sacramental Records - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod normalizer;     // Row Normalizer - bytes → clean NFC strings
pub mod columns;        // Column Schema - positional row layout
pub mod entities;       // Entity Resolver - lookups, persons, events, ledgers
pub mod unit_of_work;   // Per-row transaction + lookup cache
pub mod import;         // Import Service and commands
pub mod seed;

// Re-export commonly used types
pub use db::{
    AuditEntry, TABLES,
    open_database, setup_database, table_counts, count_rows,
    insert_audit_entry, get_audit_entries, row_fingerprint,
};
pub use error::{ImportError, RowImportError};
pub use normalizer::{normalize_field, normalize_record};
pub use columns::{Column, SacramentRow, COLUMN_COUNT};
pub use entities::{
    Lookup, LookupCache, LookupKind,
    Person, Event, EventKind, Role, Witness, WitnessKind,
    Ledger, Residence,
};
pub use unit_of_work::RowScope;
pub use import::{
    ImportService, SacramentImporter, ImportReport,
    import_event_categories, EventCategoryReport,
};
pub use seed::{seed_defaults, SeedReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
