// Import pipeline
//
// - dates: written date columns → NaiveDate
// - service: one row → facts attached to a person
// - sacrament: CSV files → per-row transactions, failures reported
// - event_categories: CSV files → event category lookups

pub mod dates;
pub mod event_categories;
pub mod sacrament;
pub mod service;

pub use event_categories::{import_event_categories, EventCategoryReport};
pub use sacrament::{ImportReport, SacramentImporter};
pub use service::ImportService;
