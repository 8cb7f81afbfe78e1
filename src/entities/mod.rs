// Entity Models - the relational schema of the sacramental records
//
// Each entity module owns its table(s):
// - lookup: categories, races, places, notaries (unique by name)
// - person: people and their aliases/occupations
// - event: events, participant roles, witnesses
// - ledger: notary ledgers and residences

pub mod lookup;
pub mod person;
pub mod event;
pub mod ledger;

pub use lookup::{Lookup, LookupCache, LookupKind, title_case};
pub use person::Person;
pub use event::{Event, EventKind, NewEvent, Role, Witness, WitnessKind};
pub use ledger::{Ledger, Residence};
