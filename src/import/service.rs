// 🧩 Import Service - one transcription row into a linked entity graph
//
// Every operation reads its own columns, does nothing when they are
// blank, and can run again on the same data without duplicating
// anything. The service never commits or rolls back; the caller owns
// the RowScope it is handed.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::columns::{Column, SacramentRow};
use crate::entities::event::{self, Event, EventKind, NewEvent, Role, WitnessKind};
use crate::entities::ledger;
use crate::entities::lookup::LookupKind;
use crate::entities::person::{self, opposite_sex, Person};
use crate::error::{ImportError, Result};
use crate::import::dates::parse_record_date;
use crate::unit_of_work::RowScope;

/// Name and race columns describing a person other than the principal
#[derive(Debug, Clone, Copy)]
pub struct RelatedColumns {
    pub first_name: Column,
    pub last_name: Column,
    pub race: Option<Column>,
}

const FATHER: RelatedColumns = RelatedColumns {
    first_name: Column::FatherFirstName,
    last_name: Column::FatherLastName,
    race: Some(Column::FatherRace),
};
const MOTHER: RelatedColumns = RelatedColumns {
    first_name: Column::MotherFirstName,
    last_name: Column::MotherLastName,
    race: Some(Column::MotherRace),
};
const GODFATHER: RelatedColumns = RelatedColumns {
    first_name: Column::GodfatherFirstName,
    last_name: Column::GodfatherLastName,
    race: Some(Column::GodfatherRace),
};
const GODMOTHER: RelatedColumns = RelatedColumns {
    first_name: Column::GodmotherFirstName,
    last_name: Column::GodmotherLastName,
    race: Some(Column::GodmotherRace),
};
const SPOUSE: RelatedColumns = RelatedColumns {
    first_name: Column::SpouseFirstName,
    last_name: Column::SpouseLastName,
    race: Some(Column::SpouseRace),
};
const FIRST_WITNESS: RelatedColumns = RelatedColumns {
    first_name: Column::FirstWitnessFirstName,
    last_name: Column::FirstWitnessLastName,
    race: None,
};
const SECOND_WITNESS: RelatedColumns = RelatedColumns {
    first_name: Column::SecondWitnessFirstName,
    last_name: Column::SecondWitnessLastName,
    race: None,
};

/// Date and place columns of an event, already resolved
#[derive(Debug, Clone, Default)]
struct EventFields<'r> {
    written_date: Option<&'r str>,
    date: Option<NaiveDate>,
    location_id: Option<i64>,
}

impl EventFields<'_> {
    fn is_empty(&self) -> bool {
        self.written_date.is_none() && self.location_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportService;

impl ImportService {
    pub fn new() -> Self {
        ImportService
    }

    /// Translate one row; facts are attached in a fixed order because
    /// godparents need the baptism and spouse/witnesses need the marriage.
    pub fn import_row(&self, scope: &mut RowScope<'_, '_>, row: &SacramentRow) -> Result<Person> {
        let mut person = self.find_person(
            scope,
            row.get(Column::FirstName),
            row.get(Column::LastName),
            row.value(Column::Race),
            row.get(Column::Sex),
        )?;

        self.set_written_race(&mut person, row);
        self.set_status(&mut person, row);
        self.add_manumission(scope, &person, row)?;
        self.add_aliases(scope, &person, row)?;
        self.add_occupations(scope, &person, row)?;
        self.set_native(scope, &mut person, row)?;
        self.add_birth(scope, &mut person, row)?;
        self.set_birth_status(&mut person, row);
        let baptism = self.add_baptism(scope, &mut person, row)?;
        self.add_parents(scope, &mut person, row)?;
        self.add_godparents(scope, &person, row, baptism.as_ref())?;
        let marriage = self.add_marriage(scope, &person, row)?;
        self.add_spouse(scope, &person, row, marriage.as_ref())?;
        self.add_marriage_witnesses(scope, &person, row, marriage.as_ref())?;
        self.add_death(scope, &mut person, row)?;
        self.add_residences(scope, &person, row)?;
        self.set_notes(&mut person, row);

        person::save(scope.conn(), &person)?;
        Ok(person)
    }

    // ========================================================================
    // ENTITY RESOLUTION
    // ========================================================================

    /// Find-or-create the principal person of a row
    pub fn find_person(
        &self,
        scope: &mut RowScope<'_, '_>,
        first_name: &str,
        last_name: &str,
        race: Option<&str>,
        sex: &str,
    ) -> Result<Person> {
        if first_name.is_empty() && last_name.is_empty() {
            return Err(ImportError::MissingPrincipal);
        }
        let race_id = match race {
            Some(name) => Some(scope.lookup(LookupKind::Race, name)?),
            None => None,
        };
        Ok(person::find_or_create(
            scope.conn(),
            first_name,
            last_name,
            race_id,
            sex,
        )?)
    }

    /// Find-or-create a relative or witness; None when both names are blank
    pub fn find_related(
        &self,
        scope: &mut RowScope<'_, '_>,
        row: &SacramentRow,
        columns: RelatedColumns,
        sex: &str,
    ) -> Result<Option<Person>> {
        if !row.any(&[columns.first_name, columns.last_name]) {
            return Ok(None);
        }
        let race = columns.race.and_then(|c| row.value(c));
        let related = self.find_person(
            scope,
            row.get(columns.first_name),
            row.get(columns.last_name),
            race,
            sex,
        )?;
        Ok(Some(related))
    }

    fn event_fields<'r>(
        &self,
        scope: &mut RowScope<'_, '_>,
        row: &'r SacramentRow,
        date_column: Column,
        place_column: Column,
    ) -> Result<EventFields<'r>> {
        let written_date = row.value(date_column);
        let date = match written_date {
            Some(value) => Some(parse_record_date(date_column, value)?),
            None => None,
        };
        let location_id = match row.value(place_column) {
            Some(place) => Some(scope.lookup(LookupKind::Location, place)?),
            None => None,
        };
        Ok(EventFields {
            written_date,
            date,
            location_id,
        })
    }

    fn create_principal_event(
        &self,
        scope: &mut RowScope<'_, '_>,
        kind: EventKind,
        person_id: i64,
        fields: &EventFields<'_>,
        ledger_id: Option<i64>,
    ) -> Result<Event> {
        let category_id = scope.lookup(LookupKind::EventCategory, kind.name())?;
        let created = event::create(
            scope.conn(),
            category_id,
            &NewEvent {
                written_date: fields.written_date,
                date: fields.date,
                location_id: fields.location_id,
                ledger_id,
            },
        )?;
        event::add_participant(scope.conn(), created.id, person_id, Role::Principal)?;
        Ok(created)
    }

    /// Reuse the event a person already has of this kind on this date
    fn find_or_create_dated_event(
        &self,
        scope: &mut RowScope<'_, '_>,
        kind: EventKind,
        person_id: i64,
        fields: &EventFields<'_>,
        ledger_id: Option<i64>,
    ) -> Result<Event> {
        let category_id = scope.lookup(LookupKind::EventCategory, kind.name())?;
        if let Some(existing) =
            event::find_for_principal(scope.conn(), category_id, person_id, fields.written_date)?
        {
            return Ok(existing);
        }
        self.create_principal_event(scope, kind, person_id, fields, ledger_id)
    }

    /// Reuse the linked event if there is one, otherwise create and link it
    fn linked_event(
        &self,
        scope: &mut RowScope<'_, '_>,
        kind: EventKind,
        person_id: i64,
        link: &mut Option<i64>,
        fields: &EventFields<'_>,
    ) -> Result<Event> {
        if let Some(id) = *link {
            if let Some(existing) = event::get(scope.conn(), id)? {
                return Ok(existing);
            }
        }
        let created = self.create_principal_event(scope, kind, person_id, fields, None)?;
        *link = Some(created.id);
        Ok(created)
    }

    fn add_witness(
        &self,
        scope: &mut RowScope<'_, '_>,
        witness: &Person,
        event: &Event,
        kind: WitnessKind,
    ) -> Result<()> {
        let category_id = scope.lookup(LookupKind::WitnessCategory, kind.name())?;
        if event::add_witness(scope.conn(), witness.id, event.id, category_id)? {
            debug!(person = witness.id, event = event.id, category = kind.name(), "added witness");
        }
        Ok(())
    }

    // ========================================================================
    // PERSON FACTS
    // ========================================================================

    pub fn set_written_race(&self, person: &mut Person, row: &SacramentRow) {
        if let Some(written) = row.value(Column::WrittenRace) {
            person.written_race = Some(written.to_string());
        }
    }

    pub fn set_status(&self, person: &mut Person, row: &SacramentRow) {
        if let Some(status) = row.value(Column::Status) {
            person.status = Some(status.to_string());
        }
    }

    /// Manumission act; a notary puts it in that notary's ledger for the year
    pub fn add_manumission(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
    ) -> Result<Option<Event>> {
        let fields = self.event_fields(scope, row, Column::ManumissionDate, Column::ManumissionPlace)?;
        let notary = row.value(Column::ManumissionNotary);
        if fields.is_empty() && notary.is_none() {
            return Ok(None);
        }

        let ledger_id = match notary {
            Some(name) => {
                let date = fields.date.ok_or(ImportError::MissingValue {
                    column: Column::ManumissionDate.name(),
                    because: Column::ManumissionNotary.name(),
                })?;
                let notary_id = scope.lookup(LookupKind::Notary, name)?;
                Some(ledger::find_or_create(scope.conn(), notary_id, date.year())?.id)
            }
            None => None,
        };

        let manumission =
            self.find_or_create_dated_event(scope, EventKind::Manumission, person.id, &fields, ledger_id)?;
        Ok(Some(manumission))
    }

    pub fn add_aliases(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
    ) -> Result<usize> {
        let mut added = 0;
        for alias in row.list(Column::Aliases) {
            if person::add_alias(scope.conn(), person.id, alias)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn add_occupations(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
    ) -> Result<usize> {
        let mut added = 0;
        for occupation in row.list(Column::Occupations) {
            if person::add_occupation(scope.conn(), person.id, occupation)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Place the person is recorded as native of
    pub fn set_native(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &mut Person,
        row: &SacramentRow,
    ) -> Result<()> {
        if let Some(place) = row.value(Column::Native) {
            person.native_id = Some(scope.lookup(LookupKind::Location, place)?);
        }
        Ok(())
    }

    pub fn add_birth(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &mut Person,
        row: &SacramentRow,
    ) -> Result<Option<Event>> {
        let fields = self.event_fields(scope, row, Column::BirthDate, Column::BirthPlace)?;
        if fields.is_empty() {
            return Ok(None);
        }
        let birth = self.linked_event(scope, EventKind::Birth, person.id, &mut person.birth_id, &fields)?;
        Ok(Some(birth))
    }

    pub fn set_birth_status(&self, person: &mut Person, row: &SacramentRow) {
        if let Some(status) = row.value(Column::BirthStatus) {
            person.birth_status = Some(status.to_string());
        }
    }

    pub fn add_baptism(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &mut Person,
        row: &SacramentRow,
    ) -> Result<Option<Event>> {
        let fields = self.event_fields(scope, row, Column::BaptismDate, Column::BaptismPlace)?;
        if fields.is_empty() {
            return Ok(None);
        }
        let baptism =
            self.linked_event(scope, EventKind::Baptism, person.id, &mut person.baptism_id, &fields)?;
        Ok(Some(baptism))
    }

    pub fn add_parents(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &mut Person,
        row: &SacramentRow,
    ) -> Result<()> {
        if let Some(father) = self.find_related(scope, row, FATHER, "M")? {
            person.father_id = Some(father.id);
        }
        if let Some(mother) = self.find_related(scope, row, MOTHER, "F")? {
            person.mother_id = Some(mother.id);
        }
        Ok(())
    }

    /// Godparents witness the baptism created by `add_baptism`
    pub fn add_godparents(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
        baptism: Option<&Event>,
    ) -> Result<usize> {
        let godfather = self.find_related(scope, row, GODFATHER, "M")?;
        let godmother = self.find_related(scope, row, GODMOTHER, "F")?;
        if godfather.is_none() && godmother.is_none() {
            return Ok(0);
        }

        let baptism = baptism.ok_or(ImportError::MissingEvent {
            what: "godparents",
            event: "baptism",
        })?;

        let mut added = 0;
        for (godparent, kind) in [
            (godfather, WitnessKind::Godfather),
            (godmother, WitnessKind::Godmother),
        ] {
            if let Some(godparent) = godparent {
                self.add_witness(scope, &godparent, baptism, kind)?;
                added += 1;
            }
        }
        debug!(person = person.id, baptism = baptism.id, added, "added godparents");
        Ok(added)
    }

    pub fn add_marriage(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
    ) -> Result<Option<Event>> {
        let fields = self.event_fields(scope, row, Column::MarriageDate, Column::MarriagePlace)?;
        if fields.is_empty() {
            return Ok(None);
        }
        let marriage = self.find_or_create_dated_event(scope, EventKind::Marriage, person.id, &fields, None)?;
        Ok(Some(marriage))
    }

    /// The spouse joins the marriage created by `add_marriage`
    pub fn add_spouse(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
        marriage: Option<&Event>,
    ) -> Result<Option<Person>> {
        let Some(spouse) = self.find_related(scope, row, SPOUSE, opposite_sex(&person.sex))? else {
            return Ok(None);
        };
        let marriage = marriage.ok_or(ImportError::MissingEvent {
            what: "spouse",
            event: "marriage",
        })?;
        event::add_participant(scope.conn(), marriage.id, spouse.id, Role::Spouse)?;
        Ok(Some(spouse))
    }

    pub fn add_marriage_witnesses(
        &self,
        scope: &mut RowScope<'_, '_>,
        _person: &Person,
        row: &SacramentRow,
        marriage: Option<&Event>,
    ) -> Result<usize> {
        let mut witnesses = Vec::new();
        for columns in [FIRST_WITNESS, SECOND_WITNESS] {
            if let Some(witness) = self.find_related(scope, row, columns, "")? {
                witnesses.push(witness);
            }
        }
        if witnesses.is_empty() {
            return Ok(0);
        }

        let marriage = marriage.ok_or(ImportError::MissingEvent {
            what: "marriage witnesses",
            event: "marriage",
        })?;
        for witness in &witnesses {
            self.add_witness(scope, witness, marriage, WitnessKind::Wedding)?;
        }
        Ok(witnesses.len())
    }

    pub fn add_death(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &mut Person,
        row: &SacramentRow,
    ) -> Result<Option<Event>> {
        let fields = self.event_fields(scope, row, Column::DeathDate, Column::DeathPlace)?;
        if fields.is_empty() {
            return Ok(None);
        }
        let death = self.linked_event(scope, EventKind::Death, person.id, &mut person.death_id, &fields)?;
        Ok(Some(death))
    }

    pub fn add_residences(
        &self,
        scope: &mut RowScope<'_, '_>,
        person: &Person,
        row: &SacramentRow,
    ) -> Result<bool> {
        let written_date = row.value(Column::ResidenceDate);
        let Some(place) = row.value(Column::ResidencePlace) else {
            if written_date.is_some() {
                return Err(ImportError::MissingValue {
                    column: Column::ResidencePlace.name(),
                    because: Column::ResidenceDate.name(),
                });
            }
            return Ok(false);
        };

        let date = match written_date {
            Some(value) => Some(parse_record_date(Column::ResidenceDate, value)?),
            None => None,
        };
        let location_id = scope.lookup(LookupKind::Location, place)?;
        Ok(ledger::add_residence(
            scope.conn(),
            person.id,
            written_date,
            date,
            location_id,
        )?)
    }

    pub fn set_notes(&self, person: &mut Person, row: &SacramentRow) {
        if let Some(notes) = row.value(Column::Notes) {
            person.notes = Some(notes.to_string());
        }
    }
}
