// Column Schema - positional layout of a sacrament transcription row
//
// The importer never reads a row by a bare number. Every read goes
// through `Column`, and a row must carry at least COLUMN_COUNT fields
// before any of them is trusted.

use crate::error::{ImportError, Result};

/// Number of columns in a sacrament row
pub const COLUMN_COUNT: usize = 43;

/// Separator inside list columns (aliases, occupations)
pub const LIST_SEPARATOR: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Column {
    LastName = 0,
    FirstName,
    Race,
    Sex,
    WrittenRace,
    Status,
    ManumissionDate,
    ManumissionPlace,
    ManumissionNotary,
    Aliases,
    Occupations,
    Native,
    BirthDate,
    BirthPlace,
    BirthStatus,
    BaptismDate,
    BaptismPlace,
    FatherLastName,
    FatherFirstName,
    FatherRace,
    MotherLastName,
    MotherFirstName,
    MotherRace,
    GodfatherLastName,
    GodfatherFirstName,
    GodfatherRace,
    GodmotherLastName,
    GodmotherFirstName,
    GodmotherRace,
    MarriageDate,
    MarriagePlace,
    SpouseLastName,
    SpouseFirstName,
    SpouseRace,
    FirstWitnessLastName,
    FirstWitnessFirstName,
    SecondWitnessLastName,
    SecondWitnessFirstName,
    DeathDate,
    DeathPlace,
    ResidenceDate,
    ResidencePlace,
    Notes,
}

impl Column {
    /// Every column, in index order
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::LastName,
        Column::FirstName,
        Column::Race,
        Column::Sex,
        Column::WrittenRace,
        Column::Status,
        Column::ManumissionDate,
        Column::ManumissionPlace,
        Column::ManumissionNotary,
        Column::Aliases,
        Column::Occupations,
        Column::Native,
        Column::BirthDate,
        Column::BirthPlace,
        Column::BirthStatus,
        Column::BaptismDate,
        Column::BaptismPlace,
        Column::FatherLastName,
        Column::FatherFirstName,
        Column::FatherRace,
        Column::MotherLastName,
        Column::MotherFirstName,
        Column::MotherRace,
        Column::GodfatherLastName,
        Column::GodfatherFirstName,
        Column::GodfatherRace,
        Column::GodmotherLastName,
        Column::GodmotherFirstName,
        Column::GodmotherRace,
        Column::MarriageDate,
        Column::MarriagePlace,
        Column::SpouseLastName,
        Column::SpouseFirstName,
        Column::SpouseRace,
        Column::FirstWitnessLastName,
        Column::FirstWitnessFirstName,
        Column::SecondWitnessLastName,
        Column::SecondWitnessFirstName,
        Column::DeathDate,
        Column::DeathPlace,
        Column::ResidenceDate,
        Column::ResidencePlace,
        Column::Notes,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Symbolic name, used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Column::LastName => "last_name",
            Column::FirstName => "first_name",
            Column::Race => "race",
            Column::Sex => "sex",
            Column::WrittenRace => "written_race",
            Column::Status => "status",
            Column::ManumissionDate => "manumission_date",
            Column::ManumissionPlace => "manumission_place",
            Column::ManumissionNotary => "manumission_notary",
            Column::Aliases => "aliases",
            Column::Occupations => "occupations",
            Column::Native => "native",
            Column::BirthDate => "birth_date",
            Column::BirthPlace => "birth_place",
            Column::BirthStatus => "birth_status",
            Column::BaptismDate => "baptism_date",
            Column::BaptismPlace => "baptism_place",
            Column::FatherLastName => "father_last_name",
            Column::FatherFirstName => "father_first_name",
            Column::FatherRace => "father_race",
            Column::MotherLastName => "mother_last_name",
            Column::MotherFirstName => "mother_first_name",
            Column::MotherRace => "mother_race",
            Column::GodfatherLastName => "godfather_last_name",
            Column::GodfatherFirstName => "godfather_first_name",
            Column::GodfatherRace => "godfather_race",
            Column::GodmotherLastName => "godmother_last_name",
            Column::GodmotherFirstName => "godmother_first_name",
            Column::GodmotherRace => "godmother_race",
            Column::MarriageDate => "marriage_date",
            Column::MarriagePlace => "marriage_place",
            Column::SpouseLastName => "spouse_last_name",
            Column::SpouseFirstName => "spouse_first_name",
            Column::SpouseRace => "spouse_race",
            Column::FirstWitnessLastName => "first_witness_last_name",
            Column::FirstWitnessFirstName => "first_witness_first_name",
            Column::SecondWitnessLastName => "second_witness_last_name",
            Column::SecondWitnessFirstName => "second_witness_first_name",
            Column::DeathDate => "death_date",
            Column::DeathPlace => "death_place",
            Column::ResidenceDate => "residence_date",
            Column::ResidencePlace => "residence_place",
            Column::Notes => "notes",
        }
    }
}

/// Check that a record is wide enough for the schema
pub fn check_width(found: usize) -> Result<()> {
    if found < COLUMN_COUNT {
        return Err(ImportError::ColumnCountMismatch {
            expected: COLUMN_COUNT,
            found,
        });
    }
    Ok(())
}

/// A normalized row whose width has been validated against the schema
#[derive(Debug, Clone)]
pub struct SacramentRow {
    fields: Vec<String>,
}

impl SacramentRow {
    pub fn new(fields: Vec<String>) -> Result<Self> {
        check_width(fields.len())?;
        Ok(SacramentRow { fields })
    }

    /// Raw value of a column (empty string when blank)
    pub fn get(&self, column: Column) -> &str {
        &self.fields[column.index()]
    }

    /// Value of a column, None when blank
    pub fn value(&self, column: Column) -> Option<&str> {
        let value = self.get(column);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// True when any of the columns holds data
    pub fn any(&self, columns: &[Column]) -> bool {
        columns.iter().any(|c| self.value(*c).is_some())
    }

    /// Entries of a `;`-separated list column, trimmed, blanks dropped
    pub fn list(&self, column: Column) -> Vec<&str> {
        self.get(column)
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}
