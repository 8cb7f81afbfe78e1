// Date columns in the transcriptions are written day first (01/02/1800 is
// 1 February 1800). ISO dates from later clean-up passes are accepted too.

use chrono::NaiveDate;

use crate::columns::Column;
use crate::error::{ImportError, Result};

/// Accepted formats, tried in order
pub const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

pub fn parse_record_date(column: Column, value: &str) -> Result<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| ImportError::InvalidDate {
            column: column.name(),
            value: value.to_string(),
        })
}
