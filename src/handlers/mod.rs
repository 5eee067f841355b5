pub mod admin_attendance;
pub mod attendance;
pub mod leave;
pub mod shared;
pub mod stats;
pub mod work_calendar;

use crate::{clock::parse_date, error::AppError};
use chrono::NaiveDate;

/// Optional `YYYY-MM-DD` query value.
pub(crate) fn optional_date(value: &Option<String>) -> Result<Option<NaiveDate>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value).map(Some),
    }
}
