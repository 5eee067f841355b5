use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::utils::to_units;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub work_date: NaiveDate,
    pub is_working_day: bool,
    pub work_unit: f64,
    pub note: Option<String>,
}

impl CalendarDay {
    /// Default seeding: Monday to Friday count one unit, weekends none.
    pub fn seeded(date: NaiveDate) -> Self {
        use chrono::{Datelike, Weekday};

        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        Self {
            work_date: date,
            is_working_day: !weekend,
            work_unit: if weekend { 0.0 } else { 1.0 },
            note: None,
        }
    }

    /// Units this day contributes to a month's expectation.
    pub fn expected_units(&self) -> f64 {
        if self.is_working_day && self.work_unit > 0.0 {
            self.work_unit
        } else {
            0.0
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CalendarDayRow {
    pub work_date: NaiveDate,
    pub is_working_day: bool,
    pub work_unit: BigDecimal,
    pub note: Option<String>,
}

impl From<CalendarDayRow> for CalendarDay {
    fn from(row: CalendarDayRow) -> Self {
        Self {
            work_date: row.work_date,
            is_working_day: row.is_working_day,
            work_unit: to_units(&row.work_unit),
            note: row.note,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDayInput {
    pub date: NaiveDate,
    pub is_working_day: bool,
    pub work_unit: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<CalendarDayInput> for CalendarDay {
    fn from(input: CalendarDayInput) -> Self {
        Self {
            work_date: input.date,
            is_working_day: input.is_working_day,
            work_unit: input.work_unit,
            note: input
                .note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkCalendarInput {
    pub days: Vec<CalendarDayInput>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateYearInput {
    pub year: i32,
}
