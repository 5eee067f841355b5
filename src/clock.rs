use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::sync::RwLock;

use crate::error::AppError;

/// Source of "now" and of the business zone every policy time is read in.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn zone(&self) -> Tz;

    fn local_now(&self) -> DateTime<Tz> {
        self.now().with_timezone(&self.zone())
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    /// Wall-clock `HH:MM` on `date` in the business zone.
    fn combine(&self, date: NaiveDate, hh_mm: &str) -> Result<DateTime<Utc>, AppError> {
        let time = NaiveTime::parse_from_str(hh_mm, "%H:%M")
            .map_err(|_| AppError::validation(format!("Invalid time of day: {}", hh_mm)))?;
        Ok(at_local(self.zone(), date.and_time(time)))
    }

    /// Wall-clock reading of `instant` in the business zone.
    fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.zone()).naive_local()
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    zone: Tz,
}

impl SystemClock {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> Tz {
        self.zone
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Utc>>,
    zone: Tz,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            instant: RwLock::new(instant),
            zone,
        }
    }

    /// Pins the clock to a wall-clock reading in `zone`.
    pub fn at_local(zone: Tz, local: NaiveDateTime) -> Self {
        Self::new(at_local(zone, local), zone)
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.write() {
            *guard = instant;
        }
    }

    pub fn set_local(&self, local: NaiveDateTime) {
        self.set(at_local(self.zone, local));
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn zone(&self) -> Tz {
        self.zone
    }
}

/// Resolves a wall-clock reading in `zone`. Ambiguous readings take the earlier instant; a
/// reading inside a DST gap is taken as UTC.
pub fn at_local(zone: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => zone.from_utc_datetime(&local).with_timezone(&Utc),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", value))
    })
}

pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::validation(format!("Invalid instant '{}', expected RFC 3339", value)))
}

/// Parses `YYYY-MM`.
pub fn parse_year_month(value: &str) -> Result<(i32, u32), AppError> {
    let invalid = || AppError::validation(format!("Invalid month '{}', expected YYYY-MM", value));
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    first_of_month(year, month).ok_or_else(invalid)?;
    Ok((year, month))
}

pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = next_month(year, month);
    first_of_month(next_year, next_month).and_then(|d| d.pred_opt())
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 { (year + 1, 1) } else { (year, month + 1) }
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 { (year - 1, 12) } else { (year, month - 1) }
}

pub fn month_of(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
