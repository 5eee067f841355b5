use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    clock::{Clock, first_of_month, last_of_month},
    database::{
        models::SessionStatus,
        repositories::{CalendarStore, SessionStore},
    },
    error::AppError,
    services::rules,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Month(i32, u32),
    Year(i32),
}

impl StatsPeriod {
    fn bounds(self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            StatsPeriod::Month(year, month) => {
                Some((first_of_month(year, month)?, last_of_month(year, month)?))
            }
            StatsPeriod::Year(year) => Some((
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPoint {
    pub date: NaiveDate,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_worked_minutes: i64,
    pub worked_days: usize,
    pub total_day_unit: f64,
    pub full_days: usize,
    pub half_days: usize,
    pub missing_days: usize,
    pub series: Vec<StatsPoint>,
}

/// Personal attendance totals over a month or a year, up to today.
#[derive(Clone)]
pub struct StatsService {
    sessions: Arc<dyn SessionStore>,
    calendar: Arc<dyn CalendarStore>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        calendar: Arc<dyn CalendarStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            calendar,
            clock,
        }
    }

    pub async fn me(&self, user_id: i64, period: StatsPeriod) -> Result<PersonalStats, AppError> {
        let (from, end) = period
            .bounds()
            .ok_or_else(|| AppError::validation("invalid stats period"))?;
        let to = end.min(self.clock.today());

        let mut stats = PersonalStats {
            from,
            to,
            total_worked_minutes: 0,
            worked_days: 0,
            total_day_unit: 0.0,
            full_days: 0,
            half_days: 0,
            missing_days: 0,
            series: Vec::new(),
        };
        if to < from {
            return Ok(stats);
        }

        self.calendar.ensure_year(from.year()).await?;
        let calendar = self.calendar.list_range(from, to).await?;

        let mut sessions = self.sessions.list_for_user(user_id, from, to).await?;
        sessions.sort_by_key(|session| session.work_date);

        let mut credited: HashMap<NaiveDate, f64> = HashMap::new();
        for session in sessions {
            // A session still open is credited as half a day
            let unit = if session.is_open() {
                rules::HALF_DAY
            } else {
                session.day_unit
            };

            stats.total_worked_minutes += i64::from(session.worked_minutes);
            if session.worked_minutes > 0 {
                stats.worked_days += 1;
            }
            stats.total_day_unit += unit;
            if unit >= rules::FULL_DAY {
                stats.full_days += 1;
            } else if unit >= rules::HALF_DAY {
                stats.half_days += 1;
            }

            credited.insert(session.work_date, unit);
            stats.series.push(StatsPoint {
                date: session.work_date,
                worked_minutes: session.worked_minutes,
                day_unit: unit,
                status: session.status,
            });
        }

        stats.missing_days = calendar
            .iter()
            .filter(|day| day.expected_units() > 0.0)
            .filter(|day| credited.get(&day.work_date).copied().unwrap_or(0.0) <= 0.0)
            .count();

        Ok(stats)
    }
}
