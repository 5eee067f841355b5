use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    database::{
        models::{CalendarDay, CalendarDayRow},
        transaction::DatabaseTransaction,
        utils::{sql, to_decimal},
    },
    error::AppError,
};

/// Persistence for the working calendar.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Seeds the whole year unless any day of it already exists. Returns whether it seeded.
    async fn ensure_year(&self, year: i32) -> Result<bool, AppError>;

    async fn upsert(&self, day: &CalendarDay) -> Result<CalendarDay, AppError>;

    /// Inclusive range, ascending.
    async fn list_range(&self, from: NaiveDate, to: NaiveDate)
    -> Result<Vec<CalendarDay>, AppError>;

    async fn get(&self, date: NaiveDate) -> Result<Option<CalendarDay>, AppError>;
}

/// Every day of `year`, seeded Monday to Friday as working days.
pub fn seed_year(year: i32) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.year() == year)
        .map(CalendarDay::seeded)
        .collect()
}

#[derive(Clone)]
pub struct WorkCalendarRepository {
    pool: PgPool,
}

impl WorkCalendarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarStore for WorkCalendarRepository {
    async fn ensure_year(&self, year: i32) -> Result<bool, AppError> {
        let (Some(start), Some(next)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ) else {
            return Err(AppError::validation(format!("Invalid year: {}", year)));
        };

        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let existing = sqlx::query_scalar::<_, i64>(&sql(
                    r#"
                    SELECT COUNT(*)
                    FROM work_calendar
                    WHERE work_date >= ? AND work_date < ?
                    "#,
                ))
                .bind(start)
                .bind(next)
                .fetch_one(&mut **tx)
                .await?;

                if existing > 0 {
                    return Ok(false);
                }

                let days = seed_year(year);
                let mut insert = QueryBuilder::<Postgres>::new(
                    "INSERT INTO work_calendar (work_date, is_working_day, work_unit, note) ",
                );
                insert.push_values(days, |mut row, day| {
                    row.push_bind(day.work_date)
                        .push_bind(day.is_working_day)
                        .push_bind(to_decimal(day.work_unit))
                        .push_bind(day.note);
                });
                insert.push(" ON CONFLICT (work_date) DO NOTHING");
                insert.build().execute(&mut **tx).await?;

                Ok(true)
            })
        })
        .await
    }

    async fn upsert(&self, day: &CalendarDay) -> Result<CalendarDay, AppError> {
        let row = sqlx::query_as::<_, CalendarDayRow>(&sql(
            r#"
            INSERT INTO work_calendar (work_date, is_working_day, work_unit, note)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (work_date) DO UPDATE
            SET
                is_working_day = EXCLUDED.is_working_day,
                work_unit = EXCLUDED.work_unit,
                note = EXCLUDED.note,
                updated_at = NOW()
            RETURNING work_date, is_working_day, work_unit, note
            "#,
        ))
        .bind(day.work_date)
        .bind(day.is_working_day)
        .bind(to_decimal(day.work_unit))
        .bind(&day.note)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarDay>, AppError> {
        let rows = sqlx::query_as::<_, CalendarDayRow>(&sql(
            r#"
            SELECT work_date, is_working_day, work_unit, note
            FROM work_calendar
            WHERE work_date BETWEEN ? AND ?
            ORDER BY work_date ASC
            "#,
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CalendarDay::from).collect())
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<CalendarDay>, AppError> {
        let row = sqlx::query_as::<_, CalendarDayRow>(&sql(
            r#"
            SELECT work_date, is_working_day, work_unit, note
            FROM work_calendar
            WHERE work_date = ?
            "#,
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CalendarDay::from))
    }
}
