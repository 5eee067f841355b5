use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    clock::month_of,
    database::{
        models::{CalendarDay, CalendarDayInput},
        repositories::CalendarStore,
    },
    error::AppError,
    services::LeaveService,
};

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

#[derive(Clone)]
pub struct WorkCalendarService {
    calendar: Arc<dyn CalendarStore>,
    leave: Arc<LeaveService>,
}

impl WorkCalendarService {
    pub fn new(calendar: Arc<dyn CalendarStore>, leave: Arc<LeaveService>) -> Self {
        Self { calendar, leave }
    }

    /// Seeds `year` unless it already has days. Returns whether rows were written.
    pub async fn generate_year(&self, year: i32) -> Result<bool, AppError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(AppError::validation_with_details(
                "year out of range",
                serde_json::json!({ "year": format!("must be between {} and {}", MIN_YEAR, MAX_YEAR) }),
            ));
        }

        let seeded = self.calendar.ensure_year(year).await?;
        if seeded {
            log::info!("Seeded working calendar for {}", year);
        }
        Ok(seeded)
    }

    pub async fn upsert_day(&self, input: CalendarDayInput) -> Result<CalendarDay, AppError> {
        let day = validate_day(input)?;
        let saved = self.calendar.upsert(&day).await?;

        let (year, month) = month_of(saved.work_date);
        self.refresh_month(year, month).await;
        Ok(saved)
    }

    /// Validates every day before writing any; each affected month is re-projected once.
    pub async fn bulk_upsert(&self, inputs: Vec<CalendarDayInput>) -> Result<usize, AppError> {
        if inputs.is_empty() {
            return Err(AppError::validation_with_details(
                "days must not be empty",
                serde_json::json!({ "days": "required" }),
            ));
        }

        let mut days = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let day = validate_day(input).map_err(|_| {
                AppError::validation_with_details(
                    "invalid calendar day",
                    serde_json::json!({ format!("days[{}].workUnit", index): "must be between 0 and 1" }),
                )
            })?;
            days.push(day);
        }

        let mut months = BTreeSet::new();
        for day in &days {
            self.calendar.upsert(day).await?;
            months.insert(month_of(day.work_date));
        }

        for (year, month) in months {
            self.refresh_month(year, month).await;
        }

        log::info!("Bulk updated {} calendar days", days.len());
        Ok(days.len())
    }

    pub async fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarDay>, AppError> {
        if from > to {
            return Err(AppError::validation("from must not be after to"));
        }
        self.calendar.list_range(from, to).await
    }

    pub async fn get(&self, date: NaiveDate) -> Result<Option<CalendarDay>, AppError> {
        self.calendar.get(date).await
    }

    /// A failed re-projection never fails the calendar write.
    async fn refresh_month(&self, year: i32, month: u32) {
        match self.leave.recompute_month(year, month).await {
            Ok(count) => log::debug!(
                "Recomputed {} leave summaries for {}-{:02}",
                count,
                year,
                month
            ),
            Err(err) => log::warn!(
                "Failed to recompute leave summaries for {}-{:02}: {}",
                year,
                month,
                err
            ),
        }
    }
}

fn validate_day(input: CalendarDayInput) -> Result<CalendarDay, AppError> {
    if !input.work_unit.is_finite() || !(0.0..=1.0).contains(&input.work_unit) {
        return Err(AppError::validation_with_details(
            "invalid calendar day",
            serde_json::json!({ "workUnit": "must be between 0 and 1" }),
        ));
    }
    Ok(input.into())
}
