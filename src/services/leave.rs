//! Monthly leave reconciliation: summary projection, monthly grant, prior-month deduction and
//! backfill.

use chrono::Datelike;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    clock::{Clock, first_of_month, last_of_month, month_of, previous_month},
    database::{
        models::{
            AdjustPaidLeaveInput, GrantOutcome, GrantType, LeaveGrant, MonthlySummary,
            SummaryFilter, User,
        },
        repositories::{CalendarStore, LeaveStore, UserStore},
    },
    error::AppError,
    services::{AttendanceUnits, require_reason},
};

/// Units credited to every active user once per month.
pub const MONTHLY_GRANT_UNITS: f64 = 1.0;

/// Free units absorbed from the shortfall in a user's birthday month.
pub const BIRTHDAY_CREDIT_UNITS: f64 = 1.0;

/// Splits a shortfall into (paid_used, unpaid) after the birthday credit.
pub fn apportion(missing: f64, paid_leave: f64, is_birthday: bool) -> (f64, f64) {
    let mut remaining = missing.max(0.0);
    if is_birthday {
        remaining -= remaining.min(BIRTHDAY_CREDIT_UNITS);
    }

    let paid_available = paid_leave.max(0.0);
    if remaining <= paid_available {
        (remaining, 0.0)
    } else {
        (paid_available, remaining - paid_available)
    }
}

pub fn validate_month(year: i32, month: u32) -> Result<(), AppError> {
    if first_of_month(year, month).is_none() {
        return Err(AppError::validation_with_details(
            "invalid year/month",
            serde_json::json!({ "month": "must be between 1 and 12" }),
        ));
    }
    Ok(())
}

pub struct LeaveService {
    users: Arc<dyn UserStore>,
    leave: Arc<dyn LeaveStore>,
    attendance: Arc<dyn AttendanceUnits>,
    calendar: Arc<dyn CalendarStore>,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(
        users: Arc<dyn UserStore>,
        leave: Arc<dyn LeaveStore>,
        attendance: Arc<dyn AttendanceUnits>,
        calendar: Arc<dyn CalendarStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            leave,
            attendance,
            calendar,
            clock,
        }
    }

    pub fn current_month(&self) -> (i32, u32) {
        month_of(self.clock.today())
    }

    /// Recomputes and stores the summary for (user, year, month).
    pub async fn project(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, AppError> {
        validate_month(year, month)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.project_user(&user, year, month).await
    }

    async fn project_user(
        &self,
        user: &User,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, AppError> {
        let (Some(first), Some(last)) = (first_of_month(year, month), last_of_month(year, month))
        else {
            return Err(AppError::validation(format!(
                "Invalid month {}-{}",
                year, month
            )));
        };

        self.calendar.ensure_year(year).await?;

        let today = self.clock.today();
        let window_end = if month_of(today) == (year, month) {
            last.min(today)
        } else {
            last
        };

        let expected: f64 = self
            .calendar
            .list_range(first, window_end)
            .await?
            .iter()
            .map(|day| day.expected_units())
            .sum();
        let worked = self
            .attendance
            .sum_closed_day_units(user.id, first, window_end)
            .await?;
        let missing = (expected - worked).max(0.0);
        let is_birthday = user.birthday.is_some_and(|birthday| birthday.month() == month);
        let (paid_used, unpaid) = apportion(missing, user.paid_leave, is_birthday);

        self.leave
            .upsert_summary(&MonthlySummary {
                user_id: user.id,
                year,
                month,
                expected_units: expected,
                worked_units: worked,
                missing_units: missing,
                paid_used_units: paid_used,
                unpaid_units: unpaid,
                is_birthday,
                updated_at: self.clock.now(),
            })
            .await
    }

    /// Re-projects every user who already has a summary for the month. Returns how many succeeded.
    pub async fn recompute_month(&self, year: i32, month: u32) -> Result<usize, AppError> {
        validate_month(year, month)?;
        let user_ids = self.leave.user_ids_with_summary(year, month).await?;

        let mut refreshed = 0;
        for user_id in user_ids {
            match self.project(user_id, year, month).await {
                Ok(_) => refreshed += 1,
                Err(err) => log::warn!(
                    "Failed to recompute summary for user {} {}-{:02}: {}",
                    user_id,
                    year,
                    month,
                    err
                ),
            }
        }
        Ok(refreshed)
    }

    pub async fn process_current_month_grant(&self) -> Result<GrantOutcome, AppError> {
        let (year, month) = self.current_month();
        self.process_monthly_grant(year, month).await
    }

    /// Credits every active user once for the month. The fence row is the commit point.
    pub async fn process_monthly_grant(
        &self,
        year: i32,
        month: u32,
    ) -> Result<GrantOutcome, AppError> {
        validate_month(year, month)?;
        let skipped = GrantOutcome {
            year,
            month,
            applied: false,
            users: 0,
        };

        if self.leave.has_grant(year, month, GrantType::Monthly).await? {
            log::debug!("Monthly grant {}-{:02} already applied", year, month);
            return Ok(skipped);
        }

        let users = self.users.list_active().await?;
        let user_ids: Vec<i64> = users.iter().map(|user| user.id).collect();

        if !self
            .leave
            .apply_monthly_grant(year, month, &user_ids, MONTHLY_GRANT_UNITS)
            .await?
        {
            log::info!(
                "Monthly grant {}-{:02} was applied concurrently, skipping",
                year,
                month
            );
            return Ok(skipped);
        }

        log::info!(
            "Monthly grant {}-{:02}: credited {} to {} active users",
            year,
            month,
            MONTHLY_GRANT_UNITS,
            user_ids.len()
        );

        for user_id in &user_ids {
            if let Err(err) = self.project(*user_id, year, month).await {
                log::warn!(
                    "Failed to project summary for user {} after grant: {}",
                    user_id,
                    err
                );
            }
        }

        Ok(GrantOutcome {
            year,
            month,
            applied: true,
            users: user_ids.len(),
        })
    }

    /// On the first day of a month, charges last month's paid-leave use against balances.
    pub async fn process_previous_month_deduction(
        &self,
    ) -> Result<Option<GrantOutcome>, AppError> {
        let today = self.clock.today();
        if today.day() != 1 {
            return Ok(None);
        }

        let (year, month) = previous_month(today.year(), today.month());
        self.deduct_month(year, month).await.map(Some)
    }

    /// Deducts each active user's `paid_used` for the month, at most once per month.
    pub async fn deduct_month(&self, year: i32, month: u32) -> Result<GrantOutcome, AppError> {
        validate_month(year, month)?;

        if self.leave.has_grant(year, month, GrantType::Deduction).await? {
            log::debug!("Deduction {}-{:02} already applied", year, month);
            return Ok(GrantOutcome {
                year,
                month,
                applied: false,
                users: 0,
            });
        }

        let mut deductions = Vec::new();
        for user in self.users.list_active().await? {
            let summary = self.project_user(&user, year, month).await?;
            if summary.paid_used_units > 0.0 {
                deductions.push((user.id, summary.paid_used_units));
            }
        }

        let applied = self.leave.apply_deduction(year, month, &deductions).await?;
        if applied {
            log::info!(
                "Deduction {}-{:02}: charged paid leave for {} users",
                year,
                month,
                deductions.len()
            );
        } else {
            log::info!(
                "Deduction {}-{:02} was applied concurrently, skipping",
                year,
                month
            );
        }

        Ok(GrantOutcome {
            year,
            month,
            applied,
            users: if applied { deductions.len() } else { 0 },
        })
    }

    /// Projects every active user for months that have sessions but no summary yet.
    /// Returns the months filled.
    pub async fn backfill_summaries(&self) -> Result<Vec<(i32, u32)>, AppError> {
        let with_sessions = self.attendance.months_with_sessions().await?;
        let with_summaries: HashSet<(i32, u32)> = self
            .leave
            .months_with_summaries()
            .await?
            .into_iter()
            .collect();

        let missing: Vec<(i32, u32)> = with_sessions
            .into_iter()
            .filter(|month| !with_summaries.contains(month))
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        let users = self.users.list_active().await?;
        for &(year, month) in &missing {
            self.calendar.ensure_year(year).await?;
            for user in &users {
                if let Err(err) = self.project_user(user, year, month).await {
                    log::warn!(
                        "Backfill failed for user {} {}-{:02}: {}",
                        user.id,
                        year,
                        month,
                        err
                    );
                }
            }
        }

        log::info!("Backfilled leave summaries for {} months", missing.len());
        Ok(missing)
    }

    /// Sets the user's absolute balance, then re-projects the month.
    pub async fn adjust_paid_leave(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
        input: AdjustPaidLeaveInput,
    ) -> Result<MonthlySummary, AppError> {
        validate_month(year, month)?;
        let reason = require_reason(&input.reason)?;
        if !input.paid_leave.is_finite() || input.paid_leave < 0.0 {
            return Err(AppError::validation_with_details(
                "paidLeave must be zero or more",
                serde_json::json!({ "paidLeave": "must be >= 0" }),
            ));
        }

        let user = self.users.set_paid_leave(user_id, input.paid_leave).await?;
        log::info!(
            "Admin set paid leave of user {} to {}: {}",
            user.id,
            user.paid_leave,
            reason
        );

        self.project_user(&user, year, month).await
    }

    pub async fn list_summaries(
        &self,
        filter: SummaryFilter,
    ) -> Result<Vec<MonthlySummary>, AppError> {
        validate_month(filter.year, filter.month)?;
        self.leave.list_summaries(&filter).await
    }

    pub async fn list_grants(&self) -> Result<Vec<LeaveGrant>, AppError> {
        self.leave.list_grants().await
    }
}
