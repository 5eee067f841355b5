use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::{
    clock::{Clock, first_of_month, last_of_month, month_of},
    database::{
        models::{
            AdminSessionFilter, AdminSessionView, CloseSessionInput, ManualSessionInput,
            MySessionView, NewSession, Session, SessionRange, SessionStatus, TodayView,
            UpdateSessionInput,
        },
        repositories::SessionStore,
    },
    error::AppError,
    services::{require_reason, rules},
};

const ALREADY_CHECKED_IN: &str = "Already checked in today";
const NO_OPEN_SESSION: &str = "No open session found to check out";

/// What the leave engine needs to know about attendance.
#[async_trait]
pub trait AttendanceUnits: Send + Sync {
    /// Day units of CLOSED sessions on working calendar days, inclusive range.
    async fn sum_closed_day_units(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, AppError>;

    /// Distinct (year, month) pairs that have at least one session, newest first.
    async fn months_with_sessions(&self) -> Result<Vec<(i32, u32)>, AppError>;
}

/// Per-user daily session state machine.
#[derive(Clone)]
pub struct AttendanceService {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, clock }
    }

    pub async fn today(&self, user_id: i64) -> Result<TodayView, AppError> {
        let today = self.clock.today();
        let session = self.sessions.find_by_user_and_date(user_id, today).await?;

        Ok(session
            .as_ref()
            .map(TodayView::from)
            .unwrap_or_else(|| TodayView::not_checked_in(today)))
    }

    pub async fn check_in(&self, user_id: i64) -> Result<Session, AppError> {
        let now = self.clock.now();
        let local_now = self.clock.local(now);

        if !rules::is_check_in_allowed(local_now) {
            return Err(AppError::validation(
                "Check-in is outside working hours (08:00-18:00)",
            ));
        }

        let today = local_now.date();
        if self
            .sessions
            .find_by_user_and_date(user_id, today)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(ALREADY_CHECKED_IN.to_string()));
        }

        let session = self
            .sessions
            .create(NewSession {
                user_id,
                work_date: today,
                check_in_at: now,
                check_out_at: None,
                worked_minutes: 0,
                day_unit: rules::day_unit(local_now, None),
                status: SessionStatus::Open,
                checkout_reason: None,
            })
            .await
            .map_err(|err| match err {
                AppError::Conflict(_) => AppError::Conflict(ALREADY_CHECKED_IN.to_string()),
                other => other,
            })?;

        log::info!(
            "User {} checked in for {} at {}",
            user_id,
            today,
            local_now.time()
        );
        Ok(session)
    }

    /// Closes today's session, or the latest OPEN one. Replaying overwrites the close time.
    pub async fn check_out(&self, user_id: i64, reason: Option<String>) -> Result<Session, AppError> {
        let now = self.clock.now();
        let today = self.clock.today();

        let session = match self.sessions.find_by_user_and_date(user_id, today).await? {
            Some(session) => session,
            None => self
                .sessions
                .find_latest_open(user_id)
                .await?
                .ok_or_else(|| AppError::Conflict(NO_OPEN_SESSION.to_string()))?,
        };

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let mut session = session;
        session.check_out_at = Some(now);
        if reason.is_some() {
            session.checkout_reason = reason;
        }
        self.apply_credit(&mut session);
        ensure_ordered(&session)?;

        let session = self.sessions.update(&session).await?;
        log::info!(
            "User {} checked out of {} ({} min, {} unit)",
            user_id,
            session.work_date,
            session.worked_minutes,
            session.day_unit
        );
        Ok(session)
    }

    /// Defaults to the current month in the business zone.
    pub async fn list_mine(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SessionRange<MySessionView>, AppError> {
        let (from, to) = self.resolve_range(from, to)?;
        let rows = self.sessions.list_for_user(user_id, from, to).await?;

        Ok(SessionRange {
            from,
            to,
            rows: rows.into_iter().map(MySessionView::from).collect(),
        })
    }

    pub async fn list_admin(
        &self,
        filter: AdminSessionFilter,
    ) -> Result<Vec<AdminSessionView>, AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::validation("from must not be after to"));
            }
        }

        let records = self.sessions.list_admin(&filter).await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let session = record.session;
                AdminSessionView {
                    id: session.id,
                    user_id: session.user_id,
                    user_name: record.user_name,
                    department_name: record.department_name,
                    work_date: session.work_date,
                    check_in_at: self.wall_clock(session.check_in_at),
                    check_out_at: session.check_out_at.map(|at| self.wall_clock(at)),
                    worked_minutes: session.worked_minutes,
                    day_unit: session.day_unit,
                    status: session.status,
                    checkout_reason: session.checkout_reason,
                    created_at: session.created_at,
                    updated_at: session.updated_at,
                }
            })
            .collect())
    }

    /// Admin backfill. Check-in window policy does not apply.
    pub async fn create_manual(&self, input: ManualSessionInput) -> Result<Session, AppError> {
        let reason = require_reason(&input.reason)?;

        let mut session = Session {
            id: 0,
            user_id: input.user_id,
            work_date: input.work_date,
            check_in_at: input.check_in_at,
            check_out_at: input.check_out_at,
            worked_minutes: 0,
            day_unit: 0.0,
            status: SessionStatus::Open,
            checkout_reason: Some(reason.clone()),
            created_at: self.clock.now(),
            updated_at: self.clock.now(),
        };
        self.apply_credit(&mut session);
        ensure_ordered(&session)?;

        let created = self
            .sessions
            .create(NewSession {
                user_id: session.user_id,
                work_date: session.work_date,
                check_in_at: session.check_in_at,
                check_out_at: session.check_out_at,
                worked_minutes: session.worked_minutes,
                day_unit: session.day_unit,
                status: session.status,
                checkout_reason: session.checkout_reason,
            })
            .await
            .map_err(|err| match err {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "User {} already has a session on {}",
                    input.user_id, input.work_date
                )),
                other => other,
            })?;

        log::info!(
            "Admin created session {} for user {} on {}: {}",
            created.id,
            created.user_id,
            created.work_date,
            reason
        );
        Ok(created)
    }

    /// Updates a session; an unknown id with `userId` and `workDate` creates one instead.
    pub async fn update_session(
        &self,
        id: i64,
        input: UpdateSessionInput,
    ) -> Result<Session, AppError> {
        let reason = require_reason(&input.reason)?;

        let Some(mut session) = self.sessions.find_by_id(id).await? else {
            let (Some(user_id), Some(work_date)) = (input.user_id, input.work_date) else {
                return Err(AppError::NotFound(format!(
                    "Attendance session {} not found",
                    id
                )));
            };
            let check_in_at = input.check_in_at.ok_or_else(|| {
                AppError::validation_with_details(
                    "checkInAt is required to create a session",
                    serde_json::json!({ "checkInAt": "required" }),
                )
            })?;

            return self
                .create_manual(ManualSessionInput {
                    user_id,
                    work_date,
                    check_in_at,
                    check_out_at: input.check_out_at.flatten(),
                    reason,
                })
                .await;
        };

        if let Some(check_in_at) = input.check_in_at {
            session.check_in_at = check_in_at;
        }
        if let Some(check_out_at) = input.check_out_at {
            session.check_out_at = check_out_at;
        }
        session.checkout_reason = Some(reason.clone());
        self.apply_credit(&mut session);
        ensure_ordered(&session)?;

        let updated = self.sessions.update(&session).await?;
        log::info!(
            "Admin updated session {} (status {}): {}",
            updated.id,
            updated.status,
            reason
        );
        Ok(updated)
    }

    pub async fn close_session(
        &self,
        id: i64,
        input: CloseSessionInput,
    ) -> Result<Session, AppError> {
        let reason = require_reason(&input.reason)?;

        let mut session = self
            .sessions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attendance session {} not found", id)))?;

        session.check_out_at = Some(input.check_out_at);
        session.checkout_reason = Some(reason.clone());
        self.apply_credit(&mut session);
        ensure_ordered(&session)?;

        let closed = self.sessions.update(&session).await?;
        log::info!("Admin closed session {}: {}", closed.id, reason);
        Ok(closed)
    }

    pub async fn delete_session(&self, id: i64, reason: &str) -> Result<(), AppError> {
        let reason = require_reason(reason)?;

        if !self.sessions.delete(id).await? {
            return Err(AppError::NotFound(format!(
                "Attendance session {} not found",
                id
            )));
        }

        log::info!("Admin deleted session {}: {}", id, reason);
        Ok(())
    }

    /// Derives status, worked minutes and day unit from the session's instants.
    fn apply_credit(&self, session: &mut Session) {
        let check_in = self.clock.local(session.check_in_at);

        match session.check_out_at {
            Some(check_out_at) => {
                let check_out = self.clock.local(check_out_at);
                session.status = SessionStatus::Closed;
                session.worked_minutes = rules::worked_minutes(check_in, check_out);
                session.day_unit = rules::day_unit(check_in, Some(check_out));
            }
            None => {
                session.status = SessionStatus::Open;
                session.worked_minutes = 0;
                session.day_unit = rules::day_unit(check_in, None);
            }
        }
    }

    fn resolve_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate), AppError> {
        let (year, month) = month_of(self.clock.today());
        let month_start = first_of_month(year, month)
            .ok_or_else(|| AppError::internal("current month has no first day"))?;
        let month_end = last_of_month(year, month)
            .ok_or_else(|| AppError::internal("current month has no last day"))?;

        let from = from.unwrap_or(month_start);
        let to = to.unwrap_or(month_end);
        if from > to {
            return Err(AppError::validation("from must not be after to"));
        }
        Ok((from, to))
    }

    fn wall_clock(&self, instant: DateTime<Utc>) -> String {
        self.clock.local(instant).format("%H:%M:%S").to_string()
    }
}

fn ensure_ordered(session: &Session) -> Result<(), AppError> {
    match session.check_out_at {
        Some(check_out_at) if check_out_at < session.check_in_at => {
            Err(AppError::validation_with_details(
                "checkOutAt must not be before checkInAt",
                serde_json::json!({ "checkOutAt": "before checkInAt" }),
            ))
        }
        _ => Ok(()),
    }
}
