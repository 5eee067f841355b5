#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use attendance_be::{
    AppError, AppState, Config, Stores,
    auth::issue_access_token,
    clock::FixedClock,
    config::{AuthConfig, DatabaseConfig},
    database::{
        models::{
            AdminSessionFilter, AdminSessionRecord, CalendarDay, GrantType, LeaveGrant,
            MonthlySummary, NewSession, Session, SessionStatus, SummaryFilter, User, UserRole,
            UserStatus,
        },
        repositories::{
            CalendarStore, LeaveStore, SessionStore, UserStore, work_calendar::seed_year,
        },
    },
    services::AttendanceUnits,
};

pub const JWT_SECRET: &str = "test-jwt-secret-key-that-is-long-enough";

pub fn zone() -> Tz {
    chrono_tz::Asia::Ho_Chi_Minh
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn local(day: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{} {}", day, time), "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Instant of a business-zone wall-clock reading.
pub fn instant(day: &str, time: &str) -> chrono::DateTime<Utc> {
    attendance_be::clock::at_local(zone(), local(day, time))
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        http_addr: ":0".to_string(),
        app_tz: "Asia/Ho_Chi_Minh".to_string(),
        database: DatabaseConfig {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "time_attendance_test".to_string(),
            params: String::new(),
        },
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::hours(168),
            cookie_secure: false,
            cookie_same_site: "Lax".to_string(),
        },
        leave_scheduler_enabled: false,
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    departments: HashMap<i64, String>,
    sessions: BTreeMap<i64, Session>,
    calendar: BTreeMap<NaiveDate, CalendarDay>,
    summaries: BTreeMap<(i64, i32, u32), MonthlySummary>,
    grants: Vec<LeaveGrant>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory implementation of every storage seam, with the same ordering and uniqueness rules
/// as the Postgres repositories.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores(&self) -> Stores {
        let store = Arc::new(self.clone());
        Stores {
            users: store.clone(),
            sessions: store.clone(),
            units: store.clone(),
            calendar: store.clone(),
            leave: store,
        }
    }

    pub async fn add_department(&self, name: &str) -> i64 {
        let mut state = self.inner.write().await;
        let id = state.next_id();
        state.departments.insert(id, name.to_string());
        id
    }

    pub async fn add_user(&self, name: &str, role: UserRole) -> User {
        self.insert_user(name, role, UserStatus::Active, None, None, 0.0)
            .await
    }

    pub async fn insert_user(
        &self,
        name: &str,
        role: UserRole,
        status: UserStatus,
        department_id: Option<i64>,
        birthday: Option<NaiveDate>,
        paid_leave: f64,
    ) -> User {
        let mut state = self.inner.write().await;
        let id = state.next_id();
        let user = User {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            status,
            department_id,
            birthday,
            paid_leave,
        };
        state.users.insert(id, user.clone());
        user
    }

    pub async fn user(&self, id: i64) -> User {
        self.inner.read().await.users[&id].clone()
    }

    pub async fn paid_leave(&self, id: i64) -> f64 {
        self.user(id).await.paid_leave
    }

    pub async fn grant_count(&self, year: i32, month: u32, grant_type: GrantType) -> usize {
        self.inner
            .read()
            .await
            .grants
            .iter()
            .filter(|g| {
                g.grant_year == year && g.grant_month == month as i32 && g.grant_type == grant_type
            })
            .count()
    }

    pub async fn summary(&self, user_id: i64, year: i32, month: u32) -> Option<MonthlySummary> {
        self.inner
            .read()
            .await
            .summaries
            .get(&(user_id, year, month))
            .cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn calendar_len(&self, year: i32) -> usize {
        self.inner
            .read()
            .await
            .calendar
            .keys()
            .filter(|d| d.year() == year)
            .count()
    }

    /// Inserts a session directly, bypassing policy.
    pub async fn insert_session(
        &self,
        user_id: i64,
        work_date: &str,
        check_in: &str,
        check_out: Option<&str>,
        day_unit: f64,
    ) -> Session {
        let status = if check_out.is_some() {
            SessionStatus::Closed
        } else {
            SessionStatus::Open
        };
        self.create(NewSession {
            user_id,
            work_date: date(work_date),
            check_in_at: instant(work_date, check_in),
            check_out_at: check_out.map(|out| instant(work_date, out)),
            worked_minutes: 0,
            day_unit,
            status,
            checkout_reason: None,
        })
        .await
        .unwrap()
    }

    /// Seeds the year, then makes only the listed days of the month working days.
    pub async fn working_days_only(&self, year: i32, month: u32, days: &[(u32, f64)]) {
        self.ensure_year(year).await.unwrap();
        let mut state = self.inner.write().await;
        for day in state.calendar.values_mut() {
            if day.work_date.year() == year && day.work_date.month() == month {
                match days.iter().find(|(d, _)| *d == day.work_date.day()) {
                    Some((_, unit)) => {
                        day.is_working_day = true;
                        day.work_unit = *unit;
                    }
                    None => {
                        day.is_working_day = false;
                        day.work_unit = 0.0;
                    }
                }
            }
        }
    }
}

fn conflict() -> AppError {
    AppError::Conflict("Record already exists".to_string())
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Session>, AppError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.work_date == work_date)
            .cloned())
    }

    async fn find_latest_open(&self, user_id: i64) -> Result<Option<Session>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Open)
            .max_by_key(|s| s.work_date)
            .cloned())
    }

    async fn create(&self, session: NewSession) -> Result<Session, AppError> {
        let mut state = self.inner.write().await;
        if state
            .sessions
            .values()
            .any(|s| s.user_id == session.user_id && s.work_date == session.work_date)
        {
            return Err(conflict());
        }

        let id = state.next_id();
        let now = Utc::now();
        let created = Session {
            id,
            user_id: session.user_id,
            work_date: session.work_date,
            check_in_at: session.check_in_at,
            check_out_at: session.check_out_at,
            worked_minutes: session.worked_minutes,
            day_unit: session.day_unit,
            status: session.status,
            checkout_reason: session.checkout_reason,
            created_at: now,
            updated_at: now,
        };
        state.sessions.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, session: &Session) -> Result<Session, AppError> {
        let mut state = self.inner.write().await;
        let Some(existing) = state.sessions.get(&session.id).cloned() else {
            return Err(AppError::from(sqlx::Error::RowNotFound));
        };

        let mut updated = session.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = Utc::now();
        state.sessions.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.inner.write().await.sessions.remove(&id).is_some())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Session>, AppError> {
        let state = self.inner.read().await;
        let mut rows: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.work_date >= from && s.work_date <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.work_date.cmp(&a.work_date));
        Ok(rows)
    }

    async fn list_admin(
        &self,
        filter: &AdminSessionFilter,
    ) -> Result<Vec<AdminSessionRecord>, AppError> {
        let state = self.inner.read().await;
        let mut rows: Vec<AdminSessionRecord> = state
            .sessions
            .values()
            .filter_map(|s| {
                let user = state.users.get(&s.user_id)?;
                let keep = filter.from.is_none_or(|from| s.work_date >= from)
                    && filter.to.is_none_or(|to| s.work_date <= to)
                    && filter.user_id.is_none_or(|id| s.user_id == id)
                    && filter
                        .department_id
                        .is_none_or(|id| user.department_id == Some(id))
                    && filter.status.is_none_or(|status| s.status == status);
                keep.then(|| AdminSessionRecord {
                    session: s.clone(),
                    user_name: user.name.clone(),
                    department_name: user
                        .department_id
                        .and_then(|id| state.departments.get(&id).cloned()),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.session
                .work_date
                .cmp(&a.session.work_date)
                .then(b.session.created_at.cmp(&a.session.created_at))
        });
        Ok(rows)
    }
}

#[async_trait]
impl AttendanceUnits for MemoryStore {
    async fn sum_closed_day_units(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, AppError> {
        let state = self.inner.read().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.status == SessionStatus::Closed
                    && s.work_date >= from
                    && s.work_date <= to
                    && state
                        .calendar
                        .get(&s.work_date)
                        .is_some_and(|day| day.is_working_day)
            })
            .map(|s| s.day_unit)
            .sum())
    }

    async fn months_with_sessions(&self) -> Result<Vec<(i32, u32)>, AppError> {
        let state = self.inner.read().await;
        let months: BTreeSet<(i32, u32)> = state
            .sessions
            .values()
            .map(|s| (s.work_date.year(), s.work_date.month()))
            .collect();
        Ok(months.into_iter().rev().collect())
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn ensure_year(&self, year: i32) -> Result<bool, AppError> {
        let mut state = self.inner.write().await;
        if state.calendar.keys().any(|d| d.year() == year) {
            return Ok(false);
        }
        for day in seed_year(year) {
            state.calendar.insert(day.work_date, day);
        }
        Ok(true)
    }

    async fn upsert(&self, day: &CalendarDay) -> Result<CalendarDay, AppError> {
        self.inner
            .write()
            .await
            .calendar
            .insert(day.work_date, day.clone());
        Ok(day.clone())
    }

    async fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarDay>, AppError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .inner
            .read()
            .await
            .calendar
            .range(from..=to)
            .map(|(_, day)| day.clone())
            .collect())
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<CalendarDay>, AppError> {
        Ok(self.inner.read().await.calendar.get(&date).cloned())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn upsert_summary(&self, summary: &MonthlySummary) -> Result<MonthlySummary, AppError> {
        self.inner.write().await.summaries.insert(
            (summary.user_id, summary.year, summary.month),
            summary.clone(),
        );
        Ok(summary.clone())
    }

    async fn list_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> Result<Vec<MonthlySummary>, AppError> {
        let state = self.inner.read().await;
        Ok(state
            .summaries
            .values()
            .filter(|s| s.year == filter.year && s.month == filter.month)
            .filter(|s| filter.user_id.is_none_or(|id| s.user_id == id))
            .filter(|s| {
                filter.department_id.is_none_or(|id| {
                    state
                        .users
                        .get(&s.user_id)
                        .is_some_and(|u| u.department_id == Some(id))
                })
            })
            .cloned()
            .collect())
    }

    async fn user_ids_with_summary(&self, year: i32, month: u32) -> Result<Vec<i64>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .summaries
            .keys()
            .filter(|(_, y, m)| *y == year && *m == month)
            .map(|(user_id, _, _)| *user_id)
            .collect())
    }

    async fn months_with_summaries(&self) -> Result<Vec<(i32, u32)>, AppError> {
        let state = self.inner.read().await;
        let months: BTreeSet<(i32, u32)> =
            state.summaries.keys().map(|(_, y, m)| (*y, *m)).collect();
        Ok(months.into_iter().rev().collect())
    }

    async fn has_grant(
        &self,
        year: i32,
        month: u32,
        grant_type: GrantType,
    ) -> Result<bool, AppError> {
        Ok(self.grant_count(year, month, grant_type).await > 0)
    }

    async fn list_grants(&self) -> Result<Vec<LeaveGrant>, AppError> {
        let mut grants = self.inner.read().await.grants.clone();
        grants.sort_by(|a, b| {
            (b.grant_year, b.grant_month)
                .cmp(&(a.grant_year, a.grant_month))
                .then(a.grant_type.as_str().cmp(b.grant_type.as_str()))
        });
        Ok(grants)
    }

    async fn apply_monthly_grant(
        &self,
        year: i32,
        month: u32,
        user_ids: &[i64],
        amount: f64,
    ) -> Result<bool, AppError> {
        let mut state = self.inner.write().await;
        if !insert_fence(&mut state, year, month, GrantType::Monthly) {
            return Ok(false);
        }
        for id in user_ids {
            if let Some(user) = state.users.get_mut(id) {
                user.paid_leave += amount;
            }
        }
        Ok(true)
    }

    async fn apply_deduction(
        &self,
        year: i32,
        month: u32,
        deductions: &[(i64, f64)],
    ) -> Result<bool, AppError> {
        let mut state = self.inner.write().await;
        if !insert_fence(&mut state, year, month, GrantType::Deduction) {
            return Ok(false);
        }
        for (id, amount) in deductions {
            if let Some(user) = state.users.get_mut(id) {
                user.paid_leave = (user.paid_leave - amount).max(0.0);
            }
        }
        Ok(true)
    }
}

fn insert_fence(state: &mut MemoryState, year: i32, month: u32, grant_type: GrantType) -> bool {
    if state.grants.iter().any(|g| {
        g.grant_year == year && g.grant_month == month as i32 && g.grant_type == grant_type
    }) {
        return false;
    }
    let id = state.next_id();
    state.grants.push(LeaveGrant {
        id,
        grant_year: year,
        grant_month: month as i32,
        grant_type,
        created_at: Utc::now(),
    });
    true
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<User>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .filter(|u| u.is_active())
            .cloned()
            .collect())
    }

    async fn set_paid_leave(&self, id: i64, paid_leave: f64) -> Result<User, AppError> {
        let mut state = self.inner.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.paid_leave = paid_leave;
        Ok(user.clone())
    }
}

/// Engines over a fresh in-memory store, pinned to a business-zone wall-clock reading.
pub struct TestContext {
    pub store: MemoryStore,
    pub clock: Arc<FixedClock>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn at(day: &str, time: &str) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(FixedClock::at_local(zone(), local(day, time)));
        let state = web::Data::new(AppState::new(
            test_config(),
            clock.clone(),
            store.stores(),
        ));
        Self {
            store,
            clock,
            state,
        }
    }

    pub fn set_time(&self, day: &str, time: &str) {
        self.clock.set_local(local(day, time));
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_access_token(user.id, user.role, JWT_SECRET, Duration::minutes(15)).unwrap()
    }
}
