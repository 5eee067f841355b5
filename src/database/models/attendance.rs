use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::database::{models::macros::string_enum, utils::to_units};

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum SessionStatus {
        Open => "OPEN",
        Closed => "CLOSED",
    }
}

/// One attendance session per (user, work date).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: SessionStatus,
    pub checkout_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: i32,
    pub day_unit: BigDecimal,
    pub status: SessionStatus,
    pub checkout_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            work_date: row.work_date,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            worked_minutes: row.worked_minutes,
            day_unit: to_units(&row.day_unit),
            status: row.status,
            checkout_reason: row.checkout_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Values for a session row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: SessionStatus,
    pub checkout_reason: Option<String>,
}

/// Session joined with the owner's display data for the admin listing.
#[derive(Debug, sqlx::FromRow)]
pub struct AdminSessionRow {
    #[sqlx(flatten)]
    pub session: SessionRow,
    pub user_name: String,
    pub department_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminSessionRecord {
    pub session: Session,
    pub user_name: String,
    pub department_name: Option<String>,
}

impl From<AdminSessionRow> for AdminSessionRecord {
    fn from(row: AdminSessionRow) -> Self {
        Self {
            session: row.session.into(),
            user_name: row.user_name,
            department_name: row.department_name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminSessionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<i64>,
    pub department_id: Option<i64>,
    pub status: Option<SessionStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodayStatus {
    NotCheckedIn,
    Open,
    Closed,
}

impl From<SessionStatus> for TodayStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Open => TodayStatus::Open,
            SessionStatus::Closed => TodayStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayView {
    pub work_date: NaiveDate,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: TodayStatus,
}

impl TodayView {
    pub fn not_checked_in(work_date: NaiveDate) -> Self {
        Self {
            work_date,
            check_in_at: None,
            check_out_at: None,
            worked_minutes: 0,
            day_unit: 0.0,
            status: TodayStatus::NotCheckedIn,
        }
    }
}

impl From<&Session> for TodayView {
    fn from(session: &Session) -> Self {
        Self {
            work_date: session.work_date,
            check_in_at: Some(session.check_in_at),
            check_out_at: session.check_out_at,
            worked_minutes: session.worked_minutes,
            day_unit: session.day_unit,
            status: session.status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MySessionView {
    pub work_date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: SessionStatus,
}

impl From<Session> for MySessionView {
    fn from(session: Session) -> Self {
        Self {
            work_date: session.work_date,
            check_in_at: session.check_in_at,
            check_out_at: session.check_out_at,
            worked_minutes: session.worked_minutes,
            day_unit: session.day_unit,
            status: session.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionRange<T> {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<T>,
}

/// Admin listing row; times are wall-clock `HH:MM:SS` in the business zone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSessionView {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub department_name: Option<String>,
    pub work_date: NaiveDate,
    pub check_in_at: String,
    pub check_out_at: Option<String>,
    pub worked_minutes: i32,
    pub day_unit: f64,
    pub status: SessionStatus,
    pub checkout_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckOutInput {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSessionInput {
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    #[serde(default)]
    pub check_out_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
}

/// Admin PATCH body. `checkOutAt` absent keeps the close time, `null` reopens the session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionInput {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub work_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_in_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub check_out_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionInput {
    pub check_out_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteSessionInput {
    #[serde(default)]
    pub reason: String,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
