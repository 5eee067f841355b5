use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    database::{
        models::{
            AdminSessionFilter, AdminSessionRecord, AdminSessionRow, NewSession, Session,
            SessionRow, SessionStatus,
        },
        utils::{sql, to_decimal, to_units},
    },
    error::AppError,
    services::attendance::AttendanceUnits,
};

const SESSION_COLUMNS: &str = r#"
    id,
    user_id,
    work_date,
    check_in_at,
    check_out_at,
    worked_minutes,
    day_unit,
    status,
    checkout_reason,
    created_at,
    updated_at
"#;

/// Persistence for attendance sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Session>, AppError>;

    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<Session>, AppError>;

    /// Most recent OPEN session by work date.
    async fn find_latest_open(&self, user_id: i64) -> Result<Option<Session>, AppError>;

    /// Fails with `Conflict` when (user, work date) is taken.
    async fn create(&self, session: NewSession) -> Result<Session, AppError>;

    async fn update(&self, session: &Session) -> Result<Session, AppError>;

    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Inclusive range, newest work date first.
    async fn list_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Session>, AppError>;

    async fn list_admin(
        &self,
        filter: &AdminSessionFilter,
    ) -> Result<Vec<AdminSessionRecord>, AppError>;
}

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for AttendanceRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            "SELECT {} FROM attendance_sessions WHERE id = ?",
            SESSION_COLUMNS
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            r#"
            SELECT {}
            FROM attendance_sessions
            WHERE user_id = ? AND work_date = ?
            "#,
            SESSION_COLUMNS
        )))
        .bind(user_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    async fn find_latest_open(&self, user_id: i64) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            r#"
            SELECT {}
            FROM attendance_sessions
            WHERE user_id = ? AND status = ?
            ORDER BY work_date DESC
            LIMIT 1
            "#,
            SESSION_COLUMNS
        )))
        .bind(user_id)
        .bind(SessionStatus::Open)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    async fn create(&self, session: NewSession) -> Result<Session, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            r#"
            INSERT INTO attendance_sessions (
                user_id,
                work_date,
                check_in_at,
                check_out_at,
                worked_minutes,
                day_unit,
                status,
                checkout_reason
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        )))
        .bind(session.user_id)
        .bind(session.work_date)
        .bind(session.check_in_at)
        .bind(session.check_out_at)
        .bind(session.worked_minutes)
        .bind(to_decimal(session.day_unit))
        .bind(session.status)
        .bind(session.checkout_reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, session: &Session) -> Result<Session, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            r#"
            UPDATE attendance_sessions
            SET
                user_id = ?,
                work_date = ?,
                check_in_at = ?,
                check_out_at = ?,
                worked_minutes = ?,
                day_unit = ?,
                status = ?,
                checkout_reason = ?,
                updated_at = NOW()
            WHERE id = ?
            RETURNING {}
            "#,
            SESSION_COLUMNS
        )))
        .bind(session.user_id)
        .bind(session.work_date)
        .bind(session.check_in_at)
        .bind(session.check_out_at)
        .bind(session.worked_minutes)
        .bind(to_decimal(session.day_unit))
        .bind(session.status)
        .bind(&session.checkout_reason)
        .bind(session.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(&sql("DELETE FROM attendance_sessions WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query_as::<_, SessionRow>(&sql(&format!(
            r#"
            SELECT {}
            FROM attendance_sessions
            WHERE user_id = ? AND work_date BETWEEN ? AND ?
            ORDER BY work_date DESC
            "#,
            SESSION_COLUMNS
        )))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn list_admin(
        &self,
        filter: &AdminSessionFilter,
    ) -> Result<Vec<AdminSessionRecord>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                s.id,
                s.user_id,
                s.work_date,
                s.check_in_at,
                s.check_out_at,
                s.worked_minutes,
                s.day_unit,
                s.status,
                s.checkout_reason,
                s.created_at,
                s.updated_at,
                u.name AS user_name,
                d.name AS department_name
            FROM attendance_sessions s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN departments d ON d.id = u.department_id
            WHERE 1 = 1
            "#,
        );

        if let Some(from) = filter.from {
            query.push(" AND s.work_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND s.work_date <= ").push_bind(to);
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND s.user_id = ").push_bind(user_id);
        }
        if let Some(department_id) = filter.department_id {
            query.push(" AND u.department_id = ").push_bind(department_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND s.status = ").push_bind(status);
        }
        query.push(" ORDER BY s.work_date DESC, s.created_at DESC");

        let rows = query
            .build_query_as::<AdminSessionRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AdminSessionRecord::from).collect())
    }
}

#[async_trait]
impl AttendanceUnits for AttendanceRepository {
    async fn sum_closed_day_units(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, AppError> {
        let total = sqlx::query_scalar::<_, BigDecimal>(&sql(
            r#"
            SELECT COALESCE(SUM(s.day_unit), 0)
            FROM attendance_sessions s
            JOIN work_calendar c ON c.work_date = s.work_date
            WHERE
                s.user_id = ?
                AND s.status = ?
                AND c.is_working_day = TRUE
                AND s.work_date BETWEEN ? AND ?
            "#,
        ))
        .bind(user_id)
        .bind(SessionStatus::Closed)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(to_units(&total))
    }

    async fn months_with_sessions(&self) -> Result<Vec<(i32, u32)>, AppError> {
        let rows = sqlx::query_as::<_, (i32, i32)>(&sql(
            r#"
            SELECT DISTINCT
                EXTRACT(YEAR FROM work_date)::INT AS year,
                EXTRACT(MONTH FROM work_date)::INT AS month
            FROM attendance_sessions
            ORDER BY year DESC, month DESC
            "#,
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(year, month)| (year, month as u32))
            .collect())
    }
}
