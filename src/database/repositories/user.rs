use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    database::{
        models::{User, UserRow, UserStatus},
        utils::{sql, to_decimal},
    },
    error::AppError,
};

const USER_COLUMNS: &str = r#"
    id,
    name,
    email,
    role,
    status,
    department_id,
    birthday,
    paid_leave
"#;

/// Read access to accounts plus the one balance write admins perform directly.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn list_active(&self) -> Result<Vec<User>, AppError>;

    /// Sets the absolute paid-leave balance.
    async fn set_paid_leave(&self, id: i64, paid_leave: f64) -> Result<User, AppError>;
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&sql(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_active(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&sql(&format!(
            "SELECT {} FROM users WHERE status = ? ORDER BY id",
            USER_COLUMNS
        )))
        .bind(UserStatus::Active)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn set_paid_leave(&self, id: i64, paid_leave: f64) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&sql(&format!(
            r#"
            UPDATE users
            SET paid_leave = ?, updated_at = NOW()
            WHERE id = ?
            RETURNING {}
            "#,
            USER_COLUMNS
        )))
        .bind(to_decimal(paid_leave))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}
