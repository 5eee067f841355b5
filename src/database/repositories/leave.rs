use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    database::{
        models::{GrantType, LeaveGrant, MonthlySummary, MonthlySummaryRow, SummaryFilter},
        transaction::DatabaseTransaction,
        utils::{sql, to_decimal},
    },
    error::AppError,
};

const SUMMARY_COLUMNS: &str = r#"
    user_id,
    year,
    month,
    expected_units,
    worked_units,
    missing_units,
    paid_used_units,
    unpaid_units,
    is_birthday,
    updated_at
"#;

/// Persistence for monthly summaries, grant/deduction fences and the balance writes they guard.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn upsert_summary(&self, summary: &MonthlySummary) -> Result<MonthlySummary, AppError>;

    async fn list_summaries(&self, filter: &SummaryFilter)
    -> Result<Vec<MonthlySummary>, AppError>;

    async fn user_ids_with_summary(&self, year: i32, month: u32) -> Result<Vec<i64>, AppError>;

    async fn months_with_summaries(&self) -> Result<Vec<(i32, u32)>, AppError>;

    /// Ignores soft-deleted fences.
    async fn has_grant(
        &self,
        year: i32,
        month: u32,
        grant_type: GrantType,
    ) -> Result<bool, AppError>;

    /// Non-deleted fences, newest month first.
    async fn list_grants(&self) -> Result<Vec<LeaveGrant>, AppError>;

    /// Inserts the MONTHLY fence and, only if this call created it, adds `amount` to each
    /// user's balance. Both happen in one transaction. Returns whether the grant was applied.
    async fn apply_monthly_grant(
        &self,
        year: i32,
        month: u32,
        user_ids: &[i64],
        amount: f64,
    ) -> Result<bool, AppError>;

    /// Inserts the DEDUCTION fence and, only if this call created it, subtracts each amount
    /// from the user's balance, clamped at zero. Returns whether the deduction was applied.
    async fn apply_deduction(
        &self,
        year: i32,
        month: u32,
        deductions: &[(i64, f64)],
    ) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct LeaveRepository {
    pool: PgPool,
}

impl LeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_FENCE: &str = r#"
    INSERT INTO leave_grants (grant_year, grant_month, grant_type)
    VALUES (?, ?, ?)
    ON CONFLICT (grant_year, grant_month, grant_type) DO NOTHING
    RETURNING id
"#;

#[async_trait]
impl LeaveStore for LeaveRepository {
    async fn upsert_summary(&self, summary: &MonthlySummary) -> Result<MonthlySummary, AppError> {
        let row = sqlx::query_as::<_, MonthlySummaryRow>(&sql(&format!(
            r#"
            INSERT INTO leave_monthly_summary (
                user_id,
                year,
                month,
                expected_units,
                worked_units,
                missing_units,
                paid_used_units,
                unpaid_units,
                is_birthday,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, year, month) DO UPDATE
            SET
                expected_units = EXCLUDED.expected_units,
                worked_units = EXCLUDED.worked_units,
                missing_units = EXCLUDED.missing_units,
                paid_used_units = EXCLUDED.paid_used_units,
                unpaid_units = EXCLUDED.unpaid_units,
                is_birthday = EXCLUDED.is_birthday,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            SUMMARY_COLUMNS
        )))
        .bind(summary.user_id)
        .bind(summary.year)
        .bind(summary.month as i32)
        .bind(to_decimal(summary.expected_units))
        .bind(to_decimal(summary.worked_units))
        .bind(to_decimal(summary.missing_units))
        .bind(to_decimal(summary.paid_used_units))
        .bind(to_decimal(summary.unpaid_units))
        .bind(summary.is_birthday)
        .bind(summary.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> Result<Vec<MonthlySummary>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                s.user_id,
                s.year,
                s.month,
                s.expected_units,
                s.worked_units,
                s.missing_units,
                s.paid_used_units,
                s.unpaid_units,
                s.is_birthday,
                s.updated_at
            FROM leave_monthly_summary s
            JOIN users u ON u.id = s.user_id
            WHERE s.year = "#,
        );
        query.push_bind(filter.year);
        query.push(" AND s.month = ").push_bind(filter.month as i32);

        if let Some(user_id) = filter.user_id {
            query.push(" AND s.user_id = ").push_bind(user_id);
        }
        if let Some(department_id) = filter.department_id {
            query.push(" AND u.department_id = ").push_bind(department_id);
        }
        query.push(" ORDER BY s.user_id ASC");

        let rows = query
            .build_query_as::<MonthlySummaryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(MonthlySummary::from).collect())
    }

    async fn user_ids_with_summary(&self, year: i32, month: u32) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(&sql(
            r#"
            SELECT user_id
            FROM leave_monthly_summary
            WHERE year = ? AND month = ?
            ORDER BY user_id
            "#,
        ))
        .bind(year)
        .bind(month as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn months_with_summaries(&self) -> Result<Vec<(i32, u32)>, AppError> {
        let rows = sqlx::query_as::<_, (i32, i32)>(&sql(
            r#"
            SELECT DISTINCT year, month
            FROM leave_monthly_summary
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

    async fn has_grant(
        &self,
        year: i32,
        month: u32,
        grant_type: GrantType,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(&sql(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM leave_grants
                WHERE
                    grant_year = ?
                    AND grant_month = ?
                    AND grant_type = ?
                    AND deleted_at IS NULL
            )
            "#,
        ))
        .bind(year)
        .bind(month as i32)
        .bind(grant_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_grants(&self) -> Result<Vec<LeaveGrant>, AppError> {
        let grants = sqlx::query_as::<_, LeaveGrant>(&sql(
            r#"
            SELECT id, grant_year, grant_month, grant_type, created_at
            FROM leave_grants
            WHERE deleted_at IS NULL
            ORDER BY grant_year DESC, grant_month DESC, grant_type ASC
            "#,
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    async fn apply_monthly_grant(
        &self,
        year: i32,
        month: u32,
        user_ids: &[i64],
        amount: f64,
    ) -> Result<bool, AppError> {
        let user_ids = user_ids.to_vec();

        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let fence = sqlx::query_scalar::<_, i64>(&sql(INSERT_FENCE))
                    .bind(year)
                    .bind(month as i32)
                    .bind(GrantType::Monthly)
                    .fetch_optional(&mut **tx)
                    .await?;

                if fence.is_none() {
                    return Ok(false);
                }

                if !user_ids.is_empty() {
                    sqlx::query(&sql(
                        r#"
                        UPDATE users
                        SET paid_leave = paid_leave + ?, updated_at = NOW()
                        WHERE id = ANY(?)
                        "#,
                    ))
                    .bind(to_decimal(amount))
                    .bind(&user_ids)
                    .execute(&mut **tx)
                    .await?;
                }

                Ok(true)
            })
        })
        .await
    }

    async fn apply_deduction(
        &self,
        year: i32,
        month: u32,
        deductions: &[(i64, f64)],
    ) -> Result<bool, AppError> {
        let deductions = deductions.to_vec();

        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let fence = sqlx::query_scalar::<_, i64>(&sql(INSERT_FENCE))
                    .bind(year)
                    .bind(month as i32)
                    .bind(GrantType::Deduction)
                    .fetch_optional(&mut **tx)
                    .await?;

                if fence.is_none() {
                    return Ok(false);
                }

                for (user_id, amount) in deductions {
                    sqlx::query(&sql(
                        r#"
                        UPDATE users
                        SET paid_leave = GREATEST(paid_leave - ?, 0), updated_at = NOW()
                        WHERE id = ?
                        "#,
                    ))
                    .bind(to_decimal(amount))
                    .bind(user_id)
                    .execute(&mut **tx)
                    .await?;
                }

                Ok(true)
            })
        })
        .await
    }
}
