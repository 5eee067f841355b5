use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::{models::macros::string_enum, utils::to_units};

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum GrantType {
        Monthly => "MONTHLY",
        Deduction => "DEDUCTION",
    }
}

/// Projection of one user's month: expectation, credit and how the shortfall is covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub user_id: i64,
    pub year: i32,
    pub month: u32,
    pub expected_units: f64,
    pub worked_units: f64,
    pub missing_units: f64,
    pub paid_used_units: f64,
    pub unpaid_units: f64,
    pub is_birthday: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct MonthlySummaryRow {
    pub user_id: i64,
    pub year: i32,
    pub month: i32,
    pub expected_units: BigDecimal,
    pub worked_units: BigDecimal,
    pub missing_units: BigDecimal,
    pub paid_used_units: BigDecimal,
    pub unpaid_units: BigDecimal,
    pub is_birthday: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<MonthlySummaryRow> for MonthlySummary {
    fn from(row: MonthlySummaryRow) -> Self {
        Self {
            user_id: row.user_id,
            year: row.year,
            month: row.month as u32,
            expected_units: to_units(&row.expected_units),
            worked_units: to_units(&row.worked_units),
            missing_units: to_units(&row.missing_units),
            paid_used_units: to_units(&row.paid_used_units),
            unpaid_units: to_units(&row.unpaid_units),
            is_birthday: row.is_birthday,
            updated_at: row.updated_at,
        }
    }
}

/// Fence row: its presence means the grant (or deduction) for that month has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGrant {
    pub id: i64,
    pub grant_year: i32,
    pub grant_month: i32,
    pub grant_type: GrantType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub year: i32,
    pub month: u32,
    pub user_id: Option<i64>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantOutcome {
    pub year: i32,
    pub month: u32,
    pub applied: bool,
    pub users: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrantInput {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPaidLeaveInput {
    pub paid_leave: f64,
    #[serde(default)]
    pub reason: String,
}
