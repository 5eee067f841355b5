use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::{models::macros::string_enum, utils::to_units};

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UserRole {
        User => "user",
        Admin => "admin",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UserStatus {
        Active => "active",
        Disabled => "disabled",
    }
}

/// The slice of a user account the attendance core reads. Only `paid_leave` is ever written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub department_id: Option<i64>,
    pub birthday: Option<NaiveDate>,
    pub paid_leave: f64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub department_id: Option<i64>,
    pub birthday: Option<NaiveDate>,
    pub paid_leave: BigDecimal,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            status: row.status,
            department_id: row.department_id,
            birthday: row.birthday,
            paid_leave: to_units(&row.paid_leave),
        }
    }
}
