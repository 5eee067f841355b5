use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    database::models::{AdjustPaidLeaveInput, GrantInput, SummaryFilter},
    error::AppError,
    handlers::shared::ApiResponse,
    services::leave::validate_month,
};

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMonthQuery {
    pub user_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummariesQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub user_id: Option<i64>,
    pub department_id: Option<i64>,
}

fn resolve_month(
    state: &AppState,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<(i32, u32), AppError> {
    let (current_year, current_month) = state.leave.current_month();
    let year = year.unwrap_or(current_year);
    let month = month.unwrap_or(current_month);
    validate_month(year, month)?;
    Ok((year, month))
}

fn required_user(user_id: Option<i64>) -> Result<i64, AppError> {
    user_id.ok_or_else(|| {
        AppError::validation_with_details(
            "userId is required",
            serde_json::json!({ "userId": "required" }),
        )
    })
}

pub async fn my_summary(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = resolve_month(&state, query.year, query.month)?;
    let summary = state.leave.project(auth.id(), year, month).await?;
    Ok(ApiResponse::success(summary))
}

pub async fn grant(
    state: web::Data<AppState>,
    admin: AdminUser,
    body: Option<web::Json<GrantInput>>,
) -> Result<HttpResponse, AppError> {
    let input = body.map(|b| b.into_inner()).unwrap_or_default();
    let (year, month) = resolve_month(&state, input.year, input.month)?;

    log::info!(
        "Admin {} requested monthly grant for {}-{:02}",
        admin.0.id(),
        year,
        month
    );
    let outcome = state.leave.process_monthly_grant(year, month).await?;
    Ok(ApiResponse::success(outcome))
}

pub async fn summary(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<UserMonthQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = required_user(query.user_id)?;
    let (year, month) = resolve_month(&state, query.year, query.month)?;
    let summary = state.leave.project(user_id, year, month).await?;
    Ok(ApiResponse::success(summary))
}

pub async fn summaries(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<SummariesQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let (year, month) = resolve_month(&state, query.year, query.month)?;
    let rows = state
        .leave
        .list_summaries(SummaryFilter {
            year,
            month,
            user_id: query.user_id,
            department_id: query.department_id,
        })
        .await?;
    Ok(ApiResponse::success(rows))
}

pub async fn recalculate(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<UserMonthQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = required_user(query.user_id)?;
    let (year, month) = resolve_month(&state, query.year, query.month)?;
    let summary = state.leave.project(user_id, year, month).await?;
    Ok(ApiResponse::success(summary))
}

pub async fn adjust_paid_leave(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<(i64, i32, u32)>,
    input: web::Json<AdjustPaidLeaveInput>,
) -> Result<HttpResponse, AppError> {
    let (user_id, year, month) = path.into_inner();
    let summary = state
        .leave
        .adjust_paid_leave(user_id, year, month, input.into_inner())
        .await?;
    Ok(ApiResponse::success(summary))
}

pub async fn grants(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let grants = state.leave.list_grants().await?;
    Ok(ApiResponse::success(grants))
}
