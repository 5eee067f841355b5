use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    AppState,
    auth::AuthUser,
    database::models::CheckOutInput,
    error::AppError,
    handlers::{optional_date, shared::ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Today's session, or a NOT_CHECKED_IN placeholder
pub async fn today(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let view = state.attendance.today(auth.id()).await?;
    Ok(ApiResponse::success(view))
}

pub async fn check_in(
    state: web::Data<AppState>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let session = state.attendance.check_in(auth.id()).await?;
    Ok(ApiResponse::success(session))
}

pub async fn check_out(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: Option<web::Json<CheckOutInput>>,
) -> Result<HttpResponse, AppError> {
    let input = body.map(|b| b.into_inner()).unwrap_or_default();
    let session = state.attendance.check_out(auth.id(), input.reason).await?;
    Ok(ApiResponse::success(session))
}

pub async fn list_mine(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let from = optional_date(&query.from)?;
    let to = optional_date(&query.to)?;

    let range = state.attendance.list_mine(auth.id(), from, to).await?;
    Ok(ApiResponse::success(range))
}
