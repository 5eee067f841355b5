use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    AppState,
    auth::AdminUser,
    database::models::{BulkCalendarInput, CalendarDayInput, GenerateYearInput},
    error::AppError,
    handlers::{optional_date, shared::ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct CalendarRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<CalendarRangeQuery>,
) -> Result<HttpResponse, AppError> {
    let (Some(from), Some(to)) = (optional_date(&query.from)?, optional_date(&query.to)?) else {
        return Err(AppError::validation_with_details(
            "from and to are required",
            serde_json::json!({ "from": "required", "to": "required" }),
        ));
    };

    let days = state.calendar.list_range(from, to).await?;
    Ok(ApiResponse::success(days))
}

pub async fn generate(
    state: web::Data<AppState>,
    _admin: AdminUser,
    input: web::Json<GenerateYearInput>,
) -> Result<HttpResponse, AppError> {
    let year = input.year;
    let seeded = state.calendar.generate_year(year).await?;
    Ok(ApiResponse::success(
        serde_json::json!({ "year": year, "seeded": seeded }),
    ))
}

pub async fn upsert_day(
    state: web::Data<AppState>,
    _admin: AdminUser,
    input: web::Json<CalendarDayInput>,
) -> Result<HttpResponse, AppError> {
    let day = state.calendar.upsert_day(input.into_inner()).await?;
    Ok(ApiResponse::success(day))
}

pub async fn bulk_upsert(
    state: web::Data<AppState>,
    _admin: AdminUser,
    input: web::Json<BulkCalendarInput>,
) -> Result<HttpResponse, AppError> {
    let updated = state.calendar.bulk_upsert(input.into_inner().days).await?;
    Ok(ApiResponse::success(serde_json::json!({ "updated": updated })))
}
