use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    AppState,
    auth::AuthUser,
    clock::parse_year_month,
    error::AppError,
    handlers::shared::ApiResponse,
    services::stats::StatsPeriod,
};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub month: Option<String>,
    pub year: Option<i32>,
}

/// `month=YYYY-MM` wins over `year=YYYY`; neither means the current month.
pub async fn me(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, AppError> {
    let period = match (query.month.as_deref().map(str::trim), query.year) {
        (Some(month), _) if !month.is_empty() => {
            let (year, month) = parse_year_month(month)?;
            StatsPeriod::Month(year, month)
        }
        (_, Some(year)) => StatsPeriod::Year(year),
        _ => {
            let (year, month) = state.leave.current_month();
            StatsPeriod::Month(year, month)
        }
    };

    let stats = state.stats.me(auth.id(), period).await?;
    Ok(ApiResponse::success(stats))
}
