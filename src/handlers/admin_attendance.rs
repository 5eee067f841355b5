use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    AppState,
    auth::AdminUser,
    database::models::{
        AdminSessionFilter, CloseSessionInput, DeleteSessionInput, ManualSessionInput,
        SessionStatus, UpdateSessionInput,
    },
    error::AppError,
    handlers::{optional_date, shared::ApiResponse},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub user_id: Option<i64>,
    pub department_id: Option<i64>,
    pub status: Option<String>,
}

impl AdminListQuery {
    fn into_filter(self) -> Result<AdminSessionFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<SessionStatus>().map_err(|_| {
                AppError::validation_with_details(
                    "invalid status",
                    serde_json::json!({ "status": "must be OPEN or CLOSED" }),
                )
            })?),
        };

        Ok(AdminSessionFilter {
            from: optional_date(&self.from)?,
            to: optional_date(&self.to)?,
            user_id: self.user_id,
            department_id: self.department_id,
            status,
        })
    }
}

pub async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;
    let rows = state.attendance.list_admin(filter).await?;
    Ok(ApiResponse::success(rows))
}

pub async fn create(
    state: web::Data<AppState>,
    admin: AdminUser,
    input: web::Json<ManualSessionInput>,
) -> Result<HttpResponse, AppError> {
    log::debug!("Admin {} creating manual session", admin.0.id());
    let session = state.attendance.create_manual(input.into_inner()).await?;
    Ok(ApiResponse::created(session))
}

pub async fn update(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i64>,
    input: web::Json<UpdateSessionInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::debug!("Admin {} updating session {}", admin.0.id(), id);
    let session = state
        .attendance
        .update_session(id, input.into_inner())
        .await?;
    Ok(ApiResponse::success(session))
}

pub async fn close(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i64>,
    input: web::Json<CloseSessionInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::debug!("Admin {} closing session {}", admin.0.id(), id);
    let session = state
        .attendance
        .close_session(id, input.into_inner())
        .await?;
    Ok(ApiResponse::success(session))
}

pub async fn delete(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i64>,
    input: web::Json<DeleteSessionInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::debug!("Admin {} deleting session {}", admin.0.id(), id);
    state.attendance.delete_session(id, &input.reason).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
