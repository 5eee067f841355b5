use actix_web::{HttpResponse, web};

pub mod admin;
pub mod attendance;
pub mod leave;
pub mod stats;

use crate::handlers::shared::{json_config, path_config, query_config};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api/v1")
                .configure(attendance::configure)
                .configure(leave::configure)
                .configure(stats::configure)
                .configure(admin::configure),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
