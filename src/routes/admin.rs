use actix_web::web;

use crate::handlers::{admin_attendance, leave, work_calendar};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::scope("/attendance")
                    .route("", web::get().to(admin_attendance::list))
                    .route("", web::post().to(admin_attendance::create))
                    .route("/{id}", web::patch().to(admin_attendance::update))
                    .route("/{id}", web::delete().to(admin_attendance::delete))
                    .route("/{id}/close", web::post().to(admin_attendance::close)),
            )
            .service(
                web::scope("/work-calendar")
                    .route("", web::get().to(work_calendar::list))
                    .route("/generate", web::post().to(work_calendar::generate))
                    .route("/day", web::put().to(work_calendar::upsert_day))
                    .route("/bulk", web::post().to(work_calendar::bulk_upsert)),
            )
            .service(
                web::scope("/leave")
                    .route("/grant", web::post().to(leave::grant))
                    .route("/grants", web::get().to(leave::grants))
                    .route("/summary", web::get().to(leave::summary))
                    .route("/summaries", web::get().to(leave::summaries))
                    .route("/summary/recalculate", web::post().to(leave::recalculate))
                    .route(
                        "/summary/{user_id}/{year}/{month}",
                        web::patch().to(leave::adjust_paid_leave),
                    ),
            ),
    );
}
