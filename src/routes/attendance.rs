use actix_web::web;

use crate::handlers::attendance;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("/today", web::get().to(attendance::today))
            .route("/check-in", web::post().to(attendance::check_in))
            .route("/check-out", web::post().to(attendance::check_out))
            .route("/me", web::get().to(attendance::list_mine)),
    );
}
