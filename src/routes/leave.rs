use actix_web::web;

use crate::handlers::leave;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/me/leave").route("/summary", web::get().to(leave::my_summary)));
}
