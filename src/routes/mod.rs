// Route exports
pub mod users;

use actix_web::web;

pub use users::{AppState, PAGINATION_HEADER};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(users::configure),
    );
}
