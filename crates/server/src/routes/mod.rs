pub mod catalog;
pub mod categories;
pub mod search;
pub mod system;

use actix_web::web;

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(search::search)
        .service(system::health)
        .service(categories::quick_categories)
        .service(catalog::catalog_stats)
        .service(catalog::catalog_reload);
}
