pub mod employee;

use crate::errors::AppError;
use actix_web::web;

/// Registers the employee routes. Fixed paths come before `{employee_id}`
/// so they are never captured as identifiers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into()),
    )
    .service(
        web::resource("/employees")
            .route(web::post().to(employee::create_employee))
            .route(web::get().to(employee::list_employees)),
    )
    .service(
        web::resource("/employees/avg-salary")
            .route(web::get().to(employee::average_salary_by_department)),
    )
    .service(
        web::resource("/employees/search").route(web::get().to(employee::search_by_skill)),
    )
    .service(
        web::resource("/employees/{employee_id}")
            .route(web::get().to(employee::get_employee))
            .route(web::put().to(employee::update_employee))
            .route(web::delete().to(employee::delete_employee)),
    );
}
