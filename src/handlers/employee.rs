use actix_web::{web, HttpResponse};
use serde::Deserialize;
use crate::db::EmployeeStore;
use crate::errors::AppError;
use crate::models::employee::{Employee, EmployeeUpdate};
use crate::services::employee as operations;
use crate::services::employee::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT};
use crate::utils::validation::validate_payload;

#[derive(Deserialize)]
pub struct ListQueryParams {
    department: Option<String>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SearchQueryParams {
    skill: String,
    limit: Option<i64>,
    skip: Option<i64>,
}

pub async fn create_employee(
    store: web::Data<dyn EmployeeStore>,
    new_employee: web::Json<Employee>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*new_employee)?;

    let created = operations::create_employee(store.get_ref(), new_employee.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn get_employee(
    store: web::Data<dyn EmployeeStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee = operations::get_employee(store.get_ref(), &employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee(
    store: web::Data<dyn EmployeeStore>,
    employee_id: web::Path<String>,
    updates: web::Json<EmployeeUpdate>,
) -> Result<HttpResponse, AppError> {
    let employee = operations::update_employee(store.get_ref(), &employee_id, &updates).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee(
    store: web::Data<dyn EmployeeStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let confirmation = operations::delete_employee(store.get_ref(), &employee_id).await?;
    Ok(HttpResponse::Ok().json(confirmation))
}

pub async fn list_employees(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<ListQueryParams>,
) -> Result<HttpResponse, AppError> {
    let employees = operations::list_employees(
        store.get_ref(),
        query.department.as_deref(),
        query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
    )
    .await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn average_salary_by_department(
    store: web::Data<dyn EmployeeStore>,
) -> Result<HttpResponse, AppError> {
    let averages = operations::average_salary_by_department(store.get_ref()).await?;
    Ok(HttpResponse::Ok().json(averages))
}

pub async fn search_by_skill(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<SearchQueryParams>,
) -> Result<HttpResponse, AppError> {
    let employees = operations::search_by_skill(
        store.get_ref(),
        &query.skill,
        query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        query.skip.unwrap_or(0),
    )
    .await?;
    Ok(HttpResponse::Ok().json(employees))
}
