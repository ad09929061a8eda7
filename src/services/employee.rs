//! Employee operations against the store seam.
//!
//! The unique index on `employee_id` is what actually guards against
//! duplicates; the lookup in [`create_employee`] only gives the common
//! case a clean error before the insert is attempted.

use crate::db::{EmployeeStore, FindQuery, INTERNAL_ID_FIELD};
use crate::errors::AppError;
use crate::models::employee::{DeleteConfirmation, DepartmentSalary, Employee, EmployeeUpdate};
use log::{debug, warn};
use mongodb::bson::{self, doc, Bson, Document};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const DEFAULT_SEARCH_LIMIT: i64 = 3;

fn not_found(employee_id: &str) -> AppError {
    debug!("employee {} not found", employee_id);
    AppError::NotFound("Employee not found".to_string())
}

/// Drops the store's `_id` and decodes the public record.
fn clean_document(mut document: Document) -> Result<Employee, AppError> {
    document.remove(INTERNAL_ID_FIELD);
    Ok(bson::from_document(document)?)
}

fn clean_documents(documents: Vec<Document>) -> Result<Vec<Employee>, AppError> {
    documents.into_iter().map(clean_document).collect()
}

pub async fn create_employee(
    store: &dyn EmployeeStore,
    employee: Employee,
) -> Result<Employee, AppError> {
    if store.find_one(&employee.employee_id).await?.is_some() {
        debug!("rejecting duplicate employee_id {}", employee.employee_id);
        return Err(AppError::Conflict("employee_id must be unique".to_string()));
    }

    store.insert_one(bson::to_document(&employee)?).await?;
    Ok(employee)
}

pub async fn get_employee(store: &dyn EmployeeStore, employee_id: &str) -> Result<Employee, AppError> {
    let document = store.find_one(employee_id).await?.ok_or_else(|| not_found(employee_id))?;
    clean_document(document)
}

pub async fn update_employee(
    store: &dyn EmployeeStore,
    employee_id: &str,
    changes: &EmployeeUpdate,
) -> Result<Employee, AppError> {
    let set = bson::to_document(changes)?;
    if set.is_empty() {
        return Err(AppError::InvalidRequest(
            "Provide at least one field to update".to_string(),
        ));
    }

    if store.update_one(employee_id, set).await? == 0 {
        return Err(not_found(employee_id));
    }

    // A concurrent delete can land between the update and this read.
    let document = store.find_one(employee_id).await?.ok_or_else(|| not_found(employee_id))?;
    clean_document(document)
}

pub async fn delete_employee(
    store: &dyn EmployeeStore,
    employee_id: &str,
) -> Result<DeleteConfirmation, AppError> {
    if store.delete_one(employee_id).await? == 0 {
        return Err(not_found(employee_id));
    }
    Ok(DeleteConfirmation::deleted(employee_id))
}

/// Newest joiners first. An empty department means no filter.
pub async fn list_employees(
    store: &dyn EmployeeStore,
    department: Option<&str>,
    limit: i64,
) -> Result<Vec<Employee>, AppError> {
    let mut filter = Document::new();
    if let Some(department) = department.filter(|d| !d.is_empty()) {
        filter.insert("department", department);
    }

    let documents = store
        .find(FindQuery {
            filter,
            sort: Some(doc! { "joining_date": -1 }),
            skip: 0,
            limit,
        })
        .await?;
    clean_documents(documents)
}

pub async fn average_salary_by_department(
    store: &dyn EmployeeStore,
) -> Result<Vec<DepartmentSalary>, AppError> {
    let groups = store.average_salary_by_department().await?;

    let mut averages = Vec::with_capacity(groups.len());
    for group in groups {
        let department = match group.get(INTERNAL_ID_FIELD) {
            Some(Bson::String(name)) => name.clone(),
            other => {
                warn!("skipping salary group with non-text department {:?}", other);
                continue;
            }
        };
        let avg_salary = match group.get("avg_salary") {
            Some(Bson::Double(value)) => *value,
            Some(Bson::Int32(value)) => f64::from(*value),
            Some(Bson::Int64(value)) => *value as f64,
            other => {
                warn!("skipping department {} without a salary average ({:?})", department, other);
                continue;
            }
        };
        averages.push(DepartmentSalary {
            department,
            avg_salary: round_to_cents(avg_salary),
        });
    }
    Ok(averages)
}

/// Rounds to two decimals on the exact binary value, ties to even.
fn round_to_cents(value: f64) -> f64 {
    // A third-decimal tie is an odd multiple of 1/8; scaling those by 100 is exact.
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return (value * 100.0).round_ties_even() / 100.0;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Exact, case-sensitive element match on `skills`. No sort is applied, so
/// which matches land in a given page follows the store's natural order.
pub async fn search_by_skill(
    store: &dyn EmployeeStore,
    skill: &str,
    limit: i64,
    skip: i64,
) -> Result<Vec<Employee>, AppError> {
    let documents = store
        .find(FindQuery {
            filter: doc! { "skills": skill },
            sort: None,
            skip,
            limit,
        })
        .await?;
    clean_documents(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn employee(id: &str, department: &str, salary: i64, joining_date: &str, skills: &[&str]) -> Employee {
        Employee {
            employee_id: id.to_string(),
            name: format!("Employee {}", id),
            department: department.to_string(),
            salary,
            joining_date: joining_date.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn ids(employees: &[Employee]) -> Vec<&str> {
        employees.iter().map(|e| e.employee_id.as_str()).collect()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryStore::new();
        let created = create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &["Rust"]))
            .await
            .unwrap();
        let loaded = get_employee(&store, "E1").await.unwrap();
        assert_eq!(created, loaded);

        let raw = store.find_one("E1").await.unwrap().unwrap();
        assert!(raw.contains_key(INTERNAL_ID_FIELD));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_keeps_first() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &[])).await.unwrap();

        let err = create_employee(&store, employee("E1", "Ops", 1, "2020-01-01", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let kept = get_employee(&store, "E1").await.unwrap();
        assert_eq!(kept.department, "Eng");
        assert_eq!(list_employees(&store, None, DEFAULT_LIST_LIMIT).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_identifier_is_not_found_everywhere() {
        let store = MemoryStore::new();
        let update = EmployeeUpdate {
            name: Some("X".to_string()),
            ..EmployeeUpdate::default()
        };

        assert!(matches!(get_employee(&store, "nope").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            update_employee(&store, "nope", &update).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete_employee(&store, "nope").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_update_is_invalid_and_changes_nothing() {
        let store = MemoryStore::new();
        let original = create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &["Go"]))
            .await
            .unwrap();

        let err = update_employee(&store, "E1", &EmployeeUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(get_employee(&store, "E1").await.unwrap(), original);
    }

    #[tokio::test]
    async fn empty_update_on_missing_record_is_still_invalid() {
        let store = MemoryStore::new();
        let err = update_employee(&store, "ghost", &EmployeeUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn single_field_update_leaves_the_rest_untouched() {
        let store = MemoryStore::new();
        let original = create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &["Go", "SQL"]))
            .await
            .unwrap();

        let updated = update_employee(
            &store,
            "E1",
            &EmployeeUpdate {
                salary: Some(6500),
                ..EmployeeUpdate::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated, Employee { salary: 6500, ..original });
    }

    #[tokio::test]
    async fn empty_values_are_applied() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &["Go"])).await.unwrap();

        let updated = update_employee(
            &store,
            "E1",
            &EmployeeUpdate {
                skills: Some(Vec::new()),
                ..EmployeeUpdate::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.skills.is_empty());
    }

    #[tokio::test]
    async fn delete_confirms_and_removes() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "Eng", 5000, "2024-01-01", &[])).await.unwrap();

        let confirmation = delete_employee(&store, "E1").await.unwrap();
        assert_eq!(confirmation, DeleteConfirmation::deleted("E1"));
        assert!(matches!(get_employee(&store, "E1").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_by_department_newest_first() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "Eng", 1, "2023-01-01", &[])).await.unwrap();
        create_employee(&store, employee("E2", "Ops", 1, "2025-01-01", &[])).await.unwrap();
        create_employee(&store, employee("E3", "Eng", 1, "2024-06-01", &[])).await.unwrap();

        let eng = list_employees(&store, Some("Eng"), DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(ids(&eng), ["E3", "E1"]);

        let everyone = list_employees(&store, Some(""), DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(ids(&everyone), ["E2", "E3", "E1"]);

        assert!(list_employees(&store, Some("Legal"), DEFAULT_LIST_LIMIT)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            let id = format!("E{}", n);
            let date = format!("2024-0{}-01", n);
            create_employee(&store, employee(&id, "Eng", 1, &date, &[])).await.unwrap();
        }
        let capped = list_employees(&store, Some("Eng"), 2).await.unwrap();
        assert_eq!(ids(&capped), ["E5", "E4"]);
    }

    #[tokio::test]
    async fn average_salary_groups_by_department() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "A", 1000, "2024-01-01", &[])).await.unwrap();
        create_employee(&store, employee("E2", "A", 2000, "2024-01-01", &[])).await.unwrap();
        create_employee(&store, employee("E3", "B", 3000, "2024-01-01", &[])).await.unwrap();

        let mut averages = average_salary_by_department(&store).await.unwrap();
        averages.sort_by(|a, b| a.department.cmp(&b.department));
        assert_eq!(
            averages,
            vec![
                DepartmentSalary { department: "A".to_string(), avg_salary: 1500.0 },
                DepartmentSalary { department: "B".to_string(), avg_salary: 3000.0 },
            ]
        );
    }

    #[tokio::test]
    async fn average_salary_coerces_text_and_rounds() {
        let store = MemoryStore::with_documents(vec![
            doc! { "employee_id": "E1", "department": "A", "salary": "1000" },
            doc! { "employee_id": "E2", "department": "A", "salary": 2000_i64 },
            doc! { "employee_id": "E3", "department": "C", "salary": 1000_i64 },
            doc! { "employee_id": "E4", "department": "C", "salary": 1000_i64 },
            doc! { "employee_id": "E5", "department": "C", "salary": 1001_i64 },
        ]);

        let averages = average_salary_by_department(&store).await.unwrap();
        assert_eq!(averages[0], DepartmentSalary { department: "A".to_string(), avg_salary: 1500.0 });
        assert_eq!(averages[1], DepartmentSalary { department: "C".to_string(), avg_salary: 1000.33 });
    }

    #[tokio::test]
    async fn average_salary_rounds_exact_ties_to_even() {
        let store = MemoryStore::new();
        for n in 1..=8 {
            let salary = if n == 1 { 1001 } else { 1000 };
            create_employee(&store, employee(&format!("E{}", n), "A", salary, "2024-01-01", &[]))
                .await
                .unwrap();
        }

        let averages = average_salary_by_department(&store).await.unwrap();
        assert_eq!(averages, vec![DepartmentSalary { department: "A".to_string(), avg_salary: 1000.12 }]);
    }

    #[test]
    fn cents_rounding_matches_decimal_rounding() {
        assert_eq!(round_to_cents(1000.125), 1000.12);
        assert_eq!(round_to_cents(1000.375), 1000.38);
        assert_eq!(round_to_cents(1000.625), 1000.62);
        assert_eq!(round_to_cents(1001.125), 1001.12);
        assert_eq!(round_to_cents(-2.125), -2.12);
        assert_eq!(round_to_cents(1000.0 + 1.0 / 3.0), 1000.33);
        assert_eq!(round_to_cents(2.675), 2.67);
        assert_eq!(round_to_cents(1500.0), 1500.0);
    }

    #[tokio::test]
    async fn stored_text_salary_reads_back_as_integer() {
        let store = MemoryStore::with_documents(vec![doc! {
            "_id": 1,
            "employee_id": "E1",
            "name": "Ann",
            "department": "A",
            "salary": "1000",
            "joining_date": "2024-01-01",
            "skills": ["Rust"],
        }]);
        let loaded = get_employee(&store, "E1").await.unwrap();
        assert_eq!(loaded.salary, 1000);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_results() {
        let store = MemoryStore::new();
        assert!(list_employees(&store, None, DEFAULT_LIST_LIMIT).await.unwrap().is_empty());
        assert!(average_salary_by_department(&store).await.unwrap().is_empty());
        assert!(search_by_skill(&store, "Rust", DEFAULT_SEARCH_LIMIT, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn search_is_exact_and_case_sensitive() {
        let store = MemoryStore::new();
        create_employee(&store, employee("E1", "Eng", 1, "2024-01-01", &["Python"])).await.unwrap();
        create_employee(&store, employee("E2", "Eng", 1, "2024-01-01", &["python"])).await.unwrap();
        create_employee(&store, employee("E3", "Eng", 1, "2024-01-01", &["Python3"])).await.unwrap();

        let found = search_by_skill(&store, "Python", DEFAULT_SEARCH_LIMIT, 0).await.unwrap();
        assert_eq!(ids(&found), ["E1"]);
    }

    // Pages follow the store's natural order (insertion order here); no sort is applied.
    #[tokio::test]
    async fn search_pages_with_skip_and_limit() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            let id = format!("E{}", n);
            create_employee(&store, employee(&id, "Eng", 1, "2024-01-01", &["Python"])).await.unwrap();
        }

        let first = search_by_skill(&store, "Python", 3, 0).await.unwrap();
        assert_eq!(ids(&first), ["E1", "E2", "E3"]);

        let rest = search_by_skill(&store, "Python", 3, 3).await.unwrap();
        assert_eq!(ids(&rest), ["E4", "E5"]);
    }
}
