use super::{skip_to_u64, EmployeeStore, FindQuery, INTERNAL_ID_FIELD};
use crate::errors::AppError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

/// In-process document store with the collection semantics the operations rely on:
/// top-level equality filters (arrays match when they contain the value),
/// a unique `employee_id`, and natural insertion order when no sort is given.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds raw documents as-is, bypassing the public record shape.
    #[cfg(test)]
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
        }
    }

    fn documents(&self) -> Result<MutexGuard<'_, Vec<Document>>, AppError> {
        self.documents
            .lock()
            .map_err(|_| AppError::StoreFailure("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn find_one(&self, employee_id: &str) -> Result<Option<Document>, AppError> {
        let filter = doc! { "employee_id": employee_id };
        Ok(self
            .documents()?
            .iter()
            .find(|document| matches_filter(document, &filter))
            .cloned())
    }

    async fn insert_one(&self, record: Document) -> Result<(), AppError> {
        let mut documents = self.documents()?;
        let employee_id = record.get("employee_id").cloned().unwrap_or(Bson::Null);
        let taken = documents
            .iter()
            .any(|document| document.get("employee_id").unwrap_or(&Bson::Null) == &employee_id);
        if taken {
            return Err(AppError::Conflict("employee_id must be unique".to_string()));
        }

        let mut stored = Document::new();
        stored.insert(INTERNAL_ID_FIELD, ObjectId::new());
        for (key, value) in record {
            if key != INTERNAL_ID_FIELD {
                stored.insert(key, value);
            }
        }
        documents.push(stored);
        Ok(())
    }

    async fn update_one(&self, employee_id: &str, changes: Document) -> Result<u64, AppError> {
        let filter = doc! { "employee_id": employee_id };
        let mut documents = self.documents()?;
        match documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        {
            Some(document) => {
                for (key, value) in changes {
                    document.insert(key, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, employee_id: &str) -> Result<u64, AppError> {
        let filter = doc! { "employee_id": employee_id };
        let mut documents = self.documents()?;
        match documents
            .iter()
            .position(|document| matches_filter(document, &filter))
        {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<Document>, AppError> {
        let skip = usize::try_from(skip_to_u64(query.skip)?).unwrap_or(usize::MAX);
        let mut matched: Vec<Document> = self
            .documents()?
            .iter()
            .filter(|document| matches_filter(document, &query.filter))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| compare_documents(sort, a, b));
        }

        let matched = matched.into_iter().skip(skip);
        Ok(match query.limit {
            0 => matched.collect(),
            limit => {
                let cap = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
                matched.take(cap).collect()
            }
        })
    }

    async fn average_salary_by_department(&self) -> Result<Vec<Document>, AppError> {
        // (department, sum, counted salaries), in first-seen order
        let mut groups: Vec<(Bson, f64, u64)> = Vec::new();
        for document in self.documents()?.iter() {
            let department = document.get("department").cloned().unwrap_or(Bson::Null);
            let salary = coerce_salary(document.get("salary"))?;

            let index = match groups.iter().position(|(name, _, _)| name == &department) {
                Some(index) => index,
                None => {
                    groups.push((department, 0.0, 0));
                    groups.len() - 1
                }
            };
            if let Some(salary) = salary {
                groups[index].1 += salary;
                groups[index].2 += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|(department, sum, count)| {
                let avg_salary = if count == 0 {
                    Bson::Null
                } else {
                    Bson::Double(sum / count as f64)
                };
                doc! { "_id": department, "avg_salary": avg_salary }
            })
            .collect())
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match document.get(key) {
        Some(Bson::Array(values)) => {
            values.contains(expected) || matches!(expected, Bson::Array(e) if e == values)
        }
        Some(actual) => actual == expected,
        None => matches!(expected, Bson::Null),
    })
}

fn compare_documents(sort: &Document, a: &Document, b: &Document) -> Ordering {
    for (key, direction) in sort {
        let descending = match direction {
            Bson::Int32(d) => *d < 0,
            Bson::Int64(d) => *d < 0,
            Bson::Double(d) => *d < 0.0,
            _ => false,
        };
        let ordering = compare_values(a.get(key), b.get(key));
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    if let (Some(Bson::String(a)), Some(Bson::String(b))) = (a, b) {
        return a.cmp(b);
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn as_number(value: Option<&Bson>) -> Option<f64> {
    match value {
        Some(Bson::Int32(v)) => Some(f64::from(*v)),
        Some(Bson::Int64(v)) => Some(*v as f64),
        Some(Bson::Double(v)) => Some(*v),
        _ => None,
    }
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(_) => 3,
    }
}

// Numbers pass through, text is converted to a double, null is skipped by the average.
fn coerce_salary(value: Option<&Bson>) -> Result<Option<f64>, AppError> {
    match value {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::String(text)) => text.parse::<f64>().map(Some).map_err(|_| {
            AppError::StoreFailure(format!("failed to convert salary '{}' to double", text))
        }),
        number @ Some(_) => as_number(number).map(Some).ok_or_else(|| {
            AppError::StoreFailure("salary is neither numeric nor text".to_string())
        }),
    }
}
