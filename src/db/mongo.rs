use super::{skip_to_u64, EmployeeStore, FindQuery};
use crate::errors::AppError;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl EmployeeStore for MongoStore {
    async fn find_one(&self, employee_id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .collection
            .find_one(doc! { "employee_id": employee_id })
            .await?)
    }

    async fn insert_one(&self, record: Document) -> Result<(), AppError> {
        self.collection.insert_one(record).await?;
        Ok(())
    }

    async fn update_one(&self, employee_id: &str, changes: Document) -> Result<u64, AppError> {
        let result = self
            .collection
            .update_one(doc! { "employee_id": employee_id }, doc! { "$set": changes })
            .await?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, employee_id: &str) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "employee_id": employee_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<Document>, AppError> {
        let mut find = self
            .collection
            .find(query.filter)
            .skip(skip_to_u64(query.skip)?)
            .limit(query.limit);
        if let Some(sort) = query.sort {
            find = find.sort(sort);
        }
        let cursor = find.await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn average_salary_by_department(&self) -> Result<Vec<Document>, AppError> {
        let pipeline = vec![
            doc! {
                "$project": {
                    "department": 1,
                    "salary": {
                        "$cond": [
                            { "$isNumber": "$salary" },
                            "$salary",
                            { "$toDouble": "$salary" }
                        ]
                    }
                }
            },
            doc! {
                "$group": {
                    "_id": "$department",
                    "avg_salary": { "$avg": "$salary" }
                }
            },
        ];
        let cursor = self.collection.aggregate(pipeline).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }
}
