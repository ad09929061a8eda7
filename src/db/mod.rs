//! Store gateway: owns the connection lifecycle and hands out the
//! `employees` collection behind the [`EmployeeStore`] seam.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::errors::AppError;
use async_trait::async_trait;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, IndexModel};
use std::sync::Arc;

/// Field the store generates for its own addressing.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// A filtered read against the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    pub sort: Option<Document>,
    pub skip: i64,
    /// `0` means no cap; a negative value caps at its magnitude.
    pub limit: i64,
}

/// Collection-level calls the employee operations are written against.
///
/// Documents come back raw, `_id` included; callers strip it.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find_one(&self, employee_id: &str) -> Result<Option<Document>, AppError>;

    /// Fails with `Conflict` when the unique index on `employee_id` rejects the write.
    async fn insert_one(&self, record: Document) -> Result<(), AppError>;

    /// Applies `changes` as a `$set`; returns the matched count.
    async fn update_one(&self, employee_id: &str, changes: Document) -> Result<u64, AppError>;

    /// Returns the deleted count.
    async fn delete_one(&self, employee_id: &str) -> Result<u64, AppError>;

    async fn find(&self, query: FindQuery) -> Result<Vec<Document>, AppError>;

    /// One `{ "_id": <department>, "avg_salary": <double> }` document per department,
    /// with text salaries converted to doubles before averaging.
    async fn average_salary_by_department(&self) -> Result<Vec<Document>, AppError>;
}

pub(crate) fn skip_to_u64(skip: i64) -> Result<u64, AppError> {
    u64::try_from(skip)
        .map_err(|_| AppError::StoreFailure(format!("skip must be non-negative, got {}", skip)))
}

pub struct Gateway {
    config: StoreConfig,
    client: Option<Client>,
    store: Option<Arc<dyn EmployeeStore>>,
}

impl Gateway {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: None,
            store: None,
        }
    }

    /// Opens a fresh handle and makes sure `employee_id` is uniquely indexed.
    /// Calling it again replaces the previous handle.
    pub async fn connect(&mut self) -> Result<(), AppError> {
        match self.config.backend {
            StoreBackend::Memory => {
                self.client = None;
                self.store = Some(Arc::new(MemoryStore::new()));
                info!("Using in-memory employee store");
            }
            StoreBackend::Mongo => {
                let client = Client::with_uri_str(&self.config.mongo_url).await?;
                let collection = client
                    .database(&self.config.db_name)
                    .collection::<Document>(&self.config.collection);

                let index = IndexModel::builder()
                    .keys(doc! { "employee_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build();
                collection.create_index(index).await?;
                info!(
                    "Connected to MongoDB database '{}', unique index on {}.employee_id ensured",
                    self.config.db_name, self.config.collection
                );

                self.client = Some(client);
                self.store = Some(Arc::new(MongoStore::new(collection)));
            }
        }
        Ok(())
    }

    /// Releases the connection. No-op when nothing is open.
    pub async fn disconnect(&mut self) {
        self.store = None;
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            info!("MongoDB connection closed");
        }
    }

    pub fn employees(&self) -> Result<Arc<dyn EmployeeStore>, AppError> {
        self.store
            .clone()
            .ok_or_else(|| AppError::StoreFailure("store gateway is not connected".to_string()))
    }
}
