use crate::models::{ComplaintGroup, PnrRecord};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{bson::doc, options::ReplaceOptions, Client as MongoClient, Collection, Database};
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

const PNR_COLLECTION: &str = "pnrs";
const COMPLAINT_COLLECTION: &str = "complaints";

/// Persistence for PNR records and the administrative complaints collection.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `record`, replacing whatever is stored under the same PNR.
    async fn put_pnr(&self, record: &PnrRecord) -> Result<(), AppError>;

    async fn get_pnr(&self, pnr: &str) -> Result<Option<PnrRecord>, AppError>;

    /// Set only the `status` field. Returns false when no record matched.
    async fn update_pnr_status(&self, pnr: &str, status: &str) -> Result<bool, AppError>;

    /// Every document of the administrative collection, in storage order.
    async fn list_complaint_groups(&self) -> Result<Vec<ComplaintGroup>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub fn pnrs(&self) -> Collection<PnrRecord> {
        self.db.collection(PNR_COLLECTION)
    }

    pub fn complaints(&self) -> Collection<ComplaintGroup> {
        self.db.collection(COMPLAINT_COLLECTION)
    }
}

#[async_trait]
impl RecordStore for MongoDb {
    async fn put_pnr(&self, record: &PnrRecord) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.pnrs()
            .replace_one(doc! { "_id": record.pnr.as_str() }, record, options)
            .await
            .map_err(|e| {
                tracing::error!(pnr = %record.pnr, "Failed to store PNR record: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn get_pnr(&self, pnr: &str) -> Result<Option<PnrRecord>, AppError> {
        self.pnrs()
            .find_one(doc! { "_id": pnr }, None)
            .await
            .map_err(AppError::from)
    }

    async fn update_pnr_status(&self, pnr: &str, status: &str) -> Result<bool, AppError> {
        let result = self
            .pnrs()
            .update_one(
                doc! { "_id": pnr },
                doc! { "$set": { "status": status } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(result.matched_count > 0)
    }

    async fn list_complaint_groups(&self) -> Result<Vec<ComplaintGroup>, AppError> {
        let mut cursor = self
            .complaints()
            .find(None, None)
            .await
            .map_err(AppError::from)?;

        let mut groups = Vec::new();
        while let Some(group) = cursor.try_next().await.map_err(AppError::from)? {
            groups.push(group);
        }
        Ok(groups)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

/// Process-local store, for running without MongoDB.
#[derive(Default)]
pub struct InMemoryStore {
    pnrs: RwLock<HashMap<String, PnrRecord>>,
    complaint_groups: RwLock<Vec<ComplaintGroup>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document to the administrative complaints collection.
    pub async fn insert_complaint_group(&self, group: ComplaintGroup) {
        self.complaint_groups.write().await.push(group);
    }

    pub async fn pnr_count(&self) -> usize {
        self.pnrs.read().await.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn put_pnr(&self, record: &PnrRecord) -> Result<(), AppError> {
        self.pnrs
            .write()
            .await
            .insert(record.pnr.clone(), record.clone());
        Ok(())
    }

    async fn get_pnr(&self, pnr: &str) -> Result<Option<PnrRecord>, AppError> {
        Ok(self.pnrs.read().await.get(pnr).cloned())
    }

    async fn update_pnr_status(&self, pnr: &str, status: &str) -> Result<bool, AppError> {
        match self.pnrs.write().await.get_mut(pnr) {
            Some(record) => {
                record.status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_complaint_groups(&self) -> Result<Vec<ComplaintGroup>, AppError> {
        Ok(self.complaint_groups.read().await.clone())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
