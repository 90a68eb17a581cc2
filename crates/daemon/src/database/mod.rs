mod memory;
mod receipt_queries;
mod sqlite;

use std::ops::Deref;

use async_trait::async_trait;
use sqlx::SqlitePool;

use common::prelude::{Receipt, ReceiptId};

pub use memory::MemoryReceiptStore;

/// Keyed persistence for receipt tracking records.
///
/// The intake service inserts records and reads them back; status
///  transitions after `pending` happen elsewhere.
#[async_trait]
pub trait ReceiptStore: Send + Sync + std::fmt::Debug {
    /// Insert a new record. Fails with [`ReceiptStoreError::Conflict`]
    ///  if the id is already taken.
    async fn insert(&self, receipt: &Receipt) -> Result<(), ReceiptStoreError>;

    /// Point lookup by primary key.
    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, ReceiptStoreError>;

    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> Result<(), ReceiptStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptStoreError {
    #[error("receipt {0} already exists")]
    Conflict(ReceiptId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed record {0}: {1}")]
    Malformed(String, String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// SQLite-backed document store.
#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),
}
