use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use time::OffsetDateTime;

use common::prelude::{Receipt, ReceiptId, ReceiptStatus};

use super::{Database, ReceiptStore, ReceiptStoreError};

#[async_trait]
impl ReceiptStore for Database {
    async fn insert(&self, receipt: &Receipt) -> Result<(), ReceiptStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO receipts (id, status, blob_name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(receipt.id.to_string())
        .bind(receipt.status.as_str())
        .bind(&receipt.blob_name)
        .bind(receipt.created_at)
        .execute(&**self)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ReceiptStoreError::Conflict(receipt.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, ReceiptStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, blob_name, created_at
            FROM receipts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&**self)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_id: String = row.try_get("id")?;
        let id = raw_id
            .parse::<ReceiptId>()
            .map_err(|e| ReceiptStoreError::Malformed(raw_id.clone(), e.to_string()))?;
        let status: String = row.try_get("status")?;
        let created_at: OffsetDateTime = row.try_get("created_at")?;

        Ok(Some(Receipt {
            id,
            status: ReceiptStatus::from_str(&status).unwrap_or_else(|never| match never {}),
            blob_name: row.try_get("blob_name")?,
            created_at,
        }))
    }

    async fn ping(&self) -> Result<(), ReceiptStoreError> {
        sqlx::query("SELECT 1 as id;").fetch_one(&**self).await?;
        Ok(())
    }
}
