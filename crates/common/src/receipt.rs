use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use time::OffsetDateTime;
use uuid::Uuid;

/// Largest receipt image accepted for intake (5 MiB)
pub const MAX_RECEIPT_SIZE_BYTES: usize = 5 * 1024 * 1024;

// Every stored object carries this suffix regardless of the uploaded
//  format. Workers key off the name, the real format lives in the
//  object's content type.
const BLOB_SUFFIX: &str = "png";

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Identifier of a receipt, doubles as the tracking record's primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(Uuid);

impl ReceiptId {
    /// Generate a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Name of the object holding this receipt's image in the blob store.
    pub fn blob_name(&self) -> String {
        format!("{}.{}", self.0, BLOB_SUFFIX)
    }
}

impl From<Uuid> for ReceiptId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReceiptId {
    type Err = ReceiptIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid receipt id: {0}")]
pub struct ReceiptIdError(#[from] uuid::Error);

/// Processing status of a receipt.
///
/// Only `Pending` is ever written by the intake service. Every other
///  state belongs to the downstream worker; values we don't know about
///  are carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum ReceiptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Processing => "processing",
            ReceiptStatus::Completed => "completed",
            ReceiptStatus::Failed => "failed",
            ReceiptStatus::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => ReceiptStatus::Pending,
            "processing" => ReceiptStatus::Processing,
            "completed" => ReceiptStatus::Completed,
            "failed" => ReceiptStatus::Failed,
            other => ReceiptStatus::Other(other.to_string()),
        })
    }
}

/// Image formats accepted for intake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Match a declared content type against the allow-list.
    ///
    /// Comparison is case-insensitive and ignores parameters, so
    ///  `image/PNG; foo=bar` is a png. `image/jpg` is accepted as an
    ///  alias for `image/jpeg`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime: mime::Mime = content_type.trim().parse().ok()?;
        if !mime.type_().as_str().eq_ignore_ascii_case("image") {
            return None;
        }

        match mime.subtype().as_str().to_ascii_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpeg" | "jpg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    /// Canonical content type for this format
    pub fn mime(&self) -> mime::Mime {
        match self {
            ImageKind::Png => mime::IMAGE_PNG,
            ImageKind::Jpeg => mime::IMAGE_JPEG,
        }
    }

    /// Whether `data` starts with this format's magic bytes.
    pub fn matches_signature(&self, data: &[u8]) -> bool {
        match self {
            ImageKind::Png => data.starts_with(PNG_SIGNATURE),
            ImageKind::Jpeg => data.starts_with(JPEG_SIGNATURE),
        }
    }
}

/// Tracking record for an uploaded receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub status: ReceiptStatus,
    pub blob_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Receipt {
    /// A freshly uploaded receipt awaiting processing.
    pub fn pending(id: ReceiptId, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            status: ReceiptStatus::Pending,
            blob_name: id.blob_name(),
            created_at,
        }
    }
}

/// Job descriptor published for the downstream worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptJob {
    pub receipt_id: ReceiptId,
    pub blob_name: String,
}

impl ReceiptJob {
    /// UTF-8 JSON encoding placed on the queue.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl From<&Receipt> for ReceiptJob {
    fn from(receipt: &Receipt) -> Self {
        Self {
            receipt_id: receipt.id,
            blob_name: receipt.blob_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_name_uses_fixed_suffix() {
        let id = ReceiptId::generate();
        assert_eq!(id.blob_name(), format!("{}.png", id));
    }

    #[test]
    fn test_receipt_id_parse() {
        let id = ReceiptId::generate();
        let parsed: ReceiptId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        assert!("does-not-exist".parse::<ReceiptId>().is_err());
    }

    #[test]
    fn test_content_type_allow_list() {
        assert_eq!(ImageKind::from_content_type("image/png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_content_type("image/jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_content_type("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_content_type("IMAGE/PNG"), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::from_content_type("image/jpeg; charset=binary"),
            Some(ImageKind::Jpeg)
        );

        assert_eq!(ImageKind::from_content_type("application/pdf"), None);
        assert_eq!(ImageKind::from_content_type("image/gif"), None);
        assert_eq!(ImageKind::from_content_type("text/png"), None);
        assert_eq!(ImageKind::from_content_type(""), None);
    }

    #[test]
    fn test_signature_detection() {
        assert!(ImageKind::Png.matches_signature(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(!ImageKind::Png.matches_signature(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(ImageKind::Jpeg.matches_signature(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!ImageKind::Jpeg.matches_signature(b"0123456789"));
    }

    #[test]
    fn test_status_preserves_unknown_values() {
        let status: ReceiptStatus = "needs_review".parse().unwrap();
        assert_eq!(status, ReceiptStatus::Other("needs_review".into()));
        assert_eq!(status.as_str(), "needs_review");

        let json = serde_json::to_string(&ReceiptStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }

    #[test]
    fn test_receipt_serializes_flat() {
        let id = ReceiptId::generate();
        let receipt = Receipt::pending(id, OffsetDateTime::UNIX_EPOCH);
        let value = serde_json::to_value(&receipt).unwrap();

        assert_eq!(value["id"], id.to_string());
        assert_eq!(value["status"], "pending");
        assert_eq!(value["blob_name"], format!("{}.png", id));
        assert_eq!(value["created_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_job_message_shape() {
        let id = ReceiptId::generate();
        let receipt = Receipt::pending(id, OffsetDateTime::UNIX_EPOCH);
        let job = ReceiptJob::from(&receipt);

        let value: serde_json::Value = serde_json::from_slice(&job.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "receipt_id": id.to_string(),
                "blob_name": format!("{}.png", id),
            })
        );
    }
}
