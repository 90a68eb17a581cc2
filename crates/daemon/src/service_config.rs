use std::net::SocketAddr;
use std::path::PathBuf;

use clap::ValueEnum;
use url::Url;

use crate::blobs::BlobStoreConfig;
use crate::queue::{PubSubAuth, QueueConfig};

/// Resolved configuration for the intake service.
#[derive(Debug, Clone)]
pub struct Config {
    /// address for the HTTP server to listen on
    pub listen_addr: SocketAddr,

    /// where receipt images are written
    pub blob_store: BlobStoreConfig,

    /// connection string for the tracking record store
    pub document_store_url: Url,

    /// where processing jobs are published
    pub queue: QueueConfig,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlobBackend {
    Gcs,
    S3,
    Local,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueBackend {
    Pubsub,
    Memory,
}

/// Service configuration as given on the command line or in the environment.
///
/// The bucket, topic, project and document store are always required so a
///  misconfigured deployment refuses to start instead of failing on its
///  first upload.
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Address for the HTTP server to listen on
    #[arg(long, env = "KVITTA_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Bucket receipt images are written to
    #[arg(long, env = "GCS_BUCKET", value_parser = non_empty)]
    pub gcs_bucket: String,

    /// Topic processing jobs are published to
    #[arg(long, env = "PUBSUB_TOPIC", value_parser = non_empty)]
    pub pubsub_topic: String,

    /// Project owning the topic
    #[arg(long, env = "GCP_PROJECT", value_parser = non_empty)]
    pub gcp_project: String,

    /// Document store connection string (e.g. sqlite:///var/lib/kvitta/receipts.db)
    #[arg(long, env = "DOCUMENT_STORE_URL")]
    pub document_store_url: Url,

    /// Blob storage backend
    #[arg(long, env = "BLOB_BACKEND", value_enum, default_value_t = BlobBackend::Gcs)]
    pub blob_backend: BlobBackend,

    /// Root directory for the local blob backend
    #[arg(long, env = "BLOB_ROOT")]
    pub blob_root: Option<PathBuf>,

    /// Job queue backend
    #[arg(long, env = "QUEUE_BACKEND", value_enum, default_value_t = QueueBackend::Pubsub)]
    pub queue_backend: QueueBackend,

    /// Pub/Sub API endpoint
    #[arg(long, env = "PUBSUB_ENDPOINT", default_value = "https://pubsub.googleapis.com")]
    pub pubsub_endpoint: Url,

    /// host:port of a Pub/Sub emulator, overrides the endpoint and disables auth
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pub pubsub_emulator_host: Option<String>,

    /// Bearer token for Pub/Sub, the metadata server is used when unset
    #[arg(long, env = "PUBSUB_ACCESS_TOKEN", hide_env_values = true)]
    pub pubsub_access_token: Option<String>,

    /// Log level
    #[arg(long, env = "KVITTA_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long, env = "KVITTA_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let bucket = self.gcs_bucket;
        let blob_store = match self.blob_backend {
            BlobBackend::Gcs => BlobStoreConfig::Gcs { bucket },
            BlobBackend::S3 => BlobStoreConfig::S3 { bucket },
            BlobBackend::Local => BlobStoreConfig::Local {
                root: self.blob_root.ok_or(ConfigError::MissingBlobRoot)?,
                bucket,
            },
            BlobBackend::Memory => BlobStoreConfig::Memory,
        };

        let queue = match self.queue_backend {
            QueueBackend::Pubsub => {
                let (endpoint, auth) = match self.pubsub_emulator_host {
                    Some(host) => {
                        let endpoint = Url::parse(&format!("http://{}", host))
                            .map_err(|_| ConfigError::InvalidEmulatorHost(host))?;
                        (endpoint, PubSubAuth::None)
                    }
                    None => {
                        let auth = match self.pubsub_access_token {
                            Some(token) => PubSubAuth::Token(token),
                            None => PubSubAuth::MetadataServer,
                        };
                        (self.pubsub_endpoint, auth)
                    }
                };
                QueueConfig::PubSub {
                    project: self.gcp_project,
                    topic: self.pubsub_topic,
                    endpoint,
                    auth,
                }
            }
            QueueBackend::Memory => QueueConfig::Memory,
        };

        Ok(Config {
            listen_addr: self.listen_addr,
            blob_store,
            document_store_url: self.document_store_url,
            queue,
            log_level: self.log_level,
            log_dir: self.log_dir,
        })
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("value must not be empty".to_string());
    }
    Ok(value.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--blob-root (BLOB_ROOT) is required for the local blob backend")]
    MissingBlobRoot,
    #[error("invalid Pub/Sub emulator host: {0}")]
    InvalidEmulatorHost(String),
}
