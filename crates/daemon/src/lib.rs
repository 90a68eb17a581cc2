// Service modules
pub mod blobs;
pub mod database;
pub mod http_server;
pub mod process;
pub mod queue;
pub mod service_config;
pub mod service_state;

// Re-exports for consumers (the CLI, integration tests)
pub use blobs::{BlobStore, BlobStoreConfig, ObjectBlobStore};
pub use database::{Database, MemoryReceiptStore, ReceiptStore};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use queue::{JobPublisher, MemoryPublisher};
pub use service_config::{Config as ServiceConfig, ConfigArgs};
pub use service_state::State as ServiceState;
