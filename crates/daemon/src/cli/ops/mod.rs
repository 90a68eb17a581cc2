pub mod daemon;
pub mod health;
pub mod receipt;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use receipt::Receipt;
pub use version::Version;
