use clap::Args;

use kvitta_daemon::service_config::ConfigError;
use kvitta_daemon::{spawn_service, ConfigArgs};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.config.clone().resolve()?;

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
