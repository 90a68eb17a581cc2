use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        let mut lines = vec![format!("Service ({}):", base)];
        let mut healthy = true;

        for probe in ["livez", "readyz"] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), probe);
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    lines.push(format!("  {:<7} OK", format!("{}:", probe)));
                }
                Ok(resp) => {
                    healthy = false;
                    lines.push(format!("  {:<7} UNHEALTHY ({})", format!("{}:", probe), resp.status()));
                }
                Err(_) => {
                    healthy = false;
                    lines.push(format!("  {:<7} NOT REACHABLE", format!("{}:", probe)));
                }
            }
        }

        if !healthy {
            return Err(HealthError::Failed(lines.join("\n")));
        }
        Ok(lines.join("\n"))
    }
}
