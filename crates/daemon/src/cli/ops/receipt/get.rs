use kvitta_daemon::http_server::api::client::ApiError;
use kvitta_daemon::http_server::api::receipts::GetReceiptRequest;

#[derive(Debug, thiserror::Error)]
pub enum ReceiptGetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to render receipt: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for GetReceiptRequest {
    type Error = ReceiptGetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let receipt = client.call(self.clone()).await?;
        Ok(serde_json::to_string_pretty(&receipt)?)
    }
}
