use std::path::PathBuf;

use clap::Args;

use kvitta_daemon::http_server::api::client::ApiError;
use kvitta_daemon::http_server::api::receipts::UploadRequest;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Image to upload
    #[arg(long)]
    pub file: PathBuf,

    /// Content type to declare (guessed from the extension if omitted)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptUploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("cannot guess a content type for {0}, pass --content-type")]
    UnknownContentType(PathBuf),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = ReceiptUploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let content_type = match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => mime_guess::from_path(&self.file)
                .first()
                .map(|m| m.essence_str().to_string())
                .ok_or_else(|| ReceiptUploadError::UnknownContentType(self.file.clone()))?,
        };

        let data = tokio::fs::read(&self.file)
            .await
            .map_err(|e| ReceiptUploadError::Read(self.file.clone(), e))?;

        let file_name = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "receipt".to_string());

        let request = UploadRequest {
            file_name,
            content_type,
            data,
        };

        let mut client = ctx.client.clone();
        let response = client.call(request).await?;
        Ok(format!(
            "receipt_id: {}\nstatus:     {}",
            response.receipt_id, response.status
        ))
    }
}
