use clap::{Args, Subcommand};

pub mod get;
pub mod upload;

use crate::cli::op::Op;
use kvitta_daemon::http_server::api::receipts::GetReceiptRequest;

crate::command_enum! {
    (Upload, upload::Upload),
    (Get, GetReceiptRequest),
}

// Rename the generated Command to ReceiptCommand for clarity
pub type ReceiptCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Receipt {
    #[command(subcommand)]
    pub command: ReceiptCommand,
}

#[async_trait::async_trait]
impl Op for Receipt {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
