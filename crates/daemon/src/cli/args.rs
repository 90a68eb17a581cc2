pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "kvitta")]
#[command(about = "Receipt intake service and client", version)]
pub struct Args {
    /// Base URL of a running intake service
    #[arg(long, global = true, env = "KVITTA_REMOTE", default_value = "http://localhost:8080")]
    pub remote: Url,

    #[command(subcommand)]
    pub command: crate::Command,
}
