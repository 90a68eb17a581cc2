use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use common::prelude::ReceiptJob;

use super::{JobPublisher, PublishError};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

// refresh tokens a little before the metadata server says they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// How requests to the Pub/Sub API are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubAuth {
    /// No credentials, for the local emulator
    None,
    /// A fixed bearer token
    Token(String),
    /// Tokens fetched from the GCE metadata server
    MetadataServer,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Publishes jobs through the Pub/Sub REST API (`topics.publish`).
#[derive(Debug, Clone)]
pub struct PubSubPublisher {
    client: Client,
    publish_url: Url,
    auth: PubSubAuth,
    token: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    messages: Vec<PubsubMessage<'a>>,
}

#[derive(Serialize)]
struct PubsubMessage<'a> {
    data: String,
    attributes: MessageAttributes<'a>,
}

#[derive(Serialize)]
struct MessageAttributes<'a> {
    receipt_id: String,
    blob_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl PubSubPublisher {
    pub fn new(
        endpoint: &Url,
        project: &str,
        topic: &str,
        auth: PubSubAuth,
    ) -> Result<Self, PublishError> {
        let publish_url = Url::parse(&format!(
            "{}/v1/projects/{}/topics/{}:publish",
            endpoint.as_str().trim_end_matches('/'),
            project,
            topic
        ))
        .map_err(|e| PublishError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client: Client::builder().build()?,
            publish_url,
            auth,
            token: Arc::new(Mutex::new(None)),
        })
    }

    pub fn publish_url(&self) -> &Url {
        &self.publish_url
    }

    async fn bearer_token(&self) -> Result<Option<String>, PublishError> {
        match &self.auth {
            PubSubAuth::None => Ok(None),
            PubSubAuth::Token(token) => Ok(Some(token.clone())),
            PubSubAuth::MetadataServer => {
                let mut cached = self.token.lock().await;
                if let Some(token) = cached.as_ref() {
                    if Instant::now() < token.expires_at {
                        return Ok(Some(token.token.clone()));
                    }
                }

                tracing::debug!("fetching access token from metadata server");
                let response = self
                    .client
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| PublishError::Auth(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(PublishError::Auth(format!(
                        "metadata server returned {}",
                        response.status()
                    )));
                }
                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| PublishError::Auth(e.to_string()))?;

                let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
                *cached = Some(CachedToken {
                    token: token.access_token.clone(),
                    expires_at: Instant::now() + lifetime,
                });
                Ok(Some(token.access_token))
            }
        }
    }
}

#[async_trait]
impl JobPublisher for PubSubPublisher {
    async fn publish(&self, job: &ReceiptJob) -> Result<String, PublishError> {
        let data = base64::engine::general_purpose::STANDARD.encode(job.to_bytes()?);
        let body = PublishRequest {
            messages: vec![PubsubMessage {
                data,
                attributes: MessageAttributes {
                    receipt_id: job.receipt_id.to_string(),
                    blob_name: &job.blob_name,
                },
            }],
        };

        let mut request = self.client.post(self.publish_url.clone()).json(&body);
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status, response.text().await?));
        }

        let response: PublishResponse = response.json().await?;
        response
            .message_ids
            .into_iter()
            .next()
            .ok_or(PublishError::MissingMessageId)
    }
}
