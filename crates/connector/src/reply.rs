use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::activity::Activity;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("reply delivery transport failure: {0}")]
    Transport(String),
    #[error("reply delivery rejected with status {0}")]
    Status(u16),
}

/// Delivers a reply activity back to the originating channel via the service
/// callback address on the activity itself.
#[async_trait]
pub trait ReplyDelivery: Send + Sync {
    async fn deliver(&self, reply: &Activity) -> Result<(), DeliveryError>;
}

pub struct HttpReplyDelivery {
    client: reqwest::Client,
    bearer_token: Option<SecretString>,
}

impl HttpReplyDelivery {
    pub fn new(timeout: Duration, bearer_token: Option<SecretString>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        Ok(Self { client, bearer_token })
    }
}

#[async_trait]
impl ReplyDelivery for HttpReplyDelivery {
    async fn deliver(&self, reply: &Activity) -> Result<(), DeliveryError> {
        let url = reply_url(&reply.service_url, &reply.conversation.id);

        let mut request = self.client.post(&url).json(reply);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        Ok(())
    }
}

fn reply_url(service_url: &str, conversation_id: &str) -> String {
    format!("{}/v3/conversations/{conversation_id}/activities", service_url.trim_end_matches('/'))
}

/// Test double that records replies instead of sending them.
#[derive(Default)]
pub struct RecordingReplyDelivery {
    sent: RwLock<Vec<Activity>>,
}

impl RecordingReplyDelivery {
    pub async fn sent(&self) -> Vec<Activity> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl ReplyDelivery for RecordingReplyDelivery {
    async fn deliver(&self, reply: &Activity) -> Result<(), DeliveryError> {
        self.sent.write().await.push(reply.clone());
        Ok(())
    }
}
