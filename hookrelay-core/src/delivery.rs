//! Outbound delivery of formatted payloads.

use crate::config::ChannelTarget;
use crate::events::Payload;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The attempt ran past its time bound
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The target answered with a non-success status
    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection or protocol failure
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Sends one payload to one target. A single attempt, no retries.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(
        &self,
        target: &ChannelTarget,
        payload: &Payload,
        timeout: Duration,
    ) -> Result<(), DeliveryError>;
}

/// Posts payloads to webhook URLs.
pub struct WebhookDelivery {
    http_client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Apply per-target overrides to the payload body.
    fn body_for(target: &ChannelTarget, payload: &Payload) -> serde_json::Value {
        let mut body = payload.as_json().clone();
        if let Some(map) = body.as_object_mut() {
            if let Some(username) = &target.username {
                map.insert("username".into(), username.clone().into());
            }
            if let Some(avatar_url) = &target.avatar_url {
                map.insert("avatar_url".into(), avatar_url.clone().into());
            }
        }
        body
    }
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Delivery for WebhookDelivery {
    async fn deliver(
        &self,
        target: &ChannelTarget,
        payload: &Payload,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let response = self
            .http_client
            .post(target.url.clone())
            .timeout(timeout)
            .json(&Self::body_for(target, payload))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(timeout)
                } else {
                    DeliveryError::Transport(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
