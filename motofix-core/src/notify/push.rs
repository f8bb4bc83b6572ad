//! Push-notification channel.
//!
//! Messages are POSTed to a device-token-addressed gateway. The gateway
//! endpoint and credential come from configuration; delivery beyond the
//! gateway's 2xx acknowledgement is not tracked.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Errors that can occur while handing a message to the push gateway.
#[derive(Debug, Error)]
pub enum PushError {
    /// HTTP request error
    #[error("push request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Gateway rejected the message (non-2xx status)
    #[error("push gateway rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Payload delivered to the owner's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub entity_key: String,
    pub entity_id: String,
    pub screen: String,
}

/// The push channel seam. Production uses [`HttpPushGateway`]; tests use
/// recording or failing stand-ins.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError>;
}

/// HTTP client for the push gateway.
#[derive(Clone)]
pub struct HttpPushGateway {
    endpoint: Url,
    api_key: String,
    http_client: reqwest::Client,
}

impl HttpPushGateway {
    pub fn new(endpoint: Url, api_key: String) -> Self {
        Self {
            endpoint,
            api_key,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    #[serde(flatten)]
    message: &'a PushMessage,
}

#[async_trait]
impl PushSender for HttpPushGateway {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&PushRequest {
                to: device_token,
                message,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn push_message_wire_shape() {
        let message = PushMessage {
            kind: "order".into(),
            title: "Order ready".into(),
            body: "Your vehicle is ready for pickup.".into(),
            entity_key: "repair-order".into(),
            entity_id: "42".into(),
            screen: "OrderDetail".into(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "order");
        assert_eq!(json["entityKey"], "repair-order");
        assert_eq!(json["screen"], "OrderDetail");
    }
}
