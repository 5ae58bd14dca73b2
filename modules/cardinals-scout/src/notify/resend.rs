use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use cardinals_common::CardinalsError;

use super::backend::{DigestMessage, DigestTransport};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Resend HTTP email API backend.
pub struct ResendTransport {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
}

impl ResendTransport {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("RESEND_API_KEY is empty");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_key,
            endpoint: RESEND_API_URL.to_string(),
            http,
        })
    }

    /// Point at a different endpoint (mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(message: &DigestMessage) -> serde_json::Value {
        json!({
            "from": message.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        })
    }
}

#[async_trait]
impl DigestTransport for ResendTransport {
    async fn send(&self, message: &DigestMessage) -> anyhow::Result<()> {
        if message.to.is_empty() {
            return Err(CardinalsError::Transport("digest has no recipients".to_string()).into());
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Self::payload(message))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Resend returned non-success");
            return Err(CardinalsError::Transport(format!("Resend returned {status}")).into());
        }

        info!(recipients = message.to.len(), subject = %message.subject, "Digest delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> DigestMessage {
        DigestMessage {
            subject: "Climate Cardinals Newsletter - 2026-10-19".to_string(),
            html: "<p>hi</p>".to_string(),
            from: "news@cardinals.org".to_string(),
            to: vec!["a@x.org".to_string(), "b@y.org".to_string()],
        }
    }

    #[test]
    fn rejects_blank_api_key() {
        assert!(ResendTransport::new("  ".to_string()).is_err());
    }

    #[test]
    fn payload_carries_every_recipient() {
        let payload = ResendTransport::payload(&message());
        assert_eq!(payload["to"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(payload["from"], "news@cardinals.org");
        assert_eq!(payload["html"], "<p>hi</p>");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let transport = ResendTransport::new("re_test".to_string())
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/emails");
        assert!(transport.send(&message()).await.is_err());
    }

    #[tokio::test]
    async fn empty_recipient_list_is_an_error() {
        let transport = ResendTransport::new("re_test".to_string()).unwrap();
        let mut msg = message();
        msg.to.clear();
        let err = transport.send(&msg).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CardinalsError>(),
            Some(CardinalsError::Transport(_))
        ));
    }
}
