use async_trait::async_trait;
use tracing::info;

use super::backend::{DigestMessage, DigestTransport};

/// Transport that logs the digest instead of delivering it. Backs `run --dry-run`.
pub struct NoopTransport;

#[async_trait]
impl DigestTransport for NoopTransport {
    async fn send(&self, message: &DigestMessage) -> anyhow::Result<()> {
        info!(
            subject = %message.subject,
            recipients = message.to.len(),
            bytes = message.html.len(),
            "Dry run, digest not delivered"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
