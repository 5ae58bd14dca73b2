use async_trait::async_trait;

/// A rendered digest ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub subject: String,
    pub html: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Pluggable delivery backend for the weekly digest.
#[async_trait]
pub trait DigestTransport: Send + Sync {
    /// Deliver one digest. Any `Err` means "not sent".
    async fn send(&self, message: &DigestMessage) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}
