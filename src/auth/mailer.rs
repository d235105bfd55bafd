//! Out-of-band delivery of recovery links.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

/// A recovery message. `recovery_url` embeds the raw token; nothing else
/// in the system holds that value after the handoff.
#[derive(Clone, Debug)]
pub struct RecoveryEmail {
    pub to_email: String,
    pub recovery_url: String,
    pub expires_at: i64,
}

/// Delivery channel for recovery messages.
#[async_trait]
pub trait RecoveryMailer: Send + Sync {
    /// Deliver the message, or fail so the caller can clear the stored
    /// token pair.
    async fn send(&self, message: &RecoveryEmail) -> Result<()>;
}

/// Local development sender that logs instead of delivering.
#[derive(Clone, Copy, Debug)]
pub struct LogRecoveryMailer;

#[async_trait]
impl RecoveryMailer for LogRecoveryMailer {
    async fn send(&self, message: &RecoveryEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            recovery_url = %message.recovery_url,
            expires_at = message.expires_at,
            "recovery email (log delivery)"
        );
        Ok(())
    }
}

/// Captures messages instead of delivering them, so tests can read the
/// recovery link back out.
#[derive(Debug, Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<RecoveryEmail>>,
}

impl CapturingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<RecoveryEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl RecoveryMailer for CapturingMailer {
    async fn send(&self, message: &RecoveryEmail) -> Result<()> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Build the frontend recovery link embedded in outbound messages. The
/// token rides in the fragment so it never shows up in server access logs.
#[must_use]
pub fn build_recovery_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/recover#token={token}")
}

#[cfg(test)]
mod tests {
    use super::{build_recovery_url, CapturingMailer, RecoveryEmail, RecoveryMailer};

    #[test]
    fn test_build_recovery_url() {
        assert_eq!(
            build_recovery_url("http://localhost:3000", "abc123"),
            "http://localhost:3000/recover#token=abc123"
        );
        assert_eq!(
            build_recovery_url("https://rezervi.dev/", "abc123"),
            "https://rezervi.dev/recover#token=abc123"
        );
    }

    #[tokio::test]
    async fn test_capturing_mailer_records_messages() {
        let mailer = CapturingMailer::new();
        mailer
            .send(&RecoveryEmail {
                to_email: "anna@example.com".to_string(),
                recovery_url: "http://localhost:3000/recover#token=abc".to_string(),
                expires_at: 1_200,
            })
            .await
            .unwrap();
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "anna@example.com");
    }
}
