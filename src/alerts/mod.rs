// Outbound notifications. Failures are logged and swallowed: an alert
// that cannot be delivered must never take the trading loop down.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::time::Duration;

use crate::config::TelegramSettings;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Fire-and-forget notification surface
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message; returns whether delivery succeeded
    async fn send_message(&self, text: &str) -> bool;

    /// Addressed, subject-line delivery (report style). Defaults to a
    /// formatted `send_message`.
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        self.send_message(&format!("[{to}] {subject}\n{body}")).await
    }
}

/// Telegram bot notifier
pub struct TelegramNotifier {
    client: Client,
    settings: TelegramSettings,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(settings: TelegramSettings) -> Self {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            settings,
            base_url,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> bool {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.settings.token);
        let payload = json!({
            "chat_id": self.settings.chat_id,
            "text": text,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!("telegram alert failed: http {}", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("telegram alert failed: {e}");
                false
            }
        }
    }
}

/// Fallback notifier that writes alerts to the log stream
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> bool {
        tracing::info!("ALERT: {text}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(base_url: String) -> TelegramNotifier {
        TelegramNotifier::new(TelegramSettings {
            token: "bot-token".to_string(),
            chat_id: "1234".to_string(),
            base_url: Some(base_url),
        })
    }

    #[tokio::test]
    async fn test_telegram_delivery() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botbot-token/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        assert!(notifier(server.url()).send_message("entered RELIANCE").await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_failure_is_nonfatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/botbot-token/sendMessage")
            .with_status(500)
            .create_async()
            .await;

        assert!(!notifier(server.url()).send_message("exit PEL").await);
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send_message("hello").await);
    }
}
