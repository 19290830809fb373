use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};

use super::{BracketOrderRequest, BrokerAdapter};
use crate::config::BrokerSettings;
use crate::error::BrokerError;
use crate::models::Direction;

const KITE_API_BASE: &str = "https://api.kite.trade";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Zerodha Kite adapter. Bracket orders map onto two-leg GTT triggers.
#[derive(Debug)]
pub struct ZerodhaBroker {
    client: Client,
    settings: BrokerSettings,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GttResponse {
    data: GttData,
}

#[derive(Debug, Deserialize)]
struct GttData {
    trigger_id: u64,
}

impl ZerodhaBroker {
    pub fn new(settings: BrokerSettings) -> Self {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| KITE_API_BASE.to_string());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            settings,
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("token {}:{}", self.settings.api_key, self.settings.access_token)
    }

    fn trigger_payload(order: &BracketOrderRequest) -> serde_json::Value {
        let exit_side = match order.direction {
            Direction::Long => "SELL",
            Direction::Short => "BUY",
        };
        json!({
            "type": "two-leg",
            "tradingsymbol": order.symbol,
            "exchange": "NSE",
            "trigger_values": [order.stop_loss, order.target],
            "last_price": order.entry,
            "orders": [
                {
                    "transaction_type": exit_side,
                    "quantity": order.quantity,
                    "order_type": "LIMIT",
                    "product": "CNC",
                    "price": order.stop_loss,
                },
                {
                    "transaction_type": exit_side,
                    "quantity": order.quantity,
                    "order_type": "LIMIT",
                    "product": "CNC",
                    "price": order.target,
                },
            ],
        })
    }

    /// Send one request with retries and exponential backoff
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BrokerError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if status.as_u16() == 404 {
                        return Err(BrokerError::UnknownOrder(status.to_string()));
                    }
                    last_error = format!("http {}", status);
                    if status.is_client_error() {
                        return Err(BrokerError::Rejected(last_error));
                    }
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < MAX_RETRIES {
                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "zerodha attempt {}/{} failed: {}. retrying in {}ms",
                    attempt,
                    MAX_RETRIES,
                    last_error,
                    backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(BrokerError::CallFailed {
            attempts: MAX_RETRIES,
            detail: last_error,
        })
    }
}

#[async_trait::async_trait]
impl BrokerAdapter for ZerodhaBroker {
    fn name(&self) -> &'static str {
        "zerodha"
    }

    async fn place_bracket_order(
        &self,
        order: &BracketOrderRequest,
    ) -> Result<String, BrokerError> {
        let url = format!("{}/gtt/triggers", self.base_url);
        let payload = Self::trigger_payload(order);

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Authorization", self.auth_header())
                    .json(&payload)
            })
            .await?;

        let parsed: GttResponse = response.json().await.map_err(|e| BrokerError::CallFailed {
            attempts: 1,
            detail: format!("malformed response: {e}"),
        })?;
        Ok(parsed.data.trigger_id.to_string())
    }

    async fn modify_bracket_order(
        &self,
        order_id: &str,
        new_sl: f64,
        new_target: f64,
    ) -> Result<(), BrokerError> {
        let url = format!("{}/gtt/triggers/{}", self.base_url, order_id);
        let payload = json!({ "trigger_values": [new_sl, new_target] });

        self.send_with_retry(|| {
            self.client
                .put(&url)
                .header("Authorization", self.auth_header())
                .json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn cancel_bracket_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let url = format!("{}/gtt/triggers/{}", self.base_url, order_id);
        self.send_with_retry(|| {
            self.client
                .delete(&url)
                .header("Authorization", self.auth_header())
        })
        .await?;
        Ok(())
    }
}
