use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};

use super::{BracketOrderRequest, BrokerAdapter};
use crate::config::BrokerSettings;
use crate::error::BrokerError;
use crate::models::Direction;

const UPSTOX_API_BASE: &str = "https://api.upstox.com/v2";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upstox adapter. Bracket orders map onto multi-rule GTT orders.
#[derive(Debug)]
pub struct UpstoxBroker {
    client: Client,
    settings: BrokerSettings,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GttOrderResponse {
    data: GttOrderData,
}

#[derive(Debug, Deserialize)]
struct GttOrderData {
    order_id: String,
}

impl UpstoxBroker {
    pub fn new(settings: BrokerSettings) -> Self {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| UPSTOX_API_BASE.to_string());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            settings,
            base_url,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.settings.access_token)
    }

    fn rules(stop_loss: f64, target: f64) -> serde_json::Value {
        json!([
            { "strategy": "STOPLOSS", "trigger_type": "IMMEDIATE", "trigger_price": stop_loss },
            { "strategy": "TARGET", "trigger_type": "IMMEDIATE", "trigger_price": target },
        ])
    }

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
                    "upstox attempt {}/{} failed: {}. retrying in {}ms",
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
impl BrokerAdapter for UpstoxBroker {
    fn name(&self) -> &'static str {
        "upstox"
    }

    async fn place_bracket_order(
        &self,
        order: &BracketOrderRequest,
    ) -> Result<String, BrokerError> {
        let url = format!("{}/order/gtt/place", self.base_url);
        let side = match order.direction {
            Direction::Long => "BUY",
            Direction::Short => "SELL",
        };
        let payload = json!({
            "instrument_token": format!("NSE_EQ|{}", order.symbol),
            "quantity": order.quantity,
            "product": "D",
            "transaction_type": side,
            "price": order.entry,
            "rules": Self::rules(order.stop_loss, order.target),
        });

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Authorization", self.bearer())
                    .json(&payload)
            })
            .await?;

        let parsed: GttOrderResponse =
            response.json().await.map_err(|e| BrokerError::CallFailed {
                attempts: 1,
                detail: format!("malformed response: {e}"),
            })?;
        Ok(parsed.data.order_id)
    }

    async fn modify_bracket_order(
        &self,
        order_id: &str,
        new_sl: f64,
        new_target: f64,
    ) -> Result<(), BrokerError> {
        let url = format!("{}/order/gtt/modify", self.base_url);
        let payload = json!({
            "gtt_order_id": order_id,
            "rules": Self::rules(new_sl, new_target),
        });

        self.send_with_retry(|| {
            self.client
                .put(&url)
                .header("Authorization", self.bearer())
                .json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn cancel_bracket_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let url = format!("{}/order/gtt/cancel", self.base_url);
        let payload = json!({ "gtt_order_id": order_id });

        self.send_with_retry(|| {
            self.client
                .delete(&url)
                .header("Authorization", self.bearer())
                .json(&payload)
        })
        .await?;
        Ok(())
    }
}
