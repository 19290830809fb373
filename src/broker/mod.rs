// Broker adapters for GTT bracket orders
pub mod paper;
pub mod upstox;
pub mod zerodha;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::BrokerError;
use crate::models::Direction;

pub use paper::PaperBroker;
pub use upstox::UpstoxBroker;
pub use zerodha::ZerodhaBroker;

/// A new bracket order: entry with attached stop-loss and target triggers
#[derive(Debug, Clone)]
pub struct BracketOrderRequest {
    pub symbol: String,
    pub quantity: u64,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub target: f64,
}

/// Uniform surface over broker GTT APIs.
///
/// `modify_bracket_order` must be idempotent: re-sending levels the order
/// already carries succeeds without a broker-side change, so a retried
/// monitoring pass never double-moves a bracket.
#[async_trait]
pub trait BrokerAdapter: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Place a bracket order and return the broker's order id
    async fn place_bracket_order(&self, order: &BracketOrderRequest)
        -> Result<String, BrokerError>;

    /// Replace the stop-loss and target triggers on a live bracket order
    async fn modify_bracket_order(
        &self,
        order_id: &str,
        new_sl: f64,
        new_target: f64,
    ) -> Result<(), BrokerError>;

    /// Cancel a live bracket order
    async fn cancel_bracket_order(&self, order_id: &str) -> Result<(), BrokerError>;
}

/// Look up a broker adapter by name using the configured credentials
pub fn broker_for(name: &str, settings: &Settings) -> Result<Arc<dyn BrokerAdapter>, BrokerError> {
    let creds = settings.brokers.get(name);
    match name {
        "zerodha" => {
            let creds = creds.ok_or_else(|| BrokerError::UnknownBroker(name.to_string()))?;
            Ok(Arc::new(ZerodhaBroker::new(creds.clone())))
        }
        "upstox" => {
            let creds = creds.ok_or_else(|| BrokerError::UnknownBroker(name.to_string()))?;
            Ok(Arc::new(UpstoxBroker::new(creds.clone())))
        }
        "paper" => Ok(Arc::new(PaperBroker::new())),
        other => Err(BrokerError::UnknownBroker(other.to_string())),
    }
}
