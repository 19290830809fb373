use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{BracketOrderRequest, BrokerAdapter};
use crate::error::BrokerError;

/// Simulated order book entry
#[derive(Debug, Clone)]
pub struct PaperOrder {
    pub request: BracketOrderRequest,
    pub stop_loss: f64,
    pub target: f64,
}

/// In-memory broker for dry runs and tests. No network, no credentials.
#[derive(Debug, Default)]
pub struct PaperBroker {
    orders: Mutex<HashMap<String, PaperOrder>>,
    next_id: AtomicU64,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(&self, order_id: &str) -> Option<PaperOrder> {
        self.orders
            .lock()
            .ok()
            .and_then(|orders| orders.get(order_id).cloned())
    }

    pub fn open_orders(&self) -> usize {
        self.orders.lock().map(|orders| orders.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl BrokerAdapter for PaperBroker {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn place_bracket_order(
        &self,
        order: &BracketOrderRequest,
    ) -> Result<String, BrokerError> {
        let id = format!("paper-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| BrokerError::Rejected("order book poisoned".to_string()))?;
        orders.insert(
            id.clone(),
            PaperOrder {
                request: order.clone(),
                stop_loss: order.stop_loss,
                target: order.target,
            },
        );
        tracing::info!(symbol = %order.symbol, order_id = %id, "paper bracket order placed");
        Ok(id)
    }

    async fn modify_bracket_order(
        &self,
        order_id: &str,
        new_sl: f64,
        new_target: f64,
    ) -> Result<(), BrokerError> {
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| BrokerError::Rejected("order book poisoned".to_string()))?;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::UnknownOrder(order_id.to_string()))?;

        // Idempotent: same levels are a no-op success
        order.stop_loss = new_sl;
        order.target = new_target;
        Ok(())
    }

    async fn cancel_bracket_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| BrokerError::Rejected("order book poisoned".to_string()))?;
        orders
            .remove(order_id)
            .map(|_| ())
            .ok_or_else(|| BrokerError::UnknownOrder(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn order(symbol: &str) -> BracketOrderRequest {
        BracketOrderRequest {
            symbol: symbol.to_string(),
            quantity: 10,
            direction: Direction::Long,
            entry: 100.0,
            stop_loss: 95.0,
            target: 110.0,
        }
    }

    #[tokio::test]
    async fn test_place_modify_cancel_lifecycle() {
        let broker = PaperBroker::new();
        let id = broker.place_bracket_order(&order("RELIANCE")).await.unwrap();
        assert_eq!(broker.open_orders(), 1);

        broker.modify_bracket_order(&id, 97.0, 112.0).await.unwrap();
        let stored = broker.order(&id).unwrap();
        assert_eq!(stored.stop_loss, 97.0);
        assert_eq!(stored.target, 112.0);

        broker.cancel_bracket_order(&id).await.unwrap();
        assert_eq!(broker.open_orders(), 0);
    }

    #[tokio::test]
    async fn test_modify_is_idempotent() {
        let broker = PaperBroker::new();
        let id = broker.place_bracket_order(&order("PEL")).await.unwrap();

        broker.modify_bracket_order(&id, 97.0, 112.0).await.unwrap();
        broker.modify_bracket_order(&id, 97.0, 112.0).await.unwrap();

        let stored = broker.order(&id).unwrap();
        assert_eq!(stored.stop_loss, 97.0);
        assert_eq!(stored.target, 112.0);
    }

    #[tokio::test]
    async fn test_unknown_order_errors() {
        let broker = PaperBroker::new();
        assert!(matches!(
            broker.modify_bracket_order("paper-9", 1.0, 2.0).await,
            Err(BrokerError::UnknownOrder(_))
        ));
        assert!(matches!(
            broker.cancel_bracket_order("paper-9").await,
            Err(BrokerError::UnknownOrder(_))
        ));
    }
}
