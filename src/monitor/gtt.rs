use std::collections::BTreeMap;
use std::sync::Arc;

use crate::alerts::Notifier;
use crate::broker::BrokerAdapter;
use crate::models::SymbolSnapshot;
use crate::positions::PositionStore;
use crate::strategy::continuation::ContinuationChecker;

/// Keeps broker-side GTT brackets aligned with profit trailing and
/// continuation checks. One modify call per position per pass; a broker
/// failure on one symbol never blocks the rest.
pub struct GttManager {
    broker: Arc<dyn BrokerAdapter>,
    notifier: Arc<dyn Notifier>,
    checker: ContinuationChecker,
}

impl GttManager {
    pub fn new(broker: Arc<dyn BrokerAdapter>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            broker,
            notifier,
            checker: ContinuationChecker::default(),
        }
    }

    /// Returns the number of brackets moved
    pub async fn refresh_all(
        &self,
        store: &mut PositionStore,
        snapshots: &BTreeMap<String, SymbolSnapshot>,
    ) -> usize {
        let mut updated = 0;

        for symbol in store.symbols() {
            let Some(position) = store.get(&symbol) else {
                continue;
            };
            let Some(snapshot) = snapshots.get(&symbol) else {
                tracing::warn!(symbol = %symbol, "no snapshot for gtt refresh");
                continue;
            };

            let Some(update) = self.checker.evaluate(position, snapshot) else {
                continue;
            };

            match self
                .broker
                .modify_bracket_order(&position.order_id, update.new_sl, update.new_target)
                .await
            {
                Ok(()) => {
                    let sl_delta = pct_delta(position.stop_loss, update.new_sl);
                    let target_delta = pct_delta(position.target, update.new_target);
                    let text = format!(
                        "GTT updated for {symbol}: SL {:.2} -> {:.2} ({sl_delta:+.1}%), \
                         target {:.2} -> {:.2} ({target_delta:+.1}%)",
                        position.stop_loss, update.new_sl, position.target, update.new_target,
                    );
                    self.notifier.send_message(&text).await;

                    if let Some(position) = store.get_mut(&symbol) {
                        position.stop_loss = update.new_sl;
                        position.target = update.new_target;
                    }
                    updated += 1;
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, "gtt modify failed: {e}");
                }
            }
        }

        updated
    }
}

fn pct_delta(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    (new - old) / old * 100.0
}
