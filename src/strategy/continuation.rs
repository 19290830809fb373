use crate::indicators::calculate_sma;
use crate::models::SymbolSnapshot;
use crate::positions::Position;

/// Proposed replacement levels for a live bracket order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GttUpdate {
    pub new_sl: f64,
    pub new_target: f64,
}

/// Profit-trail activation threshold (unrealized PnL fraction)
const TRAIL_ACTIVATION_PNL: f64 = 0.03;
/// Trailed stop sits 1% below the current price
const TRAIL_SL_FACTOR: f64 = 0.99;
/// Revised target sits 5% above the current price
const TRAIL_TARGET_FACTOR: f64 = 1.05;

/// Decides whether a position's broker-side stop/target should move.
///
/// Two rules, evaluated in order:
/// 1. Profit trailing: once unrealized PnL exceeds 3%, trail the stop to
///    1% below the current price and lift the target 5% above it.
/// 2. Continuation: if the trend check fails (price under the 10-bar SMA)
///    while the position is in profit, lock gains by tightening only the
///    stop.
pub struct ContinuationChecker {
    pub sma_period: usize,
}

impl Default for ContinuationChecker {
    fn default() -> Self {
        Self { sma_period: 10 }
    }
}

impl ContinuationChecker {
    pub fn evaluate(&self, position: &Position, snapshot: &SymbolSnapshot) -> Option<GttUpdate> {
        let price = snapshot.last_close()?;
        if position.entry_price <= 0.0 {
            return None;
        }
        let pnl_pct = (price - position.entry_price) / position.entry_price;

        if pnl_pct > TRAIL_ACTIVATION_PNL {
            let update = GttUpdate {
                new_sl: price * TRAIL_SL_FACTOR,
                new_target: price * TRAIL_TARGET_FACTOR,
            };
            // Never loosen an already-tighter stop
            if update.new_sl > position.stop_loss {
                return Some(update);
            }
            return None;
        }

        let sma = calculate_sma(&snapshot.closes(), self.sma_period)?;
        if price < sma && pnl_pct > 0.0 {
            let new_sl = price * TRAIL_SL_FACTOR;
            if new_sl > position.stop_loss {
                return Some(GttUpdate {
                    new_sl,
                    new_target: position.target,
                });
            }
        }

        None
    }
}
