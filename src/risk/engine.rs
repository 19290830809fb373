use crate::config::RiskConstraints;
use crate::error::RiskError;
use crate::indicators::calculate_atr;
use crate::models::{SymbolSnapshot, TradeLevels};
use crate::positions::Position;
use crate::risk::assessor::{RiskAction, SwingRiskAssessor};

/// ATR period used for the volatility gate
const ATR_PERIOD: usize = 14;
/// Maximum acceptable ATR as a fraction of price
const MAX_ATR_RATIO: f64 = 0.1;
/// Minimum average daily volume
const MIN_AVG_VOLUME: f64 = 1e6;
/// Maximum stop distance as a fraction of entry
const MAX_STOP_DISTANCE: f64 = 0.05;

/// Position sizing and trade validation under the loaded risk constraints
pub struct RiskEngine {
    constraints: RiskConstraints,
    assessor: SwingRiskAssessor,
}

impl RiskEngine {
    pub fn new(constraints: RiskConstraints) -> Self {
        Self {
            constraints,
            assessor: SwingRiskAssessor::default(),
        }
    }

    pub fn constraints(&self) -> &RiskConstraints {
        &self.constraints
    }

    /// Quantity such that a stop-out loses at most
    /// `portfolio_value x max_risk_per_trade`.
    ///
    /// Fails when entry equals the stop: risk per share is zero and the
    /// division is undefined.
    pub fn calculate_position_size(
        &self,
        entry: f64,
        stop_loss: f64,
        portfolio_value: f64,
    ) -> Result<u64, RiskError> {
        let risk_per_share = (entry - stop_loss).abs();
        if risk_per_share <= 0.0 {
            return Err(RiskError::InvalidStopLoss { entry, stop_loss });
        }

        let risk_amount = portfolio_value * self.constraints.max_risk_per_trade;
        let quantity = (risk_amount / risk_per_share).floor();
        Ok(if quantity > 0.0 { quantity as u64 } else { 0 })
    }

    /// Conjunction of the volatility, liquidity, and stop-distance gates.
    /// Missing data or zero denominators fail the relevant gate closed.
    pub fn validate_trade(&self, snapshot: &SymbolSnapshot, levels: &TradeLevels) -> bool {
        self.check_volatility(snapshot)
            && self.check_liquidity(snapshot)
            && Self::check_max_risk(levels)
    }

    /// Institutional variant: volatility + liquidity, then the
    /// hedge-ratio and delivery-gap gates
    pub fn validate_institutional_trade(&self, snapshot: &SymbolSnapshot) -> bool {
        if !self.check_volatility(snapshot) || !self.check_liquidity(snapshot) {
            return false;
        }

        let flows = &snapshot.flows;
        if flows.net_fno == 0.0 {
            return false;
        }
        let hedge_ratio = flows.net_cash / flows.net_fno.abs();
        if hedge_ratio <= self.constraints.hedge.cash_derivatives_ratio {
            return false;
        }

        let delivery_gap = flows.delivery_pct - flows.hedge_pct;
        delivery_gap > self.constraints.hedge.delivery_hedge_gap
    }

    fn check_volatility(&self, snapshot: &SymbolSnapshot) -> bool {
        let Some(atr) = calculate_atr(&snapshot.candles, ATR_PERIOD) else {
            return false;
        };
        let Some(close) = snapshot.last_close() else {
            return false;
        };
        if close <= 0.0 {
            return false;
        }
        atr / close < MAX_ATR_RATIO
    }

    fn check_liquidity(&self, snapshot: &SymbolSnapshot) -> bool {
        match snapshot.avg_volume() {
            Some(v) => v > MIN_AVG_VOLUME,
            None => false,
        }
    }

    fn check_max_risk(levels: &TradeLevels) -> bool {
        if levels.entry <= 0.0 {
            return false;
        }
        (levels.entry - levels.sl).abs() / levels.entry < MAX_STOP_DISTANCE
    }

    /// Emergency-exit gate for open positions: true when the swing risk
    /// assessor scores 7 or above
    pub fn check_emergency_exit(&self, position: &Position, snapshot: &SymbolSnapshot) -> bool {
        let assessment = self.assessor.evaluate(position, snapshot);
        assessment.action == RiskAction::EmergencyExit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::{Candle, Direction};

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskConstraints::default())
    }

    fn calm_snapshot(close: f64, volume: f64) -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("RELIANCE");
        snap.candles = (0..30)
            .map(|i| Candle {
                symbol: "RELIANCE".to_string(),
                timestamp: Utc::now() - chrono::Duration::days(30 - i),
                open: close,
                high: close * 1.005,
                low: close * 0.995,
                close,
                volume,
            })
            .collect();
        snap
    }

    #[test]
    fn test_position_size_basic() {
        // 2% of 1,000,000 = 20,000 risk; 10 per share => 2000 shares
        let qty = engine().calculate_position_size(100.0, 90.0, 1_000_000.0).unwrap();
        assert_eq!(qty, 2000);
    }

    #[test]
    fn test_position_size_floors() {
        // 2% of 10,000 = 200 risk; 3.0 per share => 66.67 -> 66
        let qty = engine().calculate_position_size(100.0, 97.0, 10_000.0).unwrap();
        assert_eq!(qty, 66);
    }

    #[test]
    fn test_position_size_risk_bound() {
        let engine = engine();
        let (entry, stop, portfolio) = (153.7, 149.2, 250_000.0);
        let qty = engine.calculate_position_size(entry, stop, portfolio).unwrap();

        let per_share = (entry - stop).abs();
        let max_risk = portfolio * engine.constraints().max_risk_per_trade;
        assert!(qty as f64 * per_share <= max_risk + per_share);
    }

    #[test]
    fn test_position_size_entry_equals_stop_fails() {
        let err = engine()
            .calculate_position_size(100.0, 100.0, 1_000_000.0)
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidStopLoss { .. }));
    }

    #[test]
    fn test_validate_trade_passes_calm_liquid() {
        let snap = calm_snapshot(100.0, 2e6);
        let levels = TradeLevels::new(Direction::Long, 100.0, 96.5, 108.0).unwrap();
        assert!(engine().validate_trade(&snap, &levels));
    }

    #[test]
    fn test_validate_trade_rejects_wide_stop() {
        let snap = calm_snapshot(100.0, 2e6);
        // 8% stop distance breaches the 5% cap
        let levels = TradeLevels::new(Direction::Long, 100.0, 92.0, 110.0).unwrap();
        assert!(!engine().validate_trade(&snap, &levels));
    }

    #[test]
    fn test_validate_trade_rejects_illiquid() {
        let snap = calm_snapshot(100.0, 5e5);
        let levels = TradeLevels::new(Direction::Long, 100.0, 96.5, 108.0).unwrap();
        assert!(!engine().validate_trade(&snap, &levels));
    }

    #[test]
    fn test_validate_trade_fails_closed_without_bars() {
        let snap = SymbolSnapshot::new("RELIANCE");
        let levels = TradeLevels::new(Direction::Long, 100.0, 96.5, 108.0).unwrap();
        assert!(!engine().validate_trade(&snap, &levels));
    }

    #[test]
    fn test_institutional_gate_zero_fno_fails_closed() {
        let mut snap = calm_snapshot(100.0, 2e6);
        snap.flows.net_fno = 0.0;
        snap.flows.net_cash = 5e7;
        assert!(!engine().validate_institutional_trade(&snap));
    }

    #[test]
    fn test_institutional_gate_passes() {
        let mut snap = calm_snapshot(100.0, 2e6);
        snap.flows.net_cash = 2e7;
        snap.flows.net_fno = 1e7; // ratio 2.0 > 0.5
        snap.flows.delivery_pct = 45.0;
        snap.flows.hedge_pct = 20.0; // gap 25 > 10
        assert!(engine().validate_institutional_trade(&snap));
    }

    #[test]
    fn test_institutional_gate_narrow_delivery_gap_fails() {
        let mut snap = calm_snapshot(100.0, 2e6);
        snap.flows.net_cash = 2e7;
        snap.flows.net_fno = 1e7;
        snap.flows.delivery_pct = 45.0;
        snap.flows.hedge_pct = 40.0; // gap 5 <= 10
        assert!(!engine().validate_institutional_trade(&snap));
    }
}
