use std::collections::BTreeMap;
use std::fmt;

use crate::models::SymbolSnapshot;
use crate::positions::{Position, PositionStore};
use crate::risk::RiskEngine;

/// Why a position should be closed, in evaluation priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLossTriggered,
    TargetAchieved,
    RiskEmergency,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopLossTriggered => "stop_loss_triggered",
            Self::TargetAchieved => "target_achieved",
            Self::RiskEmergency => "risk_emergency",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exit the orchestrator should execute at the broker
#[derive(Debug, Clone)]
pub struct ExitInstruction {
    pub symbol: String,
    pub reason: ExitReason,
    pub quantity: u64,
}

/// Evaluates open positions against their bracket levels and the swing
/// risk assessor. Pure decisions only; broker calls happen upstream.
pub struct ExitManager {
    risk: RiskEngine,
}

impl ExitManager {
    pub fn new(risk: RiskEngine) -> Self {
        Self { risk }
    }

    /// First matching rule wins: stop-loss, then target, then risk
    /// emergency. Both level checks are boundary-inclusive so a price
    /// landing exactly on a trigger exits.
    pub fn evaluate_single_exit(
        &self,
        position: &Position,
        snapshot: &SymbolSnapshot,
    ) -> Option<ExitReason> {
        let pnl = position.pnl_pct();

        if pnl <= -position.sl_pct {
            return Some(ExitReason::StopLossTriggered);
        }
        if pnl >= position.target_pct {
            return Some(ExitReason::TargetAchieved);
        }
        if self.risk.check_emergency_exit(position, snapshot) {
            return Some(ExitReason::RiskEmergency);
        }
        None
    }

    /// Evaluate every open position; symbols without a snapshot are
    /// skipped, never exited blind
    pub fn evaluate_exits(
        &self,
        store: &PositionStore,
        snapshots: &BTreeMap<String, SymbolSnapshot>,
    ) -> Vec<ExitInstruction> {
        let mut instructions = Vec::new();

        for position in store.iter() {
            let Some(snapshot) = snapshots.get(&position.symbol) else {
                tracing::warn!(symbol = %position.symbol, "no snapshot for open position");
                continue;
            };
            if let Some(reason) = self.evaluate_single_exit(position, snapshot) {
                tracing::info!(
                    symbol = %position.symbol,
                    reason = %reason,
                    pnl_pct = position.pnl_pct(),
                    "exit signalled"
                );
                instructions.push(ExitInstruction {
                    symbol: position.symbol.clone(),
                    reason,
                    quantity: position.quantity,
                });
            }
        }

        instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::config::RiskConstraints;
    use crate::models::Candle;

    fn manager() -> ExitManager {
        ExitManager::new(RiskEngine::new(RiskConstraints::default()))
    }

    fn position(entry: f64, stop: f64, target: f64, last: f64) -> Position {
        let mut p = Position::new("TEST", entry, 100, stop, target, "gtt-1");
        p.last_price = last;
        p
    }

    fn calm_snapshot() -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("TEST");
        snap.candles = (0..30)
            .map(|i| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc::now() - chrono::Duration::days(30 - i),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 2e6,
            })
            .collect();
        snap
    }

    #[test]
    fn test_stop_loss_boundary_inclusive() {
        // Exactly -5%: exit fires on the boundary
        let p = position(100.0, 95.0, 110.0, 95.0);
        let reason = manager().evaluate_single_exit(&p, &calm_snapshot());
        assert_eq!(reason, Some(ExitReason::StopLossTriggered));
    }

    #[test]
    fn test_target_boundary_inclusive() {
        let p = position(100.0, 95.0, 110.0, 110.0);
        let reason = manager().evaluate_single_exit(&p, &calm_snapshot());
        assert_eq!(reason, Some(ExitReason::TargetAchieved));
    }

    #[test]
    fn test_inside_bracket_holds() {
        let p = position(100.0, 95.0, 110.0, 103.0);
        assert_eq!(manager().evaluate_single_exit(&p, &calm_snapshot()), None);
    }

    #[test]
    fn test_risk_emergency_exit() {
        // Inside the bracket, but flows and price structure deteriorated
        let p = position(100.0, 95.0, 110.0, 98.0);
        let mut snap = calm_snapshot();
        snap.flows.net_3day = -5e7;
        for candle in snap.candles.iter_mut().rev().take(1) {
            candle.close = 92.0;
        }

        let reason = manager().evaluate_single_exit(&p, &snap);
        assert_eq!(reason, Some(ExitReason::RiskEmergency));
    }

    #[test]
    fn test_stop_breach_outranks_risk_emergency() {
        // Price through the stop AND the assessor's emergency conditions
        // (institutional selling + support break) true at once: the stop
        // is reported as the exit reason
        let p = position(100.0, 95.0, 110.0, 92.0);
        let mut snap = calm_snapshot();
        snap.flows.net_3day = -5e7;
        if let Some(last) = snap.candles.last_mut() {
            last.close = 92.0;
        }

        assert!(manager().risk.check_emergency_exit(&p, &snap));
        let reason = manager().evaluate_single_exit(&p, &snap);
        assert_eq!(reason, Some(ExitReason::StopLossTriggered));
    }

    #[test]
    fn test_missing_snapshot_skipped() {
        let mut store = PositionStore::new();
        store.enter(position(100.0, 95.0, 110.0, 90.0)).unwrap();

        let instructions = manager().evaluate_exits(&store, &BTreeMap::new());
        assert!(instructions.is_empty());
    }

    #[test]
    fn test_evaluate_exits_collects_instructions() {
        let mut store = PositionStore::new();
        store.enter(position(100.0, 95.0, 110.0, 94.0)).unwrap();

        let mut snapshots = BTreeMap::new();
        snapshots.insert("TEST".to_string(), calm_snapshot());

        let instructions = manager().evaluate_exits(&store, &snapshots);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].symbol, "TEST");
        assert_eq!(instructions[0].reason, ExitReason::StopLossTriggered);
        assert_eq!(instructions[0].quantity, 100);
    }
}
