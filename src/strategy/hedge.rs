use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::config::RiskConstraints;
use crate::models::{FlowMetrics, HedgeFlags, OiMetrics};

/// Sector ETF net flows by symbol, shared between the orchestrator (which
/// refreshes it each signal cycle) and the detector (which reads it)
pub type SectorFlowTable = Arc<RwLock<BTreeMap<String, f64>>>;

/// Flags institutional buy signals that are actually hedges (index,
/// sector, or pair-trade) so the flow strategies can discount them.
///
/// Each check is independent and fails open: a missing input or degenerate
/// ratio means "no hedge detected", never a blocked signal.
pub struct HedgeDetector {
    constraints: RiskConstraints,
    sector_flows: SectorFlowTable,
}

impl HedgeDetector {
    pub fn new(constraints: RiskConstraints, sector_flows: SectorFlowTable) -> Self {
        Self {
            constraints,
            sector_flows,
        }
    }

    pub fn detect_hedges(&self, symbol: &str, flows: &FlowMetrics, oi: &OiMetrics) -> HedgeFlags {
        HedgeFlags {
            index_hedge: self.check_index_hedge(flows, oi),
            sector_hedge: self.check_sector_hedge(symbol),
            pair_trade: self.check_pair_trade(symbol, flows, oi),
        }
    }

    /// Cash buying swamped by derivatives activity while index OI expands
    pub fn check_index_hedge(&self, flows: &FlowMetrics, oi: &OiMetrics) -> bool {
        if flows.net_fno == 0.0 {
            return false;
        }
        let cash_ratio = flows.net_cash / flows.net_fno.abs();
        cash_ratio < self.constraints.hedge.cash_derivatives_ratio
            && oi.nifty_oi_pct_change > self.constraints.hedge.index_oi_change_limit
    }

    /// Sector ETF outflows while the single name is being bought. A
    /// poisoned or empty table means no hedge detected.
    fn check_sector_hedge(&self, symbol: &str) -> bool {
        let Ok(flows) = self.sector_flows.read() else {
            return false;
        };
        match flows.get(symbol) {
            Some(flow) => *flow < self.constraints.hedge.sector_flow_threshold,
            None => false,
        }
    }

    /// Opposite cash/derivatives flow on a known pair-trade leg with an
    /// outsized OI move
    fn check_pair_trade(&self, symbol: &str, flows: &FlowMetrics, oi: &OiMetrics) -> bool {
        self.constraints.is_pair_symbol(symbol)
            && flows.net_cash.signum() != flows.net_fno.signum()
            && oi.oi_pct_change.abs() > self.constraints.hedge.pair_trade_oi_threshold
    }
}
