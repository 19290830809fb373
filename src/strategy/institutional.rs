use super::hedge::{HedgeDetector, SectorFlowTable};
use super::{Strategy, StrategyKind};
use crate::config::RiskConstraints;
use crate::error::StrategyError;
use crate::models::{Direction, Signal, SignalReason, SymbolSnapshot};

/// FII/DII net-flow thresholds, rupees
const STRONG_INFLOW_FII: f64 = 2e7;
const STRONG_INFLOW_DII: f64 = 1e7;
const FII_SELLING: f64 = -1e7;

/// Plain institutional-flow strategy: strong combined FII+DII buying is a
/// high-conviction advisory, FII selling is a low-score warning. No trade
/// levels; this variant only feeds the composite score.
pub struct InstitutionalFlowStrategy;

impl Strategy for InstitutionalFlowStrategy {
    fn name(&self) -> &'static str {
        "institutional_flow"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Institutional
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let flows = &snapshot.flows;

        if flows.fii_net > STRONG_INFLOW_FII && flows.dii_net > STRONG_INFLOW_DII {
            return Ok(Some(Signal::advisory(
                9.0,
                SignalReason::StrongInstitutionalInflow,
                3,
            )));
        }

        if flows.fii_net < FII_SELLING {
            return Ok(Some(Signal::advisory(2.0, SignalReason::FiiSelling, 1)));
        }

        Ok(None)
    }
}

/// Hedge-aware institutional strategy: screens on 3-day net flow against
/// the symbol's market-cap threshold, then discounts the signal when the
/// flow looks like an index, sector, or pair hedge.
pub struct HedgeAwareInstitutionalStrategy {
    constraints: RiskConstraints,
    detector: HedgeDetector,
}

impl HedgeAwareInstitutionalStrategy {
    pub fn new(constraints: RiskConstraints, sector_flows: SectorFlowTable) -> Self {
        let detector = HedgeDetector::new(constraints.clone(), sector_flows);
        Self {
            constraints,
            detector,
        }
    }
}

impl Strategy for HedgeAwareInstitutionalStrategy {
    fn name(&self) -> &'static str {
        "hedge_aware_institutional"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Institutional
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let tier = self.constraints.cap_tier(&snapshot.symbol);
        if snapshot.flows.net_3day < self.constraints.cap_threshold(tier) {
            return Ok(None);
        }

        let Some(close) = snapshot.last_close() else {
            return Ok(None);
        };
        if close <= 0.0 {
            return Ok(None);
        }

        let flags = self
            .detector
            .detect_hedges(&snapshot.symbol, &snapshot.flows, &snapshot.oi);

        let (score, weight, reason) = if flags.any() {
            (5.0, 0.5, SignalReason::HedgedFlow)
        } else {
            (8.0, 1.0, SignalReason::PureAccumulation)
        };

        let signal = Signal::tradeable(
            score,
            reason,
            Direction::Long,
            close,
            close * 0.9,
            close * 1.1,
            3,
        )
        .map_err(|e| StrategyError::MalformedInput {
            strategy: "hedge_aware_institutional",
            detail: e.to_string(),
        })?
        .with_weight(weight);

        Ok(Some(signal))
    }
}
