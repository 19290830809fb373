// Trading strategy module
pub mod continuation;
pub mod delivery;
pub mod hedge;
pub mod institutional;
pub mod mean_reversion;
pub mod trend_momentum;
pub mod wyckoff;

use std::collections::BTreeMap;

use crate::error::StrategyError;
use crate::models::{Signal, SymbolSnapshot};

/// Strategy slot used for composite weighting. The weights are fixed and
/// sum to 1.0 across the three slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Institutional,
    Wyckoff,
    Quant,
}

impl StrategyKind {
    /// Fixed aggregation weight for this slot
    pub fn weight(&self) -> f64 {
        match self {
            StrategyKind::Institutional => 0.4,
            StrategyKind::Wyckoff => 0.3,
            StrategyKind::Quant => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Institutional => "institutional",
            StrategyKind::Wyckoff => "wyckoff",
            StrategyKind::Quant => "quant",
        }
    }
}

/// Base trait for all trading strategies.
///
/// `Ok(None)` means the strategy abstained (insufficient or unremarkable
/// data); `Err` means it malfunctioned. The router logs malfunctions and
/// keeps going with the remaining strategies.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> StrategyKind;

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError>;
}

/// One strategy's output across a batch of symbols
#[derive(Debug, Clone)]
pub struct StrategySignals {
    pub strategy: &'static str,
    pub kind: StrategyKind,
    pub by_symbol: BTreeMap<String, Signal>,
}

/// Runs a fixed, ordered list of strategies over symbol snapshots.
///
/// Failure isolation: one strategy erroring on one symbol never blocks
/// the other strategies or the other symbols.
pub struct StrategyRouter {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRouter {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The standard production lineup, in registration order. The sector
    /// flow table is shared with the orchestrator, which refreshes it
    /// before each signal cycle.
    pub fn with_default_strategies(
        constraints: &crate::config::RiskConstraints,
        sector_flows: hedge::SectorFlowTable,
    ) -> Self {
        Self::new(vec![
            Box::new(institutional::HedgeAwareInstitutionalStrategy::new(
                constraints.clone(),
                sector_flows,
            )),
            Box::new(delivery::DeliveryAnalysisStrategy),
            Box::new(wyckoff::WyckoffAccumulationStrategy::default()),
            Box::new(wyckoff::WyckoffDistributionStrategy::default()),
            Box::new(mean_reversion::MeanReversionStrategy::default()),
            Box::new(trend_momentum::TrendMomentumStrategy::default()),
        ])
    }

    pub fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    /// Generate signals from all strategies for all snapshots
    pub fn generate_signals(&self, snapshots: &[SymbolSnapshot]) -> Vec<StrategySignals> {
        let mut results = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let mut by_symbol = BTreeMap::new();

            for snapshot in snapshots {
                match strategy.analyze(snapshot) {
                    Ok(Some(signal)) => {
                        by_symbol.insert(snapshot.symbol.clone(), signal);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            strategy = strategy.name(),
                            symbol = %snapshot.symbol,
                            error = %e,
                            "strategy failed, continuing with remaining strategies"
                        );
                    }
                }
            }

            results.push(StrategySignals {
                strategy: strategy.name(),
                kind: strategy.kind(),
                by_symbol,
            });
        }

        results
    }
}
