use std::collections::BTreeMap;

use crate::models::AggregatedSignal;
use crate::strategy::StrategySignals;

/// Combines per-strategy signals into one composite score per symbol.
///
/// composite = sum(strategy-slot weight x signal score x signal weight)
/// over the strategies that produced a signal. Symbols nobody scored are
/// omitted. Abstaining strategies do NOT cause renormalization: a symbol
/// scored only by a quant strategy keeps its 0.3-weighted composite.
/// Output iterates symbols in lexicographic order.
pub struct SignalAggregator;

impl SignalAggregator {
    pub fn aggregate_signals(
        batches: &[StrategySignals],
    ) -> BTreeMap<String, AggregatedSignal> {
        let mut aggregated: BTreeMap<String, AggregatedSignal> = BTreeMap::new();

        for batch in batches {
            let slot_weight = batch.kind.weight();

            for (symbol, signal) in &batch.by_symbol {
                let weighted = signal.score * signal.weight * slot_weight;

                let entry = aggregated
                    .entry(symbol.clone())
                    .or_insert_with(|| AggregatedSignal {
                        composite_score: 0.0,
                        signals: Vec::new(),
                    });
                entry.composite_score += weighted;
                entry.signals.push(signal.clone());
            }
        }

        aggregated
    }
}
