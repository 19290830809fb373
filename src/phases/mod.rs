use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::alerts::Notifier;
use crate::broker::{BracketOrderRequest, BrokerAdapter};
use crate::config::Settings;
use crate::data::DataProvider;
use crate::models::{Signal, SymbolSnapshot};
use crate::monitor::{ExitManager, GttManager};
use crate::positions::{Position, PositionStore};
use crate::risk::RiskEngine;
use crate::scheduler::Phase;
use crate::screening::InstitutionalScreener;
use crate::signal::{SignalAggregator, TrendClassifier, WeightAllocator};
use crate::strategy::hedge::SectorFlowTable;
use crate::strategy::StrategyRouter;

/// Days of history fetched per symbol
const HISTORY_DAYS: usize = 60;

/// Drives the daily cycle: screening, signal generation and trade
/// execution, intraday monitoring, end-of-day reporting.
///
/// Failure policy: one symbol failing never blocks the rest, and a data
/// source failing wholesale degrades the phase to an empty snapshot set
/// instead of crashing the process.
pub struct PhaseManager {
    data: Arc<dyn DataProvider>,
    broker: Arc<dyn BrokerAdapter>,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    universe: Vec<String>,
    shortlist: Vec<String>,
    router: StrategyRouter,
    screener: InstitutionalScreener,
    risk: RiskEngine,
    exits: ExitManager,
    gtt: GttManager,
    classifier: TrendClassifier,
    store: PositionStore,
    /// Shared with the hedge detector inside the router; refreshed from
    /// the data provider before each signal cycle
    sector_flows: SectorFlowTable,
}

impl PhaseManager {
    pub fn new(
        settings: Settings,
        universe: Vec<String>,
        data: Arc<dyn DataProvider>,
        broker: Arc<dyn BrokerAdapter>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let constraints = settings.risk.clone();
        let store = match settings.positions_file.as_deref() {
            Some(path) => PositionStore::load_from(&PathBuf::from(path))?,
            None => PositionStore::new(),
        };
        let sector_flows = SectorFlowTable::default();

        Ok(Self {
            data,
            broker: broker.clone(),
            notifier: notifier.clone(),
            router: StrategyRouter::with_default_strategies(&constraints, sector_flows.clone()),
            screener: InstitutionalScreener::new(constraints.clone()),
            risk: RiskEngine::new(constraints.clone()),
            exits: ExitManager::new(RiskEngine::new(constraints)),
            gtt: GttManager::new(broker, notifier),
            classifier: TrendClassifier::default(),
            store,
            settings,
            universe,
            shortlist: Vec::new(),
            sector_flows,
        })
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn shortlist(&self) -> &[String] {
        &self.shortlist
    }

    pub async fn run_phase(&mut self, phase: Phase) {
        match phase {
            Phase::Screening => self.run_screening().await,
            Phase::SignalGeneration => self.generate_signals().await,
            Phase::Monitoring => self.run_monitoring().await,
            Phase::Reporting => self.generate_reports().await,
        }
    }

    /// Fetch snapshots with per-symbol isolation; failed symbols are
    /// dropped from the batch
    async fn fetch_snapshots(&self, symbols: &[String]) -> Vec<SymbolSnapshot> {
        let mut snapshots = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.data.fetch_snapshot(symbol, HISTORY_DAYS).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, "snapshot fetch failed, skipping: {e}");
                }
            }
        }
        snapshots
    }

    /// Pre-market screening: institutional flow filter over the universe
    pub async fn run_screening(&mut self) {
        tracing::info!(universe = self.universe.len(), "screening phase start");

        let universe = self.universe.clone();
        let snapshots = self.fetch_snapshots(&universe).await;
        let shortlist = self.screener.screen(snapshots);
        self.shortlist = shortlist.iter().map(|s| s.symbol.clone()).collect();

        self.notifier
            .send_message(&format!(
                "Screening done: {} of {} symbols shortlisted",
                self.shortlist.len(),
                self.universe.len()
            ))
            .await;
    }

    /// Market-open phase: run strategies, aggregate, size, and place
    /// bracket orders for symbols that clear every gate
    pub async fn generate_signals(&mut self) {
        tracing::info!(shortlist = self.shortlist.len(), "signal phase start");
        self.refresh_sector_flows().await;

        let shortlist = self.shortlist.clone();
        let snapshots = self.fetch_snapshots(&shortlist).await;
        let by_symbol: BTreeMap<String, &SymbolSnapshot> = snapshots
            .iter()
            .map(|s| (s.symbol.clone(), s))
            .collect();

        let batches = self.router.generate_signals(&snapshots);
        let aggregated = SignalAggregator::aggregate_signals(&batches);

        for (symbol, agg) in &aggregated {
            if self.store.is_active(symbol) {
                tracing::debug!(symbol = %symbol, "already holding, skipping");
                continue;
            }
            let Some(snapshot) = by_symbol.get(symbol) else {
                continue;
            };

            // First tradeable signal whose levels clear the risk gates
            let chosen = agg.signals.iter().find(|signal| {
                signal
                    .levels
                    .map(|levels| self.risk.validate_trade(snapshot, &levels))
                    .unwrap_or(false)
            });
            let Some(signal) = chosen else {
                tracing::debug!(symbol = %symbol, "no tradeable signal survived the gates");
                continue;
            };

            if let Err(e) = self
                .execute_entry(symbol, signal, snapshot, agg.composite_score)
                .await
            {
                tracing::warn!(symbol = %symbol, "entry failed, continuing: {e}");
            }
        }

        self.persist();
    }

    /// Push the day's sector ETF flows into the hedge detector's table.
    /// A failed fetch keeps the previous table rather than clearing it.
    async fn refresh_sector_flows(&self) {
        match self.data.fetch_sector_flows().await {
            Ok(flows) => {
                if let Ok(mut table) = self.sector_flows.write() {
                    *table = flows;
                }
            }
            Err(e) => {
                tracing::warn!("sector flow fetch failed, keeping last table: {e}");
            }
        }
    }

    async fn execute_entry(
        &mut self,
        symbol: &str,
        signal: &Signal,
        snapshot: &SymbolSnapshot,
        composite_score: f64,
    ) -> anyhow::Result<()> {
        let levels = signal
            .levels
            .ok_or_else(|| anyhow::anyhow!("signal has no levels"))?;

        let trend = self.classifier.classify(snapshot);
        let allocation = WeightAllocator::allocate(symbol, trend, composite_score);
        if allocation.weight <= 0.0 {
            return Ok(());
        }

        let capital = self.settings.portfolio_value.0 * allocation.weight;
        let quantity = self
            .risk
            .calculate_position_size(levels.entry, levels.sl, capital)?;
        if quantity == 0 {
            tracing::debug!(symbol, "allocation too small for one share");
            return Ok(());
        }

        let order = BracketOrderRequest {
            symbol: symbol.to_string(),
            quantity,
            direction: signal.direction,
            entry: levels.entry,
            stop_loss: levels.sl,
            target: levels.target,
        };
        let order_id = self.broker.place_bracket_order(&order).await?;

        let mut position = Position::new(
            symbol,
            levels.entry,
            quantity,
            levels.sl,
            levels.target,
            order_id,
        );
        position.direction = signal.direction;
        self.store.enter(position)?;

        self.notifier
            .send_message(&format!(
                "Entered {symbol} ({}, {trend}): {} @ {:.2}, SL {:.2}, target {:.2}",
                signal.reason, quantity, levels.entry, levels.sl, levels.target
            ))
            .await;
        Ok(())
    }

    /// Intraday monitoring: refresh prices, run exits, then maintain GTT
    /// brackets on whatever is still open
    pub async fn run_monitoring(&mut self) {
        let held = self.store.symbols();
        if held.is_empty() {
            tracing::debug!("monitoring: no open positions");
            return;
        }
        tracing::info!(positions = held.len(), "monitoring phase start");

        let snapshots: BTreeMap<String, SymbolSnapshot> = self
            .fetch_snapshots(&held)
            .await
            .into_iter()
            .map(|s| (s.symbol.clone(), s))
            .collect();

        for (symbol, snapshot) in &snapshots {
            if let Some(price) = snapshot.last_close() {
                self.store.update_price(symbol, price);
            }
        }

        for instruction in self.exits.evaluate_exits(&self.store, &snapshots) {
            let Some(order_id) = self
                .store
                .get(&instruction.symbol)
                .map(|p| p.order_id.clone())
            else {
                continue;
            };
            match self.broker.cancel_bracket_order(&order_id).await {
                Ok(()) | Err(crate::error::BrokerError::UnknownOrder(_)) => {
                    if let Some(closed) = self.store.exit(&instruction.symbol) {
                        self.notifier
                            .send_message(&format!(
                                "Exited {} ({}): {:.2}% on {} shares",
                                closed.symbol,
                                instruction.reason,
                                closed.pnl_pct() * 100.0,
                                closed.quantity
                            ))
                            .await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %instruction.symbol,
                        "cancel failed, keeping position under its live bracket: {e}"
                    );
                }
            }
        }

        self.gtt.refresh_all(&mut self.store, &snapshots).await;
        self.persist();
    }

    /// End-of-day summary to every configured recipient
    pub async fn generate_reports(&self) {
        let mut body = format!("Open positions: {}\n", self.store.len());
        for position in self.store.iter() {
            body.push_str(&format!(
                "{}: {} @ {:.2}, last {:.2}, pnl {:+.2}%\n",
                position.symbol,
                position.quantity,
                position.entry_price,
                position.last_price,
                position.pnl_pct() * 100.0
            ));
        }

        if self.settings.email.recipients.is_empty() {
            self.notifier.send_message(&body).await;
        } else {
            for recipient in &self.settings.email.recipients {
                self.notifier.send(recipient, "Daily swing report", &body).await;
            }
        }
    }

    fn persist(&self) {
        if let Some(path) = self.settings.positions_file.as_deref() {
            if let Err(e) = self.store.save_to(&PathBuf::from(path)) {
                tracing::warn!("position snapshot write failed: {e}");
            }
        }
    }
}
