use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Direction;

/// An open swing position tracked against a live broker bracket order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: u64,
    pub direction: Direction,
    /// Current broker-side stop-loss trigger
    pub stop_loss: f64,
    /// Current broker-side target trigger
    pub target: f64,
    /// Stop distance as a fraction of entry
    pub sl_pct: f64,
    /// Target distance as a fraction of entry
    pub target_pct: f64,
    pub last_price: f64,
    /// Opaque id of the live bracket order at the broker
    pub order_id: String,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        entry_price: f64,
        quantity: u64,
        stop_loss: f64,
        target: f64,
        order_id: impl Into<String>,
    ) -> Self {
        let sl_pct = if entry_price > 0.0 {
            (entry_price - stop_loss).abs() / entry_price
        } else {
            0.0
        };
        let target_pct = if entry_price > 0.0 {
            (target - entry_price).abs() / entry_price
        } else {
            0.0
        };

        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            entry_price,
            quantity,
            direction: Direction::Long,
            stop_loss,
            target,
            sl_pct,
            target_pct,
            last_price: entry_price,
            order_id: order_id.into(),
            opened_at: Utc::now(),
        }
    }

    /// Unrealized PnL as a signed fraction of entry (long convention)
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let raw = (self.last_price - self.entry_price) / self.entry_price;
        match self.direction {
            Direction::Long => raw,
            Direction::Short => -raw,
        }
    }
}

/// Symbol-keyed store of open positions, owned by the orchestrator and
/// passed by reference into the exit and GTT managers. Replaces any notion
/// of ambient global position state.
#[derive(Debug, Default)]
pub struct PositionStore {
    positions: BTreeMap<String, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new position. Fails if the symbol is already held.
    pub fn enter(&mut self, position: Position) -> anyhow::Result<()> {
        if self.positions.contains_key(&position.symbol) {
            anyhow::bail!("already holding {}", position.symbol);
        }
        tracing::info!(
            symbol = %position.symbol,
            entry = position.entry_price,
            quantity = position.quantity,
            order_id = %position.order_id,
            "entered position"
        );
        self.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    /// Remove and return the position for a symbol
    pub fn exit(&mut self, symbol: &str) -> Option<Position> {
        let removed = self.positions.remove(symbol);
        if let Some(p) = &removed {
            tracing::info!(symbol = %p.symbol, "exited position");
        }
        removed
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    pub fn is_active(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn update_price(&mut self, symbol: &str, price: f64) {
        if let Some(p) = self.positions.get_mut(symbol) {
            p.last_price = price;
        }
    }

    /// Held symbols in sorted order
    pub fn symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Write all positions to a JSON snapshot so a restart keeps
    /// open-position awareness
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let positions: Vec<&Position> = self.positions.values().collect();
        let json = serde_json::to_string_pretty(&positions)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load positions from a JSON snapshot; a missing file yields an
    /// empty store
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let positions: Vec<Position> = serde_json::from_str(&json)?;

        let mut store = Self::new();
        for position in positions {
            store.positions.insert(position.symbol.clone(), position);
        }
        tracing::info!("restored {} positions from {}", store.len(), path.display());
        Ok(store)
    }
}
