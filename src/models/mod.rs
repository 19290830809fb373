use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// OHLCV candlestick data, daily bars, most-recent last
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// FII/DII institutional flow metrics for one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowMetrics {
    /// FII net cash flow (positive = buying)
    pub fii_net: f64,
    /// DII net cash flow
    pub dii_net: f64,
    /// FII net flow in the cash segment
    pub net_cash: f64,
    /// FII net flow in the F&O segment
    pub net_fno: f64,
    /// 3-day cumulative net flow
    pub net_3day: f64,
    /// Delivery percentage of traded volume
    pub delivery_pct: f64,
    /// 3-day average delivery ratio vs baseline
    pub delivery_3day_avg: f64,
    /// Estimated hedged portion of delivery
    pub hedge_pct: f64,
}

/// A reported bulk/block deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDeal {
    pub symbol: String,
    pub quantity: u64,
    pub price: f64,
    /// "BUY" or "SELL" as published by the exchange
    pub side: String,
}

/// Open-interest change metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OiMetrics {
    /// Index (Nifty) OI percentage change
    pub nifty_oi_pct_change: f64,
    /// Symbol-level OI percentage change
    pub oi_pct_change: f64,
}

/// Immutable per-cycle view of everything known about one symbol.
///
/// Owned by the orchestrator; strategies receive a read-only reference.
#[derive(Debug, Clone, Default)]
pub struct SymbolSnapshot {
    pub symbol: String,
    /// Ordered bars, most-recent last
    pub candles: Vec<Candle>,
    pub flows: FlowMetrics,
    pub oi: OiMetrics,
}

impl SymbolSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Latest close, if any bars exist
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Close series in bar order
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Volume series in bar order
    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Average volume across all bars; None when empty
    pub fn avg_volume(&self) -> Option<f64> {
        if self.candles.is_empty() {
            return None;
        }
        Some(self.candles.iter().map(|c| c.volume).sum::<f64>() / self.candles.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

/// Why a strategy produced its signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    StrongInstitutionalInflow,
    FiiSelling,
    PureAccumulation,
    HedgedFlow,
    HighDeliveryVolume,
    LowDeliveryVolume,
    WyckoffAccumulation,
    WyckoffDistribution,
    MeanReversion,
    TrendMomentum,
}

impl SignalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalReason::StrongInstitutionalInflow => "strong_institutional_inflow",
            SignalReason::FiiSelling => "fii_selling",
            SignalReason::PureAccumulation => "pure_accumulation",
            SignalReason::HedgedFlow => "hedged_flow",
            SignalReason::HighDeliveryVolume => "high_delivery_volume",
            SignalReason::LowDeliveryVolume => "low_delivery_volume",
            SignalReason::WyckoffAccumulation => "wyckoff_accumulation",
            SignalReason::WyckoffDistribution => "wyckoff_distribution",
            SignalReason::MeanReversion => "mean_reversion",
            SignalReason::TrendMomentum => "trend_momentum",
        }
    }
}

impl std::fmt::Display for SignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry/stop/target price levels for a tradeable signal.
///
/// Ordering is validated at construction: for a long trade
/// `sl < entry < target`, for a short trade `target < entry < sl`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub sl: f64,
    pub target: f64,
}

impl TradeLevels {
    pub fn new(
        direction: Direction,
        entry: f64,
        sl: f64,
        target: f64,
    ) -> Result<Self, SignalError> {
        let ordered = match direction {
            Direction::Long => sl < entry && entry < target,
            Direction::Short => target < entry && entry < sl,
        };
        if !ordered {
            return Err(SignalError::InvalidLevels {
                direction,
                entry,
                sl,
                target,
            });
        }
        Ok(Self { entry, sl, target })
    }
}

/// A single strategy's verdict on one symbol.
///
/// `levels == None` means advisory only: the score contributes to the
/// composite but no trade is placed from this signal alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Confidence, 0-10 continuous
    pub score: f64,
    pub reason: SignalReason,
    pub direction: Direction,
    pub levels: Option<TradeLevels>,
    /// Signal weight inside its strategy slot (hedge discounts halve it)
    pub weight: f64,
    pub validity_days: u32,
}

impl Signal {
    /// Advisory signal without trade levels
    pub fn advisory(score: f64, reason: SignalReason, validity_days: u32) -> Self {
        Self {
            score,
            reason,
            direction: Direction::Long,
            levels: None,
            weight: 1.0,
            validity_days,
        }
    }

    /// Tradeable signal; fails if the level ordering is inconsistent
    /// with the direction.
    pub fn tradeable(
        score: f64,
        reason: SignalReason,
        direction: Direction,
        entry: f64,
        sl: f64,
        target: f64,
        validity_days: u32,
    ) -> Result<Self, SignalError> {
        let levels = TradeLevels::new(direction, entry, sl, target)?;
        Ok(Self {
            score,
            reason,
            direction,
            levels: Some(levels),
            weight: 1.0,
            validity_days,
        })
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Composite of all strategy signals for one symbol
#[derive(Debug, Clone)]
pub struct AggregatedSignal {
    /// Sum of strategy-weight x signal-score over contributing strategies
    pub composite_score: f64,
    /// Underlying signals in strategy registration order
    pub signals: Vec<Signal>,
}

/// Hedge classification for an apparent institutional buy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HedgeFlags {
    pub index_hedge: bool,
    pub sector_hedge: bool,
    pub pair_trade: bool,
}

impl HedgeFlags {
    /// True when any hedge pattern was detected
    pub fn any(&self) -> bool {
        self.index_hedge || self.sector_hedge || self.pair_trade
    }
}

/// Composite trend classification used for position weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendType {
    Uptrend,
    Downtrend,
    Consolidation,
}

impl std::str::FromStr for TrendType {
    type Err = crate::error::RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uptrend" => Ok(TrendType::Uptrend),
            "downtrend" => Ok(TrendType::Downtrend),
            "consolidation" => Ok(TrendType::Consolidation),
            other => Err(crate::error::RiskError::UnknownTrendType(other.to_string())),
        }
    }
}

impl std::fmt::Display for TrendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendType::Uptrend => "uptrend",
            TrendType::Downtrend => "downtrend",
            TrendType::Consolidation => "consolidation",
        };
        f.write_str(s)
    }
}

/// Market-cap tier used for institutional screening thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapTier {
    Large,
    Mid,
    Small,
}

/// Position weight derived from trend classification and composite score
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAllocation {
    pub symbol: String,
    /// Capital fraction, clamped to [0, 1]
    pub weight: f64,
    pub trend: TrendType,
    pub sl_multiplier: f64,
}
