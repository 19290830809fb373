use super::{Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::indicators::{calculate_bollinger, calculate_rsi};
use crate::models::{Direction, Signal, SignalReason, SymbolSnapshot};

/// Bollinger + RSI mean reversion: fade closes outside the bands when RSI
/// confirms the extreme, targeting the middle band.
pub struct MeanReversionStrategy {
    pub bb_period: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self {
            bb_period: 20,
            rsi_period: 14,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
        }
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Quant
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let closes = snapshot.closes();

        let Some(bands) = calculate_bollinger(&closes, self.bb_period, 2.0) else {
            return Ok(None);
        };
        let Some(rsi) = calculate_rsi(&closes, self.rsi_period) else {
            return Ok(None);
        };
        let Some(&close) = closes.last() else {
            return Ok(None);
        };

        if close < bands.lower && rsi < self.rsi_oversold {
            let signal = Signal::tradeable(
                7.0,
                SignalReason::MeanReversion,
                Direction::Long,
                close,
                close * 0.96,
                bands.middle,
                2,
            )
            .map_err(|e| StrategyError::MalformedInput {
                strategy: "mean_reversion",
                detail: e.to_string(),
            })?;
            return Ok(Some(signal));
        }

        if close > bands.upper && rsi > self.rsi_overbought {
            let signal = Signal::tradeable(
                6.0,
                SignalReason::MeanReversion,
                Direction::Short,
                close,
                close * 1.04,
                bands.middle,
                2,
            )
            .map_err(|e| StrategyError::MalformedInput {
                strategy: "mean_reversion",
                detail: e.to_string(),
            })?;
            return Ok(Some(signal));
        }

        Ok(None)
    }
}
