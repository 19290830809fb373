use super::{Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::indicators::{calculate_rsi, calculate_sma, macd_line_series};
use crate::models::{Direction, Signal, SignalReason, SymbolSnapshot};

/// SMA 20/50 cross with RSI and MACD-slope confirmation. Longs ride an
/// established uptrend toward +8%; the symmetric short variant targets -8%.
pub struct TrendMomentumStrategy {
    pub short_period: usize,
    pub long_period: usize,
    pub rsi_period: usize,
}

impl Default for TrendMomentumStrategy {
    fn default() -> Self {
        Self {
            short_period: 20,
            long_period: 50,
            rsi_period: 14,
        }
    }
}

impl Strategy for TrendMomentumStrategy {
    fn name(&self) -> &'static str {
        "trend_momentum"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Quant
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let all_closes = snapshot.closes();
        if all_closes.len() < self.long_period {
            return Ok(None);
        }
        let closes = &all_closes[all_closes.len() - self.long_period..];

        let (Some(sma_short), Some(sma_long), Some(rsi), Some(macd)) = (
            calculate_sma(closes, self.short_period),
            calculate_sma(closes, self.long_period),
            calculate_rsi(closes, self.rsi_period),
            macd_line_series(closes, 12, 26),
        ) else {
            return Ok(None);
        };

        if macd.len() < 5 {
            return Ok(None);
        }
        let macd_now = macd[macd.len() - 1];
        let macd_then = macd[macd.len() - 5];

        let close = closes[closes.len() - 1];
        // Stop hugs the short-SMA lookback, whatever it is configured to
        let recent = &closes[closes.len() - self.short_period..];

        if sma_short > sma_long && rsi > 50.0 && macd_now > macd_then {
            let sl = recent.iter().copied().fold(f64::INFINITY, f64::min);
            if sl >= close {
                return Ok(None);
            }
            let signal = Signal::tradeable(
                7.0,
                SignalReason::TrendMomentum,
                Direction::Long,
                close,
                sl,
                close * 1.08,
                3,
            )
            .map_err(|e| StrategyError::MalformedInput {
                strategy: "trend_momentum",
                detail: e.to_string(),
            })?;
            return Ok(Some(signal));
        }

        if sma_short < sma_long && rsi < 50.0 && macd_now < macd_then {
            let sl = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if sl <= close {
                return Ok(None);
            }
            let signal = Signal::tradeable(
                6.0,
                SignalReason::TrendMomentum,
                Direction::Short,
                close,
                sl,
                close * 0.92,
                3,
            )
            .map_err(|e| StrategyError::MalformedInput {
                strategy: "trend_momentum",
                detail: e.to_string(),
            })?;
            return Ok(Some(signal));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Candle;

    fn snapshot(closes: Vec<f64>) -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("TEST");
        snap.candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc::now() - chrono::Duration::days((closes.len() - i) as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1e6,
            })
            .collect();
        snap
    }

    #[test]
    fn test_accelerating_uptrend_generates_long() {
        // Accelerating ramp keeps the MACD line rising; a perfectly linear
        // ramp converges to a constant MACD and would not confirm
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 0.05 * (i * i) as f64).collect();
        let last_close = *closes.last().unwrap();
        let signal = TrendMomentumStrategy::default()
            .analyze(&snapshot(closes.clone()))
            .unwrap()
            .expect("signal");

        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.score, 7.0);

        let levels = signal.levels.unwrap();
        assert_eq!(levels.entry, last_close);
        // Stop at the 20-bar low
        assert_eq!(levels.sl, closes[closes.len() - 20]);
        assert!((levels.target - last_close * 1.08).abs() < 1e-9);
    }

    #[test]
    fn test_accelerating_downtrend_generates_short() {
        let closes: Vec<f64> = (0..60).map(|i| 300.0 - 0.05 * (i * i) as f64).collect();
        let signal = TrendMomentumStrategy::default()
            .analyze(&snapshot(closes.clone()))
            .unwrap()
            .expect("signal");

        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.score, 6.0);

        let levels = signal.levels.unwrap();
        // Stop at the 20-bar high
        assert_eq!(levels.sl, closes[closes.len() - 20]);
        assert!(levels.target < levels.entry);
    }

    #[test]
    fn test_stop_lookback_follows_short_period() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 0.05 * (i * i) as f64).collect();
        let strategy = TrendMomentumStrategy {
            short_period: 10,
            long_period: 50,
            rsi_period: 14,
        };
        let signal = strategy
            .analyze(&snapshot(closes.clone()))
            .unwrap()
            .expect("signal");

        // Stop at the 10-bar low, not the default 20
        let levels = signal.levels.unwrap();
        assert_eq!(levels.sl, closes[closes.len() - 10]);
    }

    #[test]
    fn test_sideways_abstains() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i % 2) as f64).collect();
        assert!(TrendMomentumStrategy::default()
            .analyze(&snapshot(closes))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_insufficient_data_abstains() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert!(TrendMomentumStrategy::default()
            .analyze(&snapshot(closes))
            .unwrap()
            .is_none());
    }
}
