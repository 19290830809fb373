use super::{Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::models::{Direction, Signal, SignalReason, SymbolSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WyckoffPhase {
    Accumulation,
    Distribution,
    Neutral,
}

#[derive(Debug, Clone, Copy)]
pub struct WyckoffReading {
    pub phase: WyckoffPhase,
    pub score: f64,
    pub support: f64,
    pub resistance: f64,
}

/// Simplified Wyckoff phase detection over a 30-bar window.
///
/// The support/resistance band is the min/max of the last `band` closes;
/// accumulation requires the last close above the band midpoint with the
/// last bar's volume exceeding the recent 5-bar mean.
#[derive(Debug, Clone)]
pub struct WyckoffAnalyzer {
    pub window: usize,
    pub band: usize,
}

impl Default for WyckoffAnalyzer {
    fn default() -> Self {
        Self { window: 30, band: 10 }
    }
}

impl WyckoffAnalyzer {
    pub fn detect(&self, closes: &[f64], volumes: &[f64]) -> Option<WyckoffReading> {
        if closes.len() < self.window || volumes.len() < self.window {
            return None;
        }

        let closes = &closes[closes.len() - self.window..];
        let volumes = &volumes[volumes.len() - self.window..];

        let band = &closes[closes.len() - self.band..];
        let support = band.iter().copied().fold(f64::INFINITY, f64::min);
        let resistance = band.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let last_close = *closes.last()?;
        let midpoint = (support + resistance) / 2.0;

        let recent_vol = &volumes[volumes.len() - 5..];
        let mean_recent_vol = recent_vol.iter().sum::<f64>() / recent_vol.len() as f64;
        let last_volume = *volumes.last()?;

        let (phase, score) = if last_close > midpoint && last_volume > mean_recent_vol {
            (WyckoffPhase::Accumulation, 8.0)
        } else if last_close < midpoint {
            (WyckoffPhase::Distribution, 4.0)
        } else {
            (WyckoffPhase::Neutral, 5.0)
        };

        Some(WyckoffReading {
            phase,
            score,
            support,
            resistance,
        })
    }
}

/// Long setups off accumulation phases: buy just under resistance, stop
/// just under support, target 10% above resistance.
#[derive(Default)]
pub struct WyckoffAccumulationStrategy {
    analyzer: WyckoffAnalyzer,
}

impl WyckoffAccumulationStrategy {
    /// Levels derived from a support/resistance band
    pub fn levels_for(support: f64, resistance: f64) -> (f64, f64, f64) {
        (resistance * 0.99, support * 0.98, resistance * 1.1)
    }
}

impl Strategy for WyckoffAccumulationStrategy {
    fn name(&self) -> &'static str {
        "wyckoff_accumulation"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Wyckoff
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let Some(reading) = self
            .analyzer
            .detect(&snapshot.closes(), &snapshot.volumes())
        else {
            return Ok(None);
        };

        if reading.phase != WyckoffPhase::Accumulation {
            return Ok(None);
        }

        let (entry, sl, target) = Self::levels_for(reading.support, reading.resistance);
        let signal = Signal::tradeable(
            reading.score,
            SignalReason::WyckoffAccumulation,
            Direction::Long,
            entry,
            sl,
            target,
            3,
        )
        .map_err(|e| StrategyError::MalformedInput {
            strategy: "wyckoff_accumulation",
            detail: e.to_string(),
        })?;

        Ok(Some(signal))
    }
}

/// Short setups off distribution phases: sell just above support, stop
/// above resistance, target 6% below support.
#[derive(Default)]
pub struct WyckoffDistributionStrategy {
    analyzer: WyckoffAnalyzer,
}

impl Strategy for WyckoffDistributionStrategy {
    fn name(&self) -> &'static str {
        "wyckoff_distribution"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Wyckoff
    }

    fn analyze(&self, snapshot: &SymbolSnapshot) -> Result<Option<Signal>, StrategyError> {
        let Some(reading) = self
            .analyzer
            .detect(&snapshot.closes(), &snapshot.volumes())
        else {
            return Ok(None);
        };

        if reading.phase != WyckoffPhase::Distribution {
            return Ok(None);
        }

        let signal = Signal::tradeable(
            reading.score,
            SignalReason::WyckoffDistribution,
            Direction::Short,
            reading.support * 1.01,
            reading.resistance * 1.02,
            reading.support * 0.94,
            3,
        )
        .map_err(|e| StrategyError::MalformedInput {
            strategy: "wyckoff_distribution",
            detail: e.to_string(),
        })?;

        Ok(Some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Candle;

    fn snapshot(closes: Vec<f64>, volumes: Vec<f64>) -> SymbolSnapshot {
        let mut snap = SymbolSnapshot::new("TEST");
        snap.candles = closes
            .iter()
            .zip(volumes.iter())
            .enumerate()
            .map(|(i, (&close, &volume))| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc::now() - chrono::Duration::days((closes.len() - i) as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume,
            })
            .collect();
        snap
    }

    #[test]
    fn test_rising_series_with_volume_spike_is_accumulation() {
        // Monotonically rising closes, last bar volume 2x the 5-bar mean
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let mut volumes = vec![1000.0; 30];
        volumes[29] = 2500.0; // 5-bar mean = (4*1000 + 2500)/5 = 1300

        let reading = WyckoffAnalyzer::default()
            .detect(&closes, &volumes)
            .unwrap();
        assert_eq!(reading.phase, WyckoffPhase::Accumulation);
        assert_eq!(reading.score, 8.0);
    }

    #[test]
    fn test_falling_series_is_distribution() {
        let closes: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
        let volumes = vec![1000.0; 30];

        let reading = WyckoffAnalyzer::default()
            .detect(&closes, &volumes)
            .unwrap();
        assert_eq!(reading.phase, WyckoffPhase::Distribution);
        assert_eq!(reading.score, 4.0);
    }

    #[test]
    fn test_insufficient_data() {
        let closes = vec![100.0; 10];
        let volumes = vec![1000.0; 10];
        assert!(WyckoffAnalyzer::default().detect(&closes, &volumes).is_none());
    }

    #[test]
    fn test_accumulation_levels() {
        // support=90, resistance=110 must yield 108.9 / 88.2 / 121.0
        let (entry, sl, target) = WyckoffAccumulationStrategy::levels_for(90.0, 110.0);
        assert!((entry - 108.9).abs() < 1e-9);
        assert!((sl - 88.2).abs() < 1e-9);
        assert!((target - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_accumulation_strategy_signal() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let mut volumes = vec![1000.0; 30];
        volumes[29] = 2500.0;

        let snap = snapshot(closes, volumes);
        let signal = WyckoffAccumulationStrategy::default()
            .analyze(&snap)
            .unwrap()
            .expect("signal");

        assert_eq!(signal.reason, SignalReason::WyckoffAccumulation);
        assert_eq!(signal.score, 8.0);
        assert!(signal.levels.is_some());
    }

    #[test]
    fn test_distribution_strategy_signal_is_short() {
        let closes: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
        let volumes = vec![1000.0; 30];

        let snap = snapshot(closes, volumes);
        let signal = WyckoffDistributionStrategy::default()
            .analyze(&snap)
            .unwrap()
            .expect("signal");

        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.score, 4.0);
        let levels = signal.levels.unwrap();
        assert!(levels.target < levels.entry && levels.entry < levels.sl);
    }
}
