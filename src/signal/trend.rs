use crate::indicators::calculate_sma;
use crate::models::{SymbolSnapshot, TrendType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaStatus {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Structure {
    HigherHighs,
    LowerLows,
    Mixed,
}

/// Classifies the composite trend for position weighting.
///
/// Three confirmations: SMA 20/50 relationship held over the last
/// `confirmation_bars`, price structure (higher highs vs lower lows), and
/// volume backing any move larger than 5% over the trend window. Anything
/// unconfirmed is treated as consolidation.
pub struct TrendClassifier {
    pub trend_window: usize,
    pub confirmation_bars: usize,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self {
            trend_window: 20,
            confirmation_bars: 3,
        }
    }
}

impl TrendClassifier {
    pub fn classify(&self, snapshot: &SymbolSnapshot) -> TrendType {
        let closes = snapshot.closes();
        let volumes = snapshot.volumes();

        let ma = self.ma_analysis(&closes);
        let structure = Self::price_structure(&closes);
        let volume_ok = self.volume_confirmation(&closes, &volumes);

        match (ma, structure, volume_ok) {
            (MaStatus::Up, Structure::HigherHighs, true) => TrendType::Uptrend,
            (MaStatus::Down, Structure::LowerLows, true) => TrendType::Downtrend,
            _ => TrendType::Consolidation,
        }
    }

    /// SMA 20/50 relationship, held for each of the confirmation bars
    fn ma_analysis(&self, closes: &[f64]) -> MaStatus {
        let mut above = 0;
        let mut below = 0;

        for back in 0..self.confirmation_bars {
            if closes.len() < back + 50 {
                return MaStatus::Flat;
            }
            let window = &closes[..closes.len() - back];
            let (Some(sma20), Some(sma50)) =
                (calculate_sma(window, 20), calculate_sma(window, 50))
            else {
                return MaStatus::Flat;
            };
            if sma20 > sma50 {
                above += 1;
            } else if sma20 < sma50 {
                below += 1;
            }
        }

        if above == self.confirmation_bars {
            MaStatus::Up
        } else if below == self.confirmation_bars {
            MaStatus::Down
        } else {
            MaStatus::Flat
        }
    }

    /// Local peak/trough comparison for HH/HL vs LH/LL structure
    fn price_structure(closes: &[f64]) -> Structure {
        let mut peaks = Vec::new();
        let mut troughs = Vec::new();

        for i in 1..closes.len().saturating_sub(1) {
            if closes[i] > closes[i - 1] && closes[i] > closes[i + 1] {
                peaks.push(closes[i]);
            } else if closes[i] < closes[i - 1] && closes[i] < closes[i + 1] {
                troughs.push(closes[i]);
            }
        }

        if peaks.len() >= 2 && peaks[peaks.len() - 1] > peaks[peaks.len() - 2] {
            Structure::HigherHighs
        } else if troughs.len() >= 2 && troughs[troughs.len() - 1] < troughs[troughs.len() - 2] {
            Structure::LowerLows
        } else {
            Structure::Mixed
        }
    }

    /// A >5% move over the trend window needs a 20% volume pickup;
    /// smaller moves pass unconditionally
    fn volume_confirmation(&self, closes: &[f64], volumes: &[f64]) -> bool {
        if closes.len() < self.trend_window + 1 || volumes.len() < self.trend_window + 1 {
            return false;
        }

        let base = closes[closes.len() - 1 - self.trend_window];
        if base == 0.0 {
            return false;
        }
        let price_change = closes[closes.len() - 1] / base - 1.0;

        if price_change.abs() <= 0.05 {
            return true;
        }

        let window = &volumes[volumes.len() - 1 - self.trend_window..volumes.len() - 1];
        let mean: f64 = window.iter().sum::<f64>() / window.len() as f64;
        if mean == 0.0 {
            return false;
        }
        volumes[volumes.len() - 1] / mean > 1.2
    }
}
