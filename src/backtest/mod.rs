use crate::models::Candle;
use crate::strategy::wyckoff::{WyckoffAccumulationStrategy, WyckoffAnalyzer, WyckoffPhase};

/// How a simulated trade closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestExit {
    StopLoss,
    Target,
}

/// One completed simulated trade
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry: f64,
    pub exit_price: f64,
    pub exit: BacktestExit,
    pub pnl_pct: f64,
}

/// Replays Wyckoff accumulation setups over historical bars.
///
/// A setup only becomes a trade when a later bar's high touches the
/// entry. The exit scan runs from the entry bar onward; when stop and
/// target are both touched inside one bar the stop wins. Setups whose
/// exit never triggers in the remaining data produce no record.
pub struct WyckoffBacktester {
    analyzer: WyckoffAnalyzer,
}

impl Default for WyckoffBacktester {
    fn default() -> Self {
        Self {
            analyzer: WyckoffAnalyzer::default(),
        }
    }
}

impl WyckoffBacktester {
    pub fn run(&self, symbol: &str, candles: &[Candle]) -> Vec<TradeRecord> {
        let mut trades = Vec::new();
        let window = self.analyzer.window;
        if candles.len() < window {
            return trades;
        }

        let mut i = window;
        'setups: while i <= candles.len() {
            let bars = &candles[i - window..i];
            let closes: Vec<f64> = bars.iter().map(|c| c.close).collect();
            let volumes: Vec<f64> = bars.iter().map(|c| c.volume).collect();

            let reading = match self.analyzer.detect(&closes, &volumes) {
                Some(r) if r.phase == WyckoffPhase::Accumulation => r,
                _ => {
                    i += 1;
                    continue;
                }
            };
            let (entry, sl, target) =
                WyckoffAccumulationStrategy::levels_for(reading.support, reading.resistance);

            let entry_index = candles
                .iter()
                .enumerate()
                .skip(i)
                .find(|(_, bar)| bar.high >= entry)
                .map(|(j, _)| j);
            let Some(entry_index) = entry_index else {
                i += 1;
                continue;
            };

            for (j, bar) in candles.iter().enumerate().skip(entry_index) {
                let exit = if bar.low <= sl {
                    Some((sl, BacktestExit::StopLoss))
                } else if bar.high >= target {
                    Some((target, BacktestExit::Target))
                } else {
                    None
                };

                if let Some((exit_price, exit)) = exit {
                    trades.push(TradeRecord {
                        symbol: symbol.to_string(),
                        entry_index,
                        exit_index: j,
                        entry,
                        exit_price,
                        exit,
                        pnl_pct: (exit_price - entry) / entry,
                    });
                    i = j + 1;
                    continue 'setups;
                }
            }

            // Entry filled but neither level touched before data ran out
            i += 1;
        }

        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(i: usize, close: f64, high: f64, low: f64, volume: f64) -> Candle {
        Candle {
            symbol: "TEST".to_string(),
            timestamp: Utc::now() - chrono::Duration::days(100 - i as i64),
            open: close,
            high,
            low,
            close,
            volume,
        }
    }

    /// 30 rising bars ending with a volume spike: accumulation with
    /// support 120, resistance 129 in the final 10-bar band, so the setup
    /// is entry 127.71, stop 117.6, target 141.9
    fn accumulation_base() -> Vec<Candle> {
        (0..30)
            .map(|i| {
                let close = 100.0 + i as f64;
                let volume = if i == 29 { 2500.0 } else { 1000.0 };
                bar(i, close, close + 0.5, close - 0.5, volume)
            })
            .collect()
    }

    #[test]
    fn test_stop_path_produces_one_trade_at_stop() {
        let mut candles = accumulation_base();
        candles.push(bar(30, 126.0, 128.0, 125.0, 1000.0)); // entry touch
        candles.push(bar(31, 116.0, 120.0, 115.0, 1000.0)); // stop touch

        let trades = WyckoffBacktester::default().run("TEST", &candles);
        assert_eq!(trades.len(), 1);

        let trade = &trades[0];
        assert_eq!(trade.entry_index, 30);
        assert_eq!(trade.exit_index, 31);
        assert_eq!(trade.exit, BacktestExit::StopLoss);
        assert!((trade.exit_price - 117.6).abs() < 1e-9);
        assert!(trade.pnl_pct < 0.0);
    }

    #[test]
    fn test_target_path() {
        let mut candles = accumulation_base();
        candles.push(bar(30, 126.0, 128.0, 125.0, 1000.0));
        candles.push(bar(31, 140.0, 142.5, 133.0, 1000.0)); // target touch

        let trades = WyckoffBacktester::default().run("TEST", &candles);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit, BacktestExit::Target);
        assert!((trades[0].exit_price - 141.9).abs() < 1e-9);
        assert!(trades[0].pnl_pct > 0.0);
    }

    #[test]
    fn test_stop_beats_target_within_one_bar() {
        let mut candles = accumulation_base();
        // One wild bar touches entry, target, and stop at once
        candles.push(bar(30, 130.0, 145.0, 110.0, 1000.0));

        let trades = WyckoffBacktester::default().run("TEST", &candles);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit, BacktestExit::StopLoss);
    }

    #[test]
    fn test_no_exit_touch_produces_no_row() {
        let mut candles = accumulation_base();
        candles.push(bar(30, 126.0, 128.0, 125.0, 1000.0)); // entry only

        let trades = WyckoffBacktester::default().run("TEST", &candles);
        assert!(trades.is_empty());
    }

    #[test]
    fn test_insufficient_history_is_empty() {
        let candles: Vec<Candle> = (0..10).map(|i| bar(i, 100.0, 101.0, 99.0, 1000.0)).collect();
        assert!(WyckoffBacktester::default().run("TEST", &candles).is_empty());
    }
}
