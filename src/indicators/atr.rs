//! Average True Range (ATR)
//!
//! Measures volatility as the average of true ranges over a period, where
//! True Range is the greatest of:
//! - Current High - Current Low
//! - Abs(Current High - Previous Close)
//! - Abs(Current Low - Previous Close)
//!
//! Uses Wilder's smoothing.

use crate::models::Candle;

/// Calculate ATR for the given candles.
///
/// Returns the current ATR value, or None if insufficient data.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 || period == 0 {
        return None;
    }

    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    for i in 1..candles.len() {
        let high = candles[i].high;
        let low = candles[i].low;
        let prev_close = candles[i - 1].close;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        true_ranges.push(tr);
    }

    if true_ranges.len() < period {
        return None;
    }

    // First ATR is a simple average, then Wilder's smoothing
    let mut atr: f64 = true_ranges.iter().take(period).sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }

    Some(atr)
}
