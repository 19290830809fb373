use super::moving_average::ema_series;

/// MACD line series (EMA12 - EMA26), aligned most-recent last.
///
/// Only the line is computed; the trend-momentum strategy compares the
/// latest value against the value five bars back, so the signal line and
/// histogram are not needed.
pub fn macd_line_series(prices: &[f64], fast: usize, slow: usize) -> Option<Vec<f64>> {
    if fast >= slow {
        return None;
    }

    let fast_series = ema_series(prices, fast)?;
    let slow_series = ema_series(prices, slow)?;

    // Both series end at the last price; align from the back.
    let len = slow_series.len();
    let fast_tail = &fast_series[fast_series.len() - len..];

    Some(
        fast_tail
            .iter()
            .zip(slow_series.iter())
            .map(|(f, s)| f - s)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_positive_in_uptrend() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let macd = macd_line_series(&prices, 12, 26).unwrap();
        assert!(*macd.last().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_rising_when_trend_accelerates() {
        let mut prices: Vec<f64> = (0..40).map(|_| 100.0).collect();
        prices.extend((0..20).map(|i| 100.0 + (i as f64) * 2.0));
        let macd = macd_line_series(&prices, 12, 26).unwrap();
        let n = macd.len();
        assert!(macd[n - 1] > macd[n - 6]);
    }

    #[test]
    fn test_macd_insufficient_data() {
        let prices = vec![100.0; 10];
        assert!(macd_line_series(&prices, 12, 26).is_none());
    }
}
