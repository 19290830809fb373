/// Calculate Simple Moving Average (SMA) over the trailing `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period || period == 0 {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA)
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    ema_series(prices, period).and_then(|s| s.last().copied())
}

/// EMA series aligned with the price series from index `period - 1` onward
pub fn ema_series(prices: &[f64], period: usize) -> Option<Vec<f64>> {
    if prices.len() < period || period == 0 {
        return None;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let initial: f64 = prices[..period].iter().sum::<f64>() / period as f64;

    let mut series = Vec::with_capacity(prices.len() - period + 1);
    let mut ema = initial;
    series.push(ema);
    for price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
        series.push(ema);
    }

    Some(series)
}
