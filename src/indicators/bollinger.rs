use super::moving_average::calculate_sma;

/// Bollinger band values for the latest bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands over the trailing `period` prices.
///
/// Middle band is the SMA, upper/lower are +/- `num_std` population
/// standard deviations around it.
pub fn calculate_bollinger(prices: &[f64], period: usize, num_std: f64) -> Option<BollingerBands> {
    if prices.len() < period || period == 0 {
        return None;
    }

    let middle = calculate_sma(prices, period)?;

    let window = &prices[prices.len() - period..];
    let variance =
        window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    Some(BollingerBands {
        upper: middle + num_std * std_dev,
        middle,
        lower: middle - num_std * std_dev,
    })
}
