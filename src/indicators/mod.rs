// Technical indicator calculations
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use macd::macd_line_series;
pub use moving_average::{calculate_ema, calculate_sma, ema_series};
pub use rsi::calculate_rsi;
