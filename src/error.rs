use crate::models::Direction;

/// Errors from the risk engine and allocation layer
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RiskError {
    /// Entry equals stop-loss: risk per share is zero, sizing is undefined
    #[error("invalid stop-loss: entry {entry} equals stop {stop_loss}")]
    InvalidStopLoss { entry: f64, stop_loss: f64 },

    /// Trend label outside the closed risk-profile table
    #[error("unknown trend type: {0}")]
    UnknownTrendType(String),
}

/// Errors constructing signals
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignalError {
    #[error(
        "invalid {direction:?} levels: entry {entry}, sl {sl}, target {target}"
    )]
    InvalidLevels {
        direction: Direction,
        entry: f64,
        sl: f64,
        target: f64,
    },
}

/// A strategy malfunction, as opposed to a deliberate abstain (`None`)
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("malformed input for {strategy}: {detail}")]
    MalformedInput {
        strategy: &'static str,
        detail: String,
    },
}

/// Data-provider failures. `Unavailable` (fetch failed) is distinct from
/// `Empty` (fetch succeeded, nothing published today) so the orchestrator
/// can choose fallback vs "no data today".
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data source {provider} unavailable: {detail}")]
    Unavailable { provider: String, detail: String },

    #[error("data source returned no records")]
    Empty,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Broker-adapter failures
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("unknown broker: {0}")]
    UnknownBroker(String),

    #[error("broker call failed after {attempts} attempts: {detail}")]
    CallFailed { attempts: u32, detail: String },

    #[error("order {0} not found")]
    UnknownOrder(String),

    #[error("order rejected: {0}")]
    Rejected(String),
}
