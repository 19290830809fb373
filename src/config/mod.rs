use std::collections::HashMap;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::models::CapTier;

/// Process-wide settings, loaded once at startup.
///
/// Layered: built-in defaults < optional `swingbot.toml` < `SWINGBOT_*`
/// environment variables. Secrets come in through the environment
/// (`.env` supported via dotenvy in main).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub portfolio_value: PortfolioValue,
    /// Symbols considered during pre-market screening
    pub watchlist: Vec<String>,
    pub risk: RiskConstraints,
    pub schedule: ScheduleSettings,
    /// Broker credentials keyed by broker name ("zerodha", "upstox")
    pub brokers: HashMap<String, BrokerSettings>,
    pub telegram: Option<TelegramSettings>,
    pub email: EmailSettings,
    /// Path for the position snapshot written after each mutation
    pub positions_file: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct PortfolioValue(pub f64);

impl Default for PortfolioValue {
    fn default() -> Self {
        Self(1_000_000.0)
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name("swingbot").required(false))
            .add_source(config::Environment::with_prefix("SWINGBOT").separator("__"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

/// Risk constraints shared by the risk engine and hedge detector.
/// Read-only after load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConstraints {
    /// Fraction of account equity risked per trade
    pub max_risk_per_trade: f64,
    pub cap_thresholds: CapThresholds,
    pub hedge: HedgeThresholds,
    /// Symbols known to be legs of institutional pair trades
    pub pair_symbols: Vec<String>,
    /// Cap-tier overrides; symbols not listed default to small cap
    pub cap_tiers: HashMap<String, CapTier>,
}

impl Default for RiskConstraints {
    fn default() -> Self {
        let mut cap_tiers = HashMap::new();
        for s in ["RELIANCE", "HDFCBANK"] {
            cap_tiers.insert(s.to_string(), CapTier::Large);
        }
        for s in ["PEL", "DEEPAKNTR"] {
            cap_tiers.insert(s.to_string(), CapTier::Mid);
        }

        Self {
            max_risk_per_trade: 0.02,
            cap_thresholds: CapThresholds::default(),
            hedge: HedgeThresholds::default(),
            pair_symbols: vec!["HDFCBANK".to_string(), "ICICIBANK".to_string()],
            cap_tiers,
        }
    }
}

impl RiskConstraints {
    /// Cap tier for a symbol; unknown symbols are treated as small cap
    pub fn cap_tier(&self, symbol: &str) -> CapTier {
        self.cap_tiers.get(symbol).copied().unwrap_or(CapTier::Small)
    }

    pub fn cap_threshold(&self, tier: CapTier) -> f64 {
        match tier {
            CapTier::Large => self.cap_thresholds.large,
            CapTier::Mid => self.cap_thresholds.mid,
            CapTier::Small => self.cap_thresholds.small,
        }
    }

    pub fn is_pair_symbol(&self, symbol: &str) -> bool {
        self.pair_symbols.iter().any(|s| s == symbol)
    }
}

/// Minimum 3-day institutional net flow per market-cap tier (rupees)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CapThresholds {
    pub large: f64,
    pub mid: f64,
    pub small: f64,
}

impl Default for CapThresholds {
    fn default() -> Self {
        Self {
            large: 4e7, // 4Cr
            mid: 3e7,
            small: 1e7,
        }
    }
}

/// Thresholds for hedge detection on institutional flows
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HedgeThresholds {
    /// Cash flow below this multiple of derivatives flow suggests hedging
    pub cash_derivatives_ratio: f64,
    /// Minimum delivery_pct minus hedge_pct gap for a clean trade
    pub delivery_hedge_gap: f64,
    /// Sector ETF net flow below this marks a sector hedge
    pub sector_flow_threshold: f64,
    /// Index OI change above this marks an index hedge
    pub index_oi_change_limit: f64,
    /// Absolute symbol OI change above this supports a pair trade
    pub pair_trade_oi_threshold: f64,
}

impl Default for HedgeThresholds {
    fn default() -> Self {
        Self {
            cash_derivatives_ratio: 0.5,
            delivery_hedge_gap: 10.0,
            sector_flow_threshold: -2e7,
            index_oi_change_limit: 5.0,
            pair_trade_oi_threshold: 8.0,
        }
    }
}

/// Daily phase times (exchange local time) and monitoring check bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub screening: NaiveTime,
    pub signal_generation: NaiveTime,
    pub reporting: NaiveTime,
    pub min_monitor_checks: usize,
    pub max_monitor_checks: usize,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            screening: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            signal_generation: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            reporting: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            min_monitor_checks: 2,
            max_monitor_checks: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BrokerSettings {
    pub api_key: String,
    pub access_token: String,
    /// Override for testing against a mock server
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
    /// Override for testing against a mock server
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EmailSettings {
    pub recipients: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let c = RiskConstraints::default();
        assert_eq!(c.max_risk_per_trade, 0.02);
        assert_eq!(c.cap_threshold(CapTier::Large), 4e7);
        assert_eq!(c.cap_threshold(CapTier::Small), 1e7);
    }

    #[test]
    fn test_cap_tier_lookup_defaults_to_small() {
        let c = RiskConstraints::default();
        assert_eq!(c.cap_tier("RELIANCE"), CapTier::Large);
        assert_eq!(c.cap_tier("PEL"), CapTier::Mid);
        assert_eq!(c.cap_tier("NOBODY"), CapTier::Small);
    }

    #[test]
    fn test_pair_symbols() {
        let c = RiskConstraints::default();
        assert!(c.is_pair_symbol("HDFCBANK"));
        assert!(!c.is_pair_symbol("RELIANCE"));
    }

    #[test]
    fn test_default_schedule() {
        let s = ScheduleSettings::default();
        assert_eq!(s.screening, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert!(s.min_monitor_checks <= s.max_monitor_checks);
    }
}
