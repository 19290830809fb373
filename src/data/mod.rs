use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::error::DataError;
use crate::models::{BlockDeal, Candle, FlowMetrics, OiMetrics, SymbolSnapshot};

const NSE_API_BASE: &str = "https://www.nseindia.com/api";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Market-data source for the daily cycle.
///
/// `Err(DataError::Unavailable)` means the fetch failed; `Empty` means it
/// succeeded but nothing was published. Callers treat those differently:
/// unavailable data falls back to the last known good value, empty data
/// simply contributes nothing today.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_ohlc(&self, symbol: &str, days: usize) -> Result<Vec<Candle>, DataError>;

    async fn fetch_institutional_flows(&self, symbol: &str) -> Result<FlowMetrics, DataError>;

    async fn fetch_block_deals(&self) -> Result<Vec<BlockDeal>, DataError>;

    async fn fetch_open_interest(&self, symbol: &str) -> Result<OiMetrics, DataError>;

    /// Sector ETF net flows by symbol, consumed by hedge detection
    async fn fetch_sector_flows(&self) -> Result<BTreeMap<String, f64>, DataError>;

    /// Assemble the full per-symbol snapshot. Flow and OI failures degrade
    /// to defaults; missing bars are a hard error since every strategy
    /// needs them.
    async fn fetch_snapshot(&self, symbol: &str, days: usize) -> Result<SymbolSnapshot, DataError> {
        let candles = self.fetch_ohlc(symbol, days).await?;
        if candles.is_empty() {
            return Err(DataError::Empty);
        }

        let flows = match self.fetch_institutional_flows(symbol).await {
            Ok(flows) => flows,
            Err(e) => {
                tracing::warn!(symbol, "flow fetch failed, using defaults: {e}");
                FlowMetrics::default()
            }
        };
        let oi = match self.fetch_open_interest(symbol).await {
            Ok(oi) => oi,
            Err(e) => {
                tracing::warn!(symbol, "oi fetch failed, using defaults: {e}");
                OiMetrics::default()
            }
        };

        Ok(SymbolSnapshot {
            symbol: symbol.to_string(),
            candles,
            flows,
            oi,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OhlcResponse {
    data: Vec<OhlcRow>,
}

#[derive(Debug, Deserialize)]
struct OhlcRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct FlowResponse {
    #[serde(rename = "fiiNet")]
    fii_net: f64,
    #[serde(rename = "diiNet")]
    dii_net: f64,
    #[serde(rename = "netCash")]
    net_cash: f64,
    #[serde(rename = "netFno")]
    net_fno: f64,
    #[serde(rename = "net3Day")]
    net_3day: f64,
    #[serde(rename = "deliveryPct")]
    delivery_pct: f64,
    #[serde(rename = "delivery3DayAvg")]
    delivery_3day_avg: f64,
    #[serde(rename = "hedgePct", default)]
    hedge_pct: f64,
}

#[derive(Debug, Deserialize)]
struct BlockDealResponse {
    data: Vec<BlockDealRow>,
}

#[derive(Debug, Deserialize)]
struct BlockDealRow {
    symbol: String,
    quantity: u64,
    price: f64,
    side: String,
}

#[derive(Debug, Deserialize)]
struct SectorFlowResponse {
    data: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct OiResponse {
    #[serde(rename = "niftyOiPctChange")]
    nifty_oi_pct_change: f64,
    #[serde(rename = "oiPctChange")]
    oi_pct_change: f64,
}

/// NSE HTTP client with retry, bounded timeout, and a last-known-good
/// cache: when every retry fails but a previous fetch succeeded, the
/// stale value is served with a warning rather than failing the cycle.
pub struct NseClient {
    client: Client,
    base_url: String,
    flow_cache: Mutex<HashMap<String, FlowMetrics>>,
}

impl NseClient {
    pub fn new() -> Self {
        Self::with_base_url(NSE_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url,
            flow_cache: Mutex::new(HashMap::new()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, DataError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    return response.json::<T>().await.map_err(DataError::Http);
                }
                Ok(response) => last_error = format!("http {}", response.status()),
                Err(e) => last_error = e.to_string(),
            }

            if attempt < MAX_RETRIES {
                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "nse attempt {}/{} failed for {}: {}. retrying in {}ms",
                    attempt,
                    MAX_RETRIES,
                    path,
                    last_error,
                    backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(DataError::Unavailable {
            provider: "nse".to_string(),
            detail: last_error,
        })
    }

    fn cached_flows(&self, symbol: &str) -> Option<FlowMetrics> {
        self.flow_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(symbol).cloned())
    }

    fn remember_flows(&self, symbol: &str, flows: &FlowMetrics) {
        if let Ok(mut cache) = self.flow_cache.lock() {
            cache.insert(symbol.to_string(), flows.clone());
        }
    }
}

impl Default for NseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataProvider for NseClient {
    async fn fetch_ohlc(&self, symbol: &str, days: usize) -> Result<Vec<Candle>, DataError> {
        let path = format!("/historical/cm/equity?symbol={symbol}&days={days}");
        let response: OhlcResponse = self.get_json(&path).await?;

        if response.data.is_empty() {
            return Err(DataError::Empty);
        }

        Ok(response
            .data
            .into_iter()
            .map(|row| Candle {
                symbol: symbol.to_string(),
                timestamp: chrono::DateTime::from_timestamp(row.timestamp, 0)
                    .unwrap_or_default(),
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            })
            .collect())
    }

    async fn fetch_institutional_flows(&self, symbol: &str) -> Result<FlowMetrics, DataError> {
        let path = format!("/fiidii-flows?symbol={symbol}");
        match self.get_json::<FlowResponse>(&path).await {
            Ok(row) => {
                let flows = FlowMetrics {
                    fii_net: row.fii_net,
                    dii_net: row.dii_net,
                    net_cash: row.net_cash,
                    net_fno: row.net_fno,
                    net_3day: row.net_3day,
                    delivery_pct: row.delivery_pct,
                    delivery_3day_avg: row.delivery_3day_avg,
                    hedge_pct: row.hedge_pct,
                };
                self.remember_flows(symbol, &flows);
                Ok(flows)
            }
            Err(DataError::Unavailable { provider, detail }) => {
                if let Some(stale) = self.cached_flows(symbol) {
                    tracing::warn!(symbol, "serving stale flows after fetch failure");
                    return Ok(stale);
                }
                Err(DataError::Unavailable { provider, detail })
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_block_deals(&self) -> Result<Vec<BlockDeal>, DataError> {
        let response: BlockDealResponse = self.get_json("/block-deals").await?;
        if response.data.is_empty() {
            return Err(DataError::Empty);
        }

        Ok(response
            .data
            .into_iter()
            .map(|row| BlockDeal {
                symbol: row.symbol,
                quantity: row.quantity,
                price: row.price,
                side: row.side,
            })
            .collect())
    }

    async fn fetch_open_interest(&self, symbol: &str) -> Result<OiMetrics, DataError> {
        let path = format!("/open-interest?symbol={symbol}");
        let row: OiResponse = self.get_json(&path).await?;
        Ok(OiMetrics {
            nifty_oi_pct_change: row.nifty_oi_pct_change,
            oi_pct_change: row.oi_pct_change,
        })
    }

    async fn fetch_sector_flows(&self) -> Result<BTreeMap<String, f64>, DataError> {
        let response: SectorFlowResponse = self.get_json("/sector-flows").await?;
        if response.data.is_empty() {
            return Err(DataError::Empty);
        }
        Ok(response.data)
    }
}

/// In-memory provider for dry runs and offline tests
#[derive(Default)]
pub struct StaticDataProvider {
    snapshots: HashMap<String, SymbolSnapshot>,
    sector_flows: BTreeMap<String, f64>,
}

impl StaticDataProvider {
    pub fn new(snapshots: Vec<SymbolSnapshot>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|s| (s.symbol.clone(), s))
                .collect(),
            sector_flows: BTreeMap::new(),
        }
    }

    pub fn with_sector_flows(mut self, flows: BTreeMap<String, f64>) -> Self {
        self.sector_flows = flows;
        self
    }

    fn get(&self, symbol: &str) -> Result<&SymbolSnapshot, DataError> {
        self.snapshots
            .get(symbol)
            .ok_or_else(|| DataError::Unavailable {
                provider: "static".to_string(),
                detail: format!("no fixture for {symbol}"),
            })
    }
}

#[async_trait]
impl DataProvider for StaticDataProvider {
    async fn fetch_ohlc(&self, symbol: &str, _days: usize) -> Result<Vec<Candle>, DataError> {
        Ok(self.get(symbol)?.candles.clone())
    }

    async fn fetch_institutional_flows(&self, symbol: &str) -> Result<FlowMetrics, DataError> {
        Ok(self.get(symbol)?.flows.clone())
    }

    async fn fetch_block_deals(&self) -> Result<Vec<BlockDeal>, DataError> {
        Err(DataError::Empty)
    }

    async fn fetch_open_interest(&self, symbol: &str) -> Result<OiMetrics, DataError> {
        Ok(self.get(symbol)?.oi.clone())
    }

    async fn fetch_sector_flows(&self) -> Result<BTreeMap<String, f64>, DataError> {
        if self.sector_flows.is_empty() {
            return Err(DataError::Empty);
        }
        Ok(self.sector_flows.clone())
    }
}
