//! Binance public market-data adapter.
//!
//! Swap markets use the USDⓈ-M futures API (`/fapi/v1`), spot markets the
//! spot API (`/api/v3`). Only unauthenticated endpoints are used.

use crate::domain::model::{Candle, MarketType, Ticker};
use crate::domain::ports::Exchange;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
pub const SPOT_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug, Clone)]
pub struct BinanceOptions {
    pub market_type: MarketType,
    /// 覆寫 REST 位址（測試或代理）
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    pub rate_limit: Duration,
}

impl Default for BinanceOptions {
    fn default() -> Self {
        Self {
            market_type: MarketType::Swap,
            base_url: None,
            request_timeout: Duration::from_secs(30),
            rate_limit: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Market {
    symbol: String,
    base: String,
    quote: String,
}

/// 交易對資訊快取，依交易所代號與統一代號雙向查詢
#[derive(Debug, Default)]
struct Markets {
    by_id: HashMap<String, Market>,
    id_by_symbol: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    margin_asset: Option<String>,
    contract_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    #[serde(default)]
    quote_volume: Value,
}

pub struct BinanceExchange {
    client: Client,
    options: BinanceOptions,
    markets: OnceCell<Markets>,
}

impl BinanceExchange {
    pub fn new(options: BinanceOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!("signal-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            options,
            markets: OnceCell::new(),
        })
    }

    fn base_url(&self) -> &str {
        let default = match self.options.market_type {
            MarketType::Swap => FUTURES_BASE_URL,
            MarketType::Spot => SPOT_BASE_URL,
        };
        self.options
            .base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }

    fn endpoint(&self, name: &str) -> String {
        let prefix = match self.options.market_type {
            MarketType::Swap => "/fapi/v1",
            MarketType::Spot => "/api/v3",
        };
        format!("{}{}/{}", self.base_url(), prefix, name)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(name);
        tracing::trace!("📡 GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::ExchangeError {
                message: format!("{} returned {}: {}", name, status, truncate(&body, 200)),
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn markets(&self) -> Result<&Markets> {
        self.markets
            .get_or_try_init(|| async {
                let info: ExchangeInfo = self.get_json("exchangeInfo", &[]).await?;
                let markets = self.build_markets(info);
                tracing::info!(
                    "📚 Loaded {} {} markets from binance",
                    markets.by_id.len(),
                    self.options.market_type
                );
                Ok(markets)
            })
            .await
    }

    fn build_markets(&self, info: ExchangeInfo) -> Markets {
        let mut markets = Markets::default();

        for item in info.symbols {
            if item.status != "TRADING" {
                continue;
            }
            let symbol = match self.options.market_type {
                MarketType::Swap => {
                    if item.contract_type.as_deref() != Some("PERPETUAL") {
                        continue;
                    }
                    let settle = item.margin_asset.as_deref().unwrap_or(&item.quote_asset);
                    format!("{}/{}:{}", item.base_asset, item.quote_asset, settle)
                }
                MarketType::Spot => format!("{}/{}", item.base_asset, item.quote_asset),
            };

            markets.id_by_symbol.insert(symbol.clone(), item.symbol.clone());
            markets.by_id.insert(
                item.symbol,
                Market {
                    symbol,
                    base: item.base_asset,
                    quote: item.quote_asset,
                },
            );
        }

        markets
    }

    async fn market_id(&self, symbol: &str) -> Result<String> {
        let markets = self.markets().await?;
        markets
            .id_by_symbol
            .get(symbol)
            .cloned()
            .ok_or_else(|| MonitorError::ExchangeError {
                message: format!("Unknown {} symbol: {}", self.options.market_type, symbol),
            })
    }
}

#[async_trait]
impl Exchange for BinanceExchange {
    fn id(&self) -> &str {
        "binance"
    }

    fn rate_limit(&self) -> Duration {
        self.options.rate_limit
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let markets = self.markets().await?;
        let raw: Vec<RawTicker> = self.get_json("ticker/24hr", &[]).await?;

        let tickers = raw
            .into_iter()
            .filter_map(|t| {
                let market = markets.by_id.get(&t.symbol)?;
                Some(Ticker {
                    symbol: market.symbol.clone(),
                    base: market.base.clone(),
                    quote: market.quote.clone(),
                    market_type: self.options.market_type,
                    quote_volume: parse_number(&t.quote_volume).unwrap_or(0.0),
                })
            })
            .collect();

        Ok(tickers)
    }

    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let id = self.market_id(symbol).await?;
        let rows: Vec<Vec<Value>> = self
            .get_json(
                "klines",
                &[
                    ("symbol", id),
                    ("interval", timeframe.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        rows.iter()
            .map(|row| {
                parse_kline(row).ok_or_else(|| MonitorError::ExchangeError {
                    message: format!("Malformed kline for {}: {:?}", symbol, row),
                })
            })
            .collect()
    }
}

// Binance 以字串回傳數值
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_kline(row: &[Value]) -> Option<Candle> {
    Some(Candle {
        timestamp: row.first()?.as_i64()?,
        open: parse_number(row.get(1)?)?,
        high: parse_number(row.get(2)?)?,
        low: parse_number(row.get(3)?)?,
        close: parse_number(row.get(4)?)?,
        volume: parse_number(row.get(5)?)?,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
