use crate::config::MonitorConfig;
use crate::domain::model::{MarketType, Ticker};
use crate::domain::ports::Exchange;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 熱門幣種篩選條件
#[derive(Debug, Clone)]
pub struct UniverseOptions {
    pub top_n: usize,
    pub exclude: HashSet<String>,
    pub market_type: MarketType,
    pub primary_quote: String,
    /// 跨市場驗證要求的計價幣（不含主計價幣）；`None` 表示不驗證
    pub must_exist_in: Option<HashSet<String>>,
    pub retries: u32,
}

impl UniverseOptions {
    pub fn from_config(config: &MonitorConfig, top_n: usize, ignore_advanced_filters: bool) -> Self {
        let scan = &config.market.dynamic_scan;
        let filter = &scan.cross_market_filter;

        let must_exist_in = (!ignore_advanced_filters && filter.enabled).then(|| {
            filter
                .must_exist_in
                .iter()
                .map(|q| q.to_uppercase())
                .collect::<HashSet<_>>()
        });

        Self {
            top_n,
            exclude: scan.exclude_symbols.iter().map(|s| s.to_uppercase()).collect(),
            market_type: config.app.market_type,
            primary_quote: scan.primary_quote_currency.to_uppercase(),
            must_exist_in,
            retries: config.app.retries.max(1),
        }
    }
}

/// 依 24h 成交額排序取前 N 名；重試耗盡後回傳空列表
pub async fn top_symbols_by_volume(exchange: &dyn Exchange, opts: &UniverseOptions) -> Vec<String> {
    match &opts.must_exist_in {
        Some(quotes) if quotes.is_empty() => tracing::warn!(
            "⚠️ Cross-market filter enabled but must_exist_in is empty, scanning {} only",
            opts.primary_quote
        ),
        Some(quotes) => tracing::info!(
            "🎯 Cross-market filter active: {} and {}",
            opts.primary_quote,
            quotes.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
        None => tracing::debug!("Plain dynamic scan on {} {} markets", opts.primary_quote, opts.market_type),
    }

    for attempt in 1..=opts.retries {
        match exchange.fetch_tickers().await {
            Ok(tickers) => {
                tracing::info!("📥 Fetched {} tickers from {}", tickers.len(), exchange.id());
                let symbols = rank_by_volume(&tickers, opts);
                tracing::info!("✅ Selected {} dynamic symbols", symbols.len());
                return symbols;
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Failed to fetch tickers (attempt {}/{}): {}",
                    attempt,
                    opts.retries,
                    e
                );
                if attempt < opts.retries {
                    tokio::time::sleep(exchange.rate_limit()).await;
                }
            }
        }
    }

    tracing::error!("❌ Giving up on tickers after {} attempts", opts.retries);
    Vec::new()
}

fn rank_by_volume(tickers: &[Ticker], opts: &UniverseOptions) -> Vec<String> {
    let mut quotes_by_base: HashMap<String, HashSet<String>> = HashMap::new();
    let mut primary: HashMap<String, &Ticker> = HashMap::new();

    for ticker in tickers {
        if ticker.market_type != opts.market_type {
            continue;
        }
        let base = ticker.base.to_uppercase();
        if opts.exclude.contains(&base) {
            continue;
        }
        let quote = ticker.quote.to_uppercase();
        if quote == opts.primary_quote {
            primary.insert(base.clone(), ticker);
        }
        quotes_by_base.entry(base).or_default().insert(quote);
    }

    let candidates: HashSet<&String> = match &opts.must_exist_in {
        Some(required) if !required.is_empty() => {
            let mut required = required.clone();
            required.insert(opts.primary_quote.clone());
            quotes_by_base
                .iter()
                .filter(|(_, quotes)| required.is_subset(quotes))
                .map(|(base, _)| base)
                .collect()
        }
        _ => primary.keys().collect(),
    };

    let mut ranked: Vec<&Ticker> = candidates
        .into_iter()
        .filter_map(|base| primary.get(base).copied())
        .filter(|t| t.quote_volume > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));
    ranked.truncate(opts.top_n);

    ranked.into_iter().map(|t| t.symbol.clone()).collect()
}

/// 基礎幣在主市場的統一代號
pub fn primary_market_symbol(base: &str, primary_quote: &str, market_type: MarketType) -> String {
    let base = base.to_uppercase();
    let quote = primary_quote.to_uppercase();
    match market_type {
        MarketType::Swap => format!("{}/{}:{}", base, quote, quote),
        MarketType::Spot => format!("{}/{}", base, quote),
    }
}

pub fn static_symbols(config: &MonitorConfig) -> Vec<String> {
    config
        .market
        .static_symbols
        .iter()
        .map(|base| {
            primary_market_symbol(
                base,
                &config.market.dynamic_scan.primary_quote_currency,
                config.app.market_type,
            )
        })
        .collect()
}

/// 目前監控中的交易對（依熱度排序，排名 = 位置 + 1）
#[derive(Debug, Clone, Default)]
pub struct SymbolCache {
    symbols: Arc<RwLock<Vec<String>>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, symbols: Vec<String>) {
        *self.symbols.write().await = symbols;
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.symbols.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.symbols.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.symbols.read().await.is_empty()
    }

    pub async fn rank_of(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .read()
            .await
            .iter()
            .position(|s| s == symbol)
            .map(|i| i + 1)
    }
}

/// 更新快取：動態列表在前，再補上未出現的靜態交易對
pub async fn refresh_symbol_cache(
    exchange: &dyn Exchange,
    config: &MonitorConfig,
    cache: &SymbolCache,
    top_n: usize,
    ignore_advanced_filters: bool,
) -> usize {
    let opts = UniverseOptions::from_config(config, top_n, ignore_advanced_filters);
    let mut symbols = top_symbols_by_volume(exchange, &opts).await;

    for symbol in static_symbols(config) {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    let count = symbols.len();
    cache.replace(symbols).await;
    tracing::info!("✅ Symbol cache refreshed, {} symbols monitored", count);
    count
}

/// 關閉動態掃描時只監控靜態交易對
pub async fn use_static_symbols(config: &MonitorConfig, cache: &SymbolCache) -> usize {
    let symbols = static_symbols(config);
    let count = symbols.len();
    cache.replace(symbols).await;
    tracing::info!("📌 Dynamic scan disabled, monitoring {} static symbols", count);
    count
}
