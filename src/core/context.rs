use crate::adapters::{BinanceExchange, BinanceOptions, CooldownStore};
use crate::config::MonitorConfig;
use crate::core::alerts::AlertDispatcher;
use crate::core::notifications::NotificationQueue;
use crate::core::universe::SymbolCache;
use crate::domain::ports::Exchange;
use crate::utils::error::{MonitorError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// 掃描與報告任務共用的執行期狀態
pub struct AppContext {
    pub config: MonitorConfig,
    pub exchange: Arc<dyn Exchange>,
    pub symbols: SymbolCache,
    pub dispatcher: AlertDispatcher,
    pub queue: NotificationQueue,
}

impl AppContext {
    pub fn new(config: MonitorConfig, exchange: Arc<dyn Exchange>, queue: NotificationQueue) -> Self {
        let cooldowns = CooldownStore::load(&config.app.state_file, Utc::now());
        Self {
            dispatcher: AlertDispatcher::new(cooldowns, queue.clone()),
            config,
            exchange,
            symbols: SymbolCache::new(),
            queue,
        }
    }
}

/// 依 `app.exchange` 建立交易所連線
pub fn build_exchange(config: &MonitorConfig) -> Result<Arc<dyn Exchange>> {
    match config.app.exchange.to_lowercase().as_str() {
        "binance" => {
            let exchange = BinanceExchange::new(BinanceOptions {
                market_type: config.app.market_type,
                base_url: config.app.base_url.clone(),
                request_timeout: Duration::from_secs(config.app.request_timeout_seconds),
                rate_limit: Duration::from_millis(config.app.rate_limit_ms),
            })?;
            Ok(Arc::new(exchange))
        }
        other => Err(MonitorError::InvalidConfigValueError {
            field: "app.exchange".to_string(),
            value: other.to_string(),
            reason: "unsupported exchange".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_exchange() {
        let config = MonitorConfig::from_toml_str("[app]\nexchange = \"Binance\"\n").unwrap();
        assert_eq!(build_exchange(&config).unwrap().id(), "binance");

        let unsupported = MonitorConfig::from_toml_str("[app]\nexchange = \"kraken\"\n").unwrap();
        assert!(matches!(
            build_exchange(&unsupported),
            Err(MonitorError::InvalidConfigValueError { .. })
        ));
    }
}
