//! Signal strategies.
//!
//! Each strategy turns a candle history into zero or more
//! [`AlertCandidate`]s. Cooldown, volume confirmation and delivery are the
//! dispatcher's job, strategies only decide *whether* something happened.

pub mod consecutive_candles;
pub mod ema_cross;
pub mod kdj_cross;
pub mod level_breakout;
pub mod order_block;
pub mod rsi_divergence;
pub mod trend_channel;
pub mod volatility_breakout;

use crate::config::resolve_params;
use crate::config::toml_config::StrategySettings;
use crate::domain::model::{AlertCandidate, Candle};
use crate::domain::ports::Exchange;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    EmaCross,
    KdjCross,
    VolatilityBreakout,
    LevelBreakout,
    RsiDivergence,
    TrendChannelBreakout,
    ConsecutiveCandles,
    OrderBlockInteraction,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::EmaCross,
        StrategyKind::KdjCross,
        StrategyKind::VolatilityBreakout,
        StrategyKind::LevelBreakout,
        StrategyKind::RsiDivergence,
        StrategyKind::TrendChannelBreakout,
        StrategyKind::ConsecutiveCandles,
        StrategyKind::OrderBlockInteraction,
    ];

    /// 設定檔中的名稱
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::EmaCross => "ema_cross",
            StrategyKind::KdjCross => "kdj_cross",
            StrategyKind::VolatilityBreakout => "volatility_breakout",
            StrategyKind::LevelBreakout => "level_breakout",
            StrategyKind::RsiDivergence => "rsi_divergence",
            StrategyKind::TrendChannelBreakout => "trend_channel_breakout",
            StrategyKind::ConsecutiveCandles => "consecutive_candles",
            StrategyKind::OrderBlockInteraction => "order_block_interaction",
        }
    }

    /// 所需的 K 線根數
    pub fn lookback(&self) -> usize {
        match self {
            StrategyKind::EmaCross
            | StrategyKind::KdjCross
            | StrategyKind::VolatilityBreakout
            | StrategyKind::RsiDivergence => 170,
            StrategyKind::LevelBreakout => 200,
            StrategyKind::TrendChannelBreakout => 350,
            StrategyKind::ConsecutiveCandles => 50,
            StrategyKind::OrderBlockInteraction => 250,
        }
    }

    pub fn max_lookback() -> usize {
        Self::ALL.iter().map(StrategyKind::lookback).max().unwrap_or(0)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 每組參數共有的欄位
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommonParams {
    #[serde(default)]
    pub enabled: bool,
    pub name: Option<String>,
    #[serde(default)]
    pub exclude_timeframes: Vec<String>,
}

impl CommonParams {
    pub fn applies_to(&self, timeframe: &str) -> bool {
        self.enabled && !self.exclude_timeframes.iter().any(|tf| tf == timeframe)
    }
}

/// 單一交易對、單一週期的策略輸入
pub struct SignalContext<'a> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub candles: &'a [Candle],
    pub settings: &'a StrategySettings,
    /// 熱度排名（1 起算），不在快取中為 `None`
    pub rank: Option<usize>,
    pub exchange: &'a dyn Exchange,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    type Params: DeserializeOwned + Send + Sync;

    fn kind(&self) -> StrategyKind;

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>>;
}

async fn run_with<S: Strategy>(
    strategy: S,
    ctx: &SignalContext<'_>,
    params: &toml::Table,
) -> Result<Vec<AlertCandidate>> {
    let params: S::Params = resolve_params(params, ctx.timeframe)?;
    tracing::trace!("Running {} on {} {}", strategy.kind(), ctx.symbol, ctx.timeframe);
    strategy.check(ctx, &params).await
}

/// 以已合併週期覆寫的參數執行指定策略
pub async fn evaluate(
    kind: StrategyKind,
    ctx: &SignalContext<'_>,
    params: &toml::Table,
) -> Result<Vec<AlertCandidate>> {
    match kind {
        StrategyKind::EmaCross => run_with(ema_cross::EmaCross, ctx, params).await,
        StrategyKind::KdjCross => run_with(kdj_cross::KdjCross, ctx, params).await,
        StrategyKind::VolatilityBreakout => {
            run_with(volatility_breakout::VolatilityBreakout, ctx, params).await
        }
        StrategyKind::LevelBreakout => run_with(level_breakout::LevelBreakout, ctx, params).await,
        StrategyKind::RsiDivergence => run_with(rsi_divergence::RsiDivergence, ctx, params).await,
        StrategyKind::TrendChannelBreakout => {
            run_with(trend_channel::TrendChannelBreakout, ctx, params).await
        }
        StrategyKind::ConsecutiveCandles => {
            run_with(consecutive_candles::ConsecutiveCandles, ctx, params).await
        }
        StrategyKind::OrderBlockInteraction => {
            run_with(order_block::OrderBlockInteraction, ctx, params).await
        }
    }
}

fn default_volume_multiplier() -> f64 {
    1.5
}

fn default_atr_period() -> usize {
    14
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::Ticker;
    use crate::utils::error::MonitorError;
    use std::time::Duration;

    /// 策略單元測試用：不提供任何資料的交易所
    pub(crate) struct OfflineExchange;

    #[async_trait]
    impl Exchange for OfflineExchange {
        fn id(&self) -> &str {
            "offline"
        }

        fn rate_limit(&self) -> Duration {
            Duration::ZERO
        }

        async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
            Ok(Vec::new())
        }

        async fn fetch_ohlcv(&self, _: &str, _: &str, _: usize) -> Result<Vec<Candle>> {
            Err(MonitorError::ExchangeError {
                message: "offline".to_string(),
            })
        }
    }

    pub(crate) fn context<'a>(
        candles: &'a [Candle],
        settings: &'a StrategySettings,
        exchange: &'a dyn Exchange,
    ) -> SignalContext<'a> {
        SignalContext {
            symbol: "BTC/USDT:USDT",
            timeframe: "1h",
            candles,
            settings,
            rank: Some(1),
            exchange,
        }
    }

    pub(crate) fn table(content: &str) -> toml::Table {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_kind_names_and_lookbacks() {
        assert_eq!(StrategyKind::ALL.len(), 8);
        assert_eq!(StrategyKind::TrendChannelBreakout.name(), "trend_channel_breakout");
        assert_eq!(StrategyKind::max_lookback(), 350);
        assert_eq!(StrategyKind::ConsecutiveCandles.lookback(), 50);
    }

    #[test]
    fn test_common_params_applies_to() {
        let params: CommonParams =
            resolve_params(&table("enabled = true\nexclude_timeframes = [\"15m\"]\nperiod = 3"), "1h")
                .unwrap();
        assert!(params.applies_to("1h"));
        assert!(!params.applies_to("15m"));

        let disabled = CommonParams::default();
        assert!(!disabled.applies_to("1h"));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_bad_params() {
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&[], &settings, &exchange);

        let result = evaluate(StrategyKind::EmaCross, &ctx, &table("period = \"long\"")).await;
        assert!(result.is_err());
    }
}
