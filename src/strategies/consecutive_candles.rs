use super::{default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::dynamic::DynamicValueConfig;
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ConsecutiveCandlesParams {
    #[serde(default = "default_min_consecutive")]
    pub min_consecutive_candles: usize,
    /// 依熱度排名調整所需根數
    pub dynamic_count: Option<DynamicValueConfig>,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
}

fn default_min_consecutive() -> usize {
    4
}

/// 最近 n 根已收盤 K 線同色
pub struct ConsecutiveCandles;

#[async_trait]
impl Strategy for ConsecutiveCandles {
    type Params = ConsecutiveCandlesParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::ConsecutiveCandles
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let n = params
            .dynamic_count
            .as_ref()
            .map(|dyn_conf| dyn_conf.count_for_rank(ctx.rank, params.min_consecutive_candles))
            .unwrap_or(params.min_consecutive_candles);

        if n == 0 || candles.len() < n + 1 {
            return Ok(Vec::new());
        }

        // 不含最新一根未收盤的 K 線
        let recent = &candles[candles.len() - n - 1..candles.len() - 1];
        let all_up = recent.iter().all(|c| c.is_bullish());
        let all_down = recent.iter().all(|c| c.is_bearish());
        if !all_up && !all_down {
            return Ok(Vec::new());
        }

        let (direction, emoji, side) = if all_up {
            ("上涨", "📈", "UP")
        } else {
            ("下跌", "📉", "DOWN")
        };
        let trend = current_trend(candles, ctx.timeframe, ctx.settings);

        let body = format!(
            "{}**信号**: 价格已连续 **{} 个周期 {}**。\n\n\
             **动态参数详情**:\n\
             > **币种排名**: 触发时需要 `{}` 根连续K线\n\n\
             **详细信息**:\n\
             > **起始价**: {:.4}\n\
             > **当前价**: {:.4}\n\n",
            trend.headline(),
            n,
            direction,
            n,
            recent[0].open,
            recent[recent.len() - 1].close
        );

        Ok(vec![AlertCandidate {
            log_name: "Consecutive Candles".to_string(),
            alert_key: format!("{}_{}_CONSECUTIVE_{}_{}", ctx.symbol, ctx.timeframe, side, n),
            title: format!("{} 连续{}信号: {} ({})", emoji, direction, ctx.symbol, ctx.timeframe),
            body,
            volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
            fallback_volume_multiplier: params.volume_multiplier,
            // 至少冷卻 n 個週期
            cooldown_multiplier: n as f64,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::config::toml_config::StrategySettings;
    use crate::domain::model::Candle;
    use crate::strategies::evaluate;
    use crate::strategies::tests::{context, table, OfflineExchange};

    fn run_of(bullish: usize) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..10)
            .map(|i| candle(i, 101.0, 101.5, 99.5, 100.0, 10.0))
            .collect();
        for i in 0..bullish {
            let base = 100.0 + i as f64;
            candles.push(candle(10 + i, base, base + 1.5, base - 0.5, base + 1.0, 10.0));
        }
        // 當前未收盤 K 線顏色不影響判斷
        let last = 100.0 + bullish as f64;
        candles.push(candle(10 + bullish, last, last + 0.5, last - 1.5, last - 1.0, 10.0));
        candles
    }

    #[tokio::test]
    async fn test_four_green_candles() {
        let candles = run_of(4);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let alerts = evaluate(StrategyKind::ConsecutiveCandles, &ctx, &table("enabled = true"))
            .await
            .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_key, "BTC/USDT:USDT_1h_CONSECUTIVE_UP_4");
        assert_eq!(alerts[0].title, "📈 连续上涨信号: BTC/USDT:USDT (1h)");
        assert_eq!(alerts[0].cooldown_multiplier, 4.0);
        assert!(alerts[0].body.contains("> **起始价**: 100.0000"));
        assert!(alerts[0].body.contains("> **当前价**: 104.0000"));
    }

    #[tokio::test]
    async fn test_dynamic_count_requires_more_candles() {
        let candles = run_of(4);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let params = table(
            r#"
enabled = true

[dynamic_count]
enabled = true
method = "stepped"
default_count = 6
tiers = [{ up_to_rank = 10, count = 5 }]
"#,
        );
        let alerts = evaluate(StrategyKind::ConsecutiveCandles, &ctx, &params)
            .await
            .unwrap();
        assert!(alerts.is_empty());
    }
}
