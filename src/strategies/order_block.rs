use super::{default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::order_blocks::latest_order_blocks;
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, Candle, OrderBlock, OrderBlockKind, Trend, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBlockParams {
    #[serde(default = "default_swing_length")]
    pub swing_length: usize,
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
    #[serde(default = "default_cooldown_multiplier")]
    pub cooldown_multiplier: f64,
}

fn default_swing_length() -> usize {
    10
}

fn default_atr_multiplier() -> f64 {
    0.1
}

fn default_cooldown_multiplier() -> f64 {
    2.0
}

/// 價格回踩最新的看漲訂單塊，或反抽最新的看跌訂單塊
pub struct OrderBlockInteraction;

#[async_trait]
impl Strategy for OrderBlockInteraction {
    type Params = OrderBlockParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::OrderBlockInteraction
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let Some(current) = candles.last() else {
            return Ok(Vec::new());
        };

        let (bullish, bearish) = latest_order_blocks(candles, params.swing_length, params.atr_multiplier);
        if bullish.is_none() && bearish.is_none() {
            return Ok(Vec::new());
        }

        let trend = current_trend(candles, ctx.timeframe, ctx.settings);
        let mut alerts = Vec::new();

        // 訂單塊本身不算回踩
        if let Some(block) = bullish.filter(|b| b.timestamp != current.timestamp) {
            if current.low <= block.top && current.close >= block.bottom {
                alerts.push(block_alert(ctx, params, &block, current, trend));
            }
        }

        if let Some(block) = bearish.filter(|b| b.timestamp != current.timestamp) {
            if current.high >= block.bottom && current.close <= block.top {
                alerts.push(block_alert(ctx, params, &block, current, trend));
            }
        }

        Ok(alerts)
    }
}

fn block_alert(
    ctx: &SignalContext<'_>,
    params: &OrderBlockParams,
    block: &OrderBlock,
    current: &Candle,
    trend: Trend,
) -> AlertCandidate {
    let (side, emoji, action, role) = match block.kind {
        OrderBlockKind::Bullish => ("BULL", "🟩", "回踩看涨订单块", "支撑"),
        OrderBlockKind::Bearish => ("BEAR", "🟥", "反抽看跌订单块", "阻力"),
    };
    let formed_at = chrono::DateTime::from_timestamp_millis(block.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| block.timestamp.to_string());

    AlertCandidate {
        log_name: "Order Block Interaction".to_string(),
        alert_key: format!("{}_{}_OB_{}_{}", ctx.symbol, ctx.timeframe, side, block.timestamp),
        title: format!("{} {{vol_label}}{}: {} ({})", emoji, action, ctx.symbol, ctx.timeframe),
        body: format!(
            "{}**信号**: 价格 **{}**，该区域可能形成{}。\n\n\
             **订单块详情**:\n\
             > **区间**: {:.4} - {:.4}\n\
             > **形成时间**: {}\n\
             > **当前价**: {:.4}\n\n",
            trend.headline(),
            action,
            role,
            block.bottom,
            block.top,
            formed_at,
            current.close
        ),
        volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
        fallback_volume_multiplier: params.volume_multiplier,
        cooldown_multiplier: params.cooldown_multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::config::toml_config::StrategySettings;
    use crate::strategies::evaluate;
    use crate::strategies::tests::{context, table, OfflineExchange};

    fn flat(i: usize) -> Candle {
        candle(i, 100.0, 101.0, 99.0, 100.1, 10.0)
    }

    fn with_retest(low: f64, close: f64) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..30).map(flat).collect();
        candles[15] = candle(15, 100.0, 106.0, 99.0, 105.0, 10.0);
        candles[20] = candle(20, 101.0, 101.5, 97.0, 98.0, 10.0);
        candles.extend((30..40).map(|i| candle(i, 108.0, 112.0, 107.5, 111.0, 10.0)));
        candles.push(candle(40, 108.0, 108.5, low, close, 10.0));
        candles
    }

    #[tokio::test]
    async fn test_retest_of_bullish_block() {
        let candles = with_retest(101.0, 103.0);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let alerts = evaluate(
            StrategyKind::OrderBlockInteraction,
            &ctx,
            &table("enabled = true\nswing_length = 5"),
        )
        .await
        .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].alert_key,
            format!("BTC/USDT:USDT_1h_OB_BULL_{}", 20 * 3_600_000)
        );
        assert_eq!(alerts[0].cooldown_multiplier, 2.0);
        assert!(alerts[0].body.contains("> **区间**: 97.0000 - 101.5000"));
    }

    #[tokio::test]
    async fn test_price_above_block_is_silent() {
        let candles = with_retest(104.0, 106.0);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let alerts = evaluate(
            StrategyKind::OrderBlockInteraction,
            &ctx,
            &table("enabled = true\nswing_length = 5"),
        )
        .await
        .unwrap();
        assert!(alerts.is_empty());
    }
}
