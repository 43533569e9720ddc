use super::{default_atr_period, default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::indicators::{atr, closes, ema, last_two_valid};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EmaCrossParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
}

fn default_period() -> usize {
    120
}

fn default_atr_multiplier() -> f64 {
    0.3
}

/// 收盤價以超過 ATR 緩衝的幅度站上 / 跌破 EMA
pub struct EmaCross;

#[async_trait]
impl Strategy for EmaCross {
    type Params = EmaCrossParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::EmaCross
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let ema_values = ema(&closes(candles), params.period);
        let atr_values = atr(candles, params.atr_period);

        let Some((prev, cur)) =
            last_two_valid(&[ema_values.as_slice(), atr_values.as_slice()], candles.len())
        else {
            return Ok(Vec::new());
        };

        let (Some(ema_now), Some(ema_prev), Some(atr_now)) =
            (ema_values[cur], ema_values[prev], atr_values[cur])
        else {
            return Ok(Vec::new());
        };
        if atr_now == 0.0 {
            return Ok(Vec::new());
        }

        let current = &candles[cur];
        let previous = &candles[prev];
        let buffer = atr_now * params.atr_multiplier;

        let bullish = current.close > ema_now + buffer && previous.close < ema_prev;
        let bearish = current.close < ema_now - buffer && previous.low > ema_prev;
        if !bullish && !bearish {
            return Ok(Vec::new());
        }

        let action = if bullish { "有效突破" } else { "有效跌破" };
        let trend = current_trend(candles, ctx.timeframe, ctx.settings);
        let breakout_atr_ratio = (current.close - ema_now).abs() / atr_now;

        let body = format!(
            "{}**信号**: 价格 **实时{}** EMA({})。\n\n\
             **突破详情**:\n\
             > **当前价**: {:.4}\n\
             > **EMA值**: {:.4}\n\
             > **突破力度**: **{:.1} 倍 ATR**\n\
             > (突破阈值要求 > {} 倍 ATR)\n\n",
            trend.headline(),
            action,
            params.period,
            current.close,
            ema_now,
            breakout_atr_ratio,
            params.atr_multiplier
        );

        Ok(vec![AlertCandidate {
            log_name: "EMA Cross".to_string(),
            alert_key: format!(
                "{}_{}_EMACROSS_VALID_{}_REALTIME",
                ctx.symbol,
                ctx.timeframe,
                if bullish { "UP" } else { "DOWN" }
            ),
            title: format!("🚀 EMA {{vol_label}}{}: {} ({})", action, ctx.symbol, ctx.timeframe),
            body,
            volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
            fallback_volume_multiplier: params.volume_multiplier,
            cooldown_multiplier: 1.0,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::config::toml_config::StrategySettings;
    use crate::domain::model::Candle;
    use crate::strategies::tests::{context, table, OfflineExchange};
    use crate::strategies::evaluate;

    fn flat_then(last_open: f64, last_close: f64) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..40)
            .map(|i| candle(i, 100.0, 101.0, 99.0, 100.0, 10.0))
            .collect();
        // 前一根收在 EMA 下方
        candles[38] = candle(38, 100.0, 100.5, 98.5, 99.0, 10.0);
        let high = last_open.max(last_close) + 0.5;
        let low = last_open.min(last_close) - 0.5;
        candles[39] = candle(39, last_open, high, low, last_close, 10.0);
        candles
    }

    #[tokio::test]
    async fn test_bullish_breakout() {
        let candles = flat_then(99.0, 106.0);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let alerts = evaluate(
            StrategyKind::EmaCross,
            &ctx,
            &table("enabled = true\nperiod = 20\nvolume_confirm = true"),
        )
        .await
        .unwrap();

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.alert_key, "BTC/USDT:USDT_1h_EMACROSS_VALID_UP_REALTIME");
        assert_eq!(alert.title, "🚀 EMA {vol_label}有效突破: BTC/USDT:USDT (1h)");
        assert_eq!(alert.volume_policy, VolumePolicy::MustConfirm);
        assert!(alert.body.contains("**信号**: 价格 **实时有效突破** EMA(20)。"));
        assert!(alert.body.contains("(突破阈值要求 > 0.3 倍 ATR)"));
    }

    #[tokio::test]
    async fn test_small_move_is_ignored() {
        // 收盤只高於 EMA 一點點，不到 ATR 緩衝
        let candles = flat_then(99.0, 100.1);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let params = EmaCrossParams {
            period: 20,
            atr_period: 14,
            atr_multiplier: 0.3,
            volume_confirm: false,
            volume_multiplier: 1.5,
        };
        let alerts = EmaCross.check(&ctx, &params).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_not_enough_history() {
        let candles = flat_then(99.0, 106.0);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let alerts = evaluate(StrategyKind::EmaCross, &ctx, &table("enabled = true"))
            .await
            .unwrap();
        assert!(alerts.is_empty());
    }
}
