use super::{SignalContext, Strategy, StrategyKind};
use crate::analysis::indicators::{closes, max_of, min_of, rsi};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RsiDivergenceParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_lookback", alias = "lookback_period")]
    pub lookback: usize,
}

fn default_rsi_period() -> usize {
    14
}

fn default_lookback() -> usize {
    60
}

/// 價格創回看區間新高（新低）但 RSI 未跟上
pub struct RsiDivergence;

#[async_trait]
impl Strategy for RsiDivergence {
    type Params = RsiDivergenceParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::RsiDivergence
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let rsi_values = rsi(&closes(candles), params.rsi_period);

        // (close, rsi) 只取 RSI 有值的 K 線
        let rows: Vec<(f64, f64)> = candles
            .iter()
            .zip(rsi_values.iter())
            .filter_map(|(c, r)| r.map(|r| (c.close, r)))
            .collect();
        if params.lookback == 0 || rows.len() < params.lookback + 1 {
            return Ok(Vec::new());
        }

        let (current_close, current_rsi) = rows[rows.len() - 1];
        let recent = &rows[rows.len() - 1 - params.lookback..rows.len() - 1];
        let (Some(max_close), Some(max_rsi), Some(min_close), Some(min_rsi)) = (
            max_of(recent.iter().map(|r| r.0)),
            max_of(recent.iter().map(|r| r.1)),
            min_of(recent.iter().map(|r| r.0)),
            min_of(recent.iter().map(|r| r.1)),
        ) else {
            return Ok(Vec::new());
        };

        let trend = current_trend(candles, ctx.timeframe, ctx.settings);
        let mut alerts = Vec::new();

        if current_close > max_close && current_rsi < max_rsi {
            alerts.push(divergence_alert(
                ctx,
                "TOP",
                format!("🚩 实时RSI顶背离风险: {} ({})", ctx.symbol, ctx.timeframe),
                format!(
                    "{}**信号**: 价格创近期新高，但RSI指标出现衰弱迹象（潜在反转/回调风险）。",
                    trend.headline()
                ),
            ));
        }

        if current_close < min_close && current_rsi > min_rsi {
            alerts.push(divergence_alert(
                ctx,
                "BOTTOM",
                format!("⛳️ 实时RSI底背离机会: {} ({})", ctx.symbol, ctx.timeframe),
                format!(
                    "{}**信号**: 价格创近期新低，但RSI指标出现企稳迹象（潜在反转/反弹机会）。",
                    trend.headline()
                ),
            ));
        }

        Ok(alerts)
    }
}

fn divergence_alert(ctx: &SignalContext<'_>, side: &str, title: String, body: String) -> AlertCandidate {
    AlertCandidate {
        log_name: "RSI Divergence".to_string(),
        alert_key: format!("{}_{}_DIV_{}_REALTIME", ctx.symbol, ctx.timeframe, side),
        title,
        body,
        volume_policy: VolumePolicy::Skip,
        fallback_volume_multiplier: super::default_volume_multiplier(),
        cooldown_multiplier: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::config::toml_config::StrategySettings;
    use crate::domain::model::Candle;
    use crate::strategies::tests::{context, OfflineExchange};

    fn closes_to_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| candle(i, c, c + 0.5, c - 0.5, c, 10.0))
            .collect()
    }

    #[tokio::test]
    async fn test_top_divergence() {
        // 強勢上漲、回落，最後小幅創新高
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        closes.extend((0..15).map(|i| 158.0 - i as f64));
        closes.extend((0..17).map(|i| 144.0 + i as f64 * 0.5));
        closes.push(160.0);
        let candles = closes_to_candles(&closes);

        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);
        let params = RsiDivergenceParams {
            rsi_period: 14,
            lookback: 40,
        };

        let alerts = RsiDivergence.check(&ctx, &params).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_key, "BTC/USDT:USDT_1h_DIV_TOP_REALTIME");
        assert_eq!(alerts[0].title, "🚩 实时RSI顶背离风险: BTC/USDT:USDT (1h)");
        assert_eq!(alerts[0].volume_policy, VolumePolicy::Skip);
        assert_eq!(alerts[0].cooldown_multiplier, 2.0);
    }

    #[tokio::test]
    async fn test_short_history_is_silent() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let candles = closes_to_candles(&closes);
        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);

        let params = RsiDivergenceParams {
            rsi_period: 14,
            lookback: 60,
        };
        assert!(RsiDivergence.check(&ctx, &params).await.unwrap().is_empty());
    }
}
