use super::{default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::indicators::{kdj, last_two_valid};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, Trend, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct KdjCrossParams {
    #[serde(default = "default_fast_k")]
    pub fast_k: usize,
    #[serde(default = "default_slow_d")]
    pub slow_d: usize,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
}

fn default_fast_k() -> usize {
    9
}

fn default_slow_d() -> usize {
    3
}

/// K/D 金叉死叉，依當前趨勢解讀為順勢、警示或震盪訊號
pub struct KdjCross;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Golden,
    Death,
}

fn describe(trend: Trend, cross: Cross) -> &'static str {
    match (trend, cross) {
        (Trend::Bullish, Cross::Golden) => "顺势看涨 (入场机会)",
        (Trend::Bullish, Cross::Death) => "回调警示 (减仓风险)",
        (Trend::Bearish, Cross::Death) => "顺势看跌 (入场机会)",
        (Trend::Bearish, Cross::Golden) => "反弹警示 (空单止盈/反弹风险)",
        (_, Cross::Golden) => "震荡金叉 (反弹机会)",
        (_, Cross::Death) => "震荡死叉 (下跌机会)",
    }
}

fn emoji_for(signal_tag: &str) -> &'static str {
    match signal_tag.replace("顺势", "").replace("震荡", "").as_str() {
        "看涨" | "金叉" => "📈",
        "看跌" | "死叉" => "📉",
        "警示" => "⚠️",
        "机会" => "💡",
        _ => "⚙️",
    }
}

#[async_trait]
impl Strategy for KdjCross {
    type Params = KdjCrossParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::KdjCross
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let values = kdj(candles, params.fast_k, params.slow_d);
        let Some((prev, cur)) =
            last_two_valid(&[values.k.as_slice(), values.d.as_slice()], candles.len())
        else {
            return Ok(Vec::new());
        };

        let (Some(k), Some(d), Some(prev_k), Some(prev_d)) =
            (values.k[cur], values.d[cur], values.k[prev], values.d[prev])
        else {
            return Ok(Vec::new());
        };

        let cross = if k > d && prev_k <= prev_d {
            Cross::Golden
        } else if k < d && prev_k >= prev_d {
            Cross::Death
        } else {
            return Ok(Vec::new());
        };

        let trend = current_trend(candles, ctx.timeframe, ctx.settings);
        let description = describe(trend, cross);
        let tag = description.split(' ').next().unwrap_or(description);

        let body = format!(
            "{}**信号解读**: {}信号出现。\n\n\
             **当前K/D值**: {:.2} / {:.2}\n\
             **当前价**: {:.4}\n\n",
            trend.headline(),
            description,
            k,
            d,
            candles[cur].close
        );

        Ok(vec![AlertCandidate {
            log_name: "KDJ Cross".to_string(),
            alert_key: format!("{}_{}_KDJ_{}_REALTIME", ctx.symbol, ctx.timeframe, tag),
            title: format!(
                "{} KDJ {{vol_label}}信号: {} ({} {})",
                emoji_for(tag),
                description,
                ctx.symbol,
                ctx.timeframe
            ),
            body,
            volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
            fallback_volume_multiplier: params.volume_multiplier,
            cooldown_multiplier: 0.5,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::config::toml_config::StrategySettings;
    use crate::domain::model::Candle;
    use crate::strategies::tests::{context, OfflineExchange};

    #[test]
    fn test_descriptions_follow_trend() {
        assert_eq!(describe(Trend::Bullish, Cross::Golden), "顺势看涨 (入场机会)");
        assert_eq!(describe(Trend::Bullish, Cross::Death), "回调警示 (减仓风险)");
        assert_eq!(describe(Trend::Bearish, Cross::Golden), "反弹警示 (空单止盈/反弹风险)");
        assert_eq!(describe(Trend::Unknown, Cross::Death), "震荡死叉 (下跌机会)");
    }

    #[test]
    fn test_emoji_map() {
        assert_eq!(emoji_for("顺势看涨"), "📈");
        assert_eq!(emoji_for("顺势看跌"), "📉");
        assert_eq!(emoji_for("震荡金叉"), "📈");
        assert_eq!(emoji_for("震荡死叉"), "📉");
        assert_eq!(emoji_for("回调警示"), "⚙️");
    }

    #[tokio::test]
    async fn test_golden_cross_after_selloff() {
        // 加速下跌後強勢反彈，K 上穿 D
        let mut candles: Vec<Candle> = (0..30)
            .map(|i| {
                let p = 130.0 - 0.05 * (i * i) as f64;
                candle(i, p + 0.5, p + 1.0, p - 1.0, p - 0.5, 10.0)
            })
            .collect();
        candles.push(candle(30, 88.0, 110.0, 87.5, 109.0, 10.0));

        let settings = StrategySettings::default();
        let exchange = OfflineExchange;
        let ctx = context(&candles, &settings, &exchange);
        let params = KdjCrossParams {
            fast_k: 9,
            slow_d: 3,
            volume_confirm: false,
            volume_multiplier: 1.5,
        };

        let alerts = KdjCross.check(&ctx, &params).await.unwrap();
        assert_eq!(alerts.len(), 1);
        // 未設定趨勢 EMA，視為震盪
        assert_eq!(alerts[0].alert_key, "BTC/USDT:USDT_1h_KDJ_震荡金叉_REALTIME");
        assert!(alerts[0].title.starts_with("📈 KDJ {vol_label}信号: 震荡金叉 (反弹机会)"));
        assert_eq!(alerts[0].cooldown_multiplier, 0.5);
        assert_eq!(alerts[0].volume_policy, VolumePolicy::Annotate);
    }
}
