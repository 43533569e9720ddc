use super::{default_atr_period, SignalContext, Strategy, StrategyKind};
use crate::analysis::indicators::{atr, last_two_valid};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct VolatilityBreakoutParams {
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// 未啟用動態 ATR 倍數時使用
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
}

fn default_atr_multiplier() -> f64 {
    2.5
}

fn default_volume_multiplier() -> f64 {
    2.0
}

/// 當前 K 線振幅超過前一根 ATR 的動態倍數
pub struct VolatilityBreakout;

#[async_trait]
impl Strategy for VolatilityBreakout {
    type Params = VolatilityBreakoutParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::VolatilityBreakout
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let multiplier = ctx
            .settings
            .dynamic_atr_multipliers
            .as_ref()
            .map(|dyn_conf| dyn_conf.value_for_rank(ctx.rank, params.atr_multiplier))
            .unwrap_or(params.atr_multiplier);

        let atr_values = atr(candles, params.atr_period);
        let Some((prev, cur)) = last_two_valid(&[atr_values.as_slice()], candles.len()) else {
            return Ok(Vec::new());
        };
        let Some(reference_atr) = atr_values[prev].filter(|v| *v != 0.0) else {
            return Ok(Vec::new());
        };

        let current_volatility = candles[cur].range();
        let threshold = reference_atr * multiplier;
        if current_volatility <= threshold {
            return Ok(Vec::new());
        }

        let trend = current_trend(candles, ctx.timeframe, ctx.settings);
        let body = format!(
            "{}**波动分析**:\n\
             > **当前波幅**: `{:.4}` **(为参考ATR的 {:.1} 倍)**\n\
             > **动态基准 (参考ATR)**: `{:.4}`\n\
             > **波动阈值({:.1}x)**: `{:.4}`\n\n",
            trend.headline(),
            current_volatility,
            current_volatility / reference_atr,
            reference_atr,
            multiplier,
            threshold
        );

        Ok(vec![AlertCandidate {
            log_name: "Volatility Breakout".to_string(),
            alert_key: format!("{}_{}_VOLATILITY_REALTIME", ctx.symbol, ctx.timeframe),
            title: format!("💥 {{vol_label}}盘中波动异常: {} ({})", ctx.symbol, ctx.timeframe),
            body,
            volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
            fallback_volume_multiplier: params.volume_multiplier,
            cooldown_multiplier: 1.0,
        }])
    }
}
