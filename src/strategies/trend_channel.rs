use super::{default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::channels::{regression_channel, ChannelParams};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, ChannelDirection, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TrendChannelParams {
    #[serde(default = "default_lookback")]
    pub lookback_period: usize,
    #[serde(default = "default_min_trend_length")]
    pub min_trend_length: usize,
    #[serde(default = "default_std_dev_multiplier")]
    pub std_dev_multiplier: f64,
    #[serde(default)]
    pub volume_confirm: bool,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
}

fn default_lookback() -> usize {
    100
}

fn default_min_trend_length() -> usize {
    20
}

fn default_std_dev_multiplier() -> f64 {
    2.0
}

/// 收盤價由回歸通道內穿出上軌或下軌
pub struct TrendChannelBreakout;

#[async_trait]
impl Strategy for TrendChannelBreakout {
    type Params = TrendChannelParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendChannelBreakout
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        let candles = ctx.candles;
        let Some(channel) = regression_channel(
            candles,
            ChannelParams {
                lookback_period: params.lookback_period,
                min_trend_length: params.min_trend_length,
                std_dev_multiplier: params.std_dev_multiplier,
            },
        ) else {
            return Ok(Vec::new());
        };

        // 通道只涵蓋趨勢段，尾端對齊最新 K 線
        let len = channel.trend_length;
        if len < 2 {
            return Ok(Vec::new());
        }
        let (current, previous) = (&candles[candles.len() - 1], &candles[candles.len() - 2]);
        let (upper, prev_upper) = (channel.upper_band[len - 1], channel.upper_band[len - 2]);
        let (lower, prev_lower) = (channel.lower_band[len - 1], channel.lower_band[len - 2]);

        let (side, emoji, action, band) = if current.close > upper && previous.close <= prev_upper {
            ("UP", "🚀", "向上突破通道上轨", upper)
        } else if current.close < lower && previous.close >= prev_lower {
            ("DOWN", "🧊", "向下跌破通道下轨", lower)
        } else {
            return Ok(Vec::new());
        };

        let channel_label = match channel.direction {
            ChannelDirection::Up => "上升通道",
            ChannelDirection::Down => "下降通道",
        };
        let trend = current_trend(candles, ctx.timeframe, ctx.settings);

        let body = format!(
            "{}**信号**: 价格 **实时{}**。\n\n\
             **通道详情**:\n\
             > **通道类型**: {} (近 {} 根K线)\n\
             > **回归斜率**: {:.6}\n\
             > **轨道价位**: {:.4}\n\
             > **当前价**: {:.4}\n\n",
            trend.headline(),
            action,
            channel_label,
            len,
            channel.slope,
            band,
            current.close
        );

        Ok(vec![AlertCandidate {
            log_name: "Trend Channel Breakout".to_string(),
            alert_key: format!("{}_{}_CHANNEL_{}_REALTIME", ctx.symbol, ctx.timeframe, side),
            title: format!(
                "{} {{vol_label}}{}: {} ({})",
                emoji, action, ctx.symbol, ctx.timeframe
            ),
            body,
            volume_policy: VolumePolicy::from_confirm_flag(params.volume_confirm),
            fallback_volume_multiplier: params.volume_multiplier,
            cooldown_multiplier: 1.0,
        }])
    }
}
