use super::{default_atr_period, default_volume_multiplier, SignalContext, Strategy, StrategyKind};
use crate::analysis::indicators::{atr, last_two_valid};
use crate::analysis::levels::{pivot_points, price_interest_zones, split_levels, ZoneParams};
use crate::analysis::trend::current_trend;
use crate::domain::model::{AlertCandidate, PriceLevel, Trend, VolumePolicy};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LevelBreakoutParams {
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default = "default_break_multiplier")]
    pub atr_multiplier_breakout: f64,
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
    #[serde(default)]
    pub level_detection: LevelDetection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelDetection {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub clustering: ClusteringParams,
    #[serde(default)]
    pub pivots: PivotParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringParams {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_grouping")]
    pub atr_grouping_multiplier: f64,
    #[serde(default = "default_cluster_size")]
    pub min_cluster_size: usize,
    #[serde(default = "default_separation")]
    pub min_separation_atr_mult: f64,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            enabled: false,
            atr_grouping_multiplier: default_grouping(),
            min_cluster_size: default_cluster_size(),
            min_separation_atr_mult: default_separation(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PivotParams {
    #[serde(default)]
    pub enabled: bool,
}

fn default_break_multiplier() -> f64 {
    0.1
}
fn default_grouping() -> f64 {
    0.5
}
fn default_cluster_size() -> usize {
    2
}
fn default_separation() -> f64 {
    1.0
}

/// 放量突破最近的阻力 / 跌破最近的支撐
pub struct LevelBreakout;

impl LevelBreakout {
    async fn collect_levels(&self, ctx: &SignalContext<'_>, detection: &LevelDetection) -> Vec<PriceLevel> {
        let mut levels = Vec::new();

        if detection.clustering.enabled {
            let cluster = &detection.clustering;
            levels.extend(price_interest_zones(
                ctx.candles,
                ZoneParams {
                    atr_grouping_multiplier: cluster.atr_grouping_multiplier,
                    min_cluster_size: cluster.min_cluster_size,
                    min_separation_atr_mult: cluster.min_separation_atr_mult,
                },
            ));
        }

        if detection.pivots.enabled {
            match ctx.exchange.fetch_ohlcv(ctx.symbol, "1d", 2).await {
                Ok(daily) if daily.len() >= 2 => {
                    let (resistances, supports) = pivot_points(&daily[daily.len() - 2]);
                    levels.extend(resistances);
                    levels.extend(supports);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Failed to fetch pivot data for {}: {}", ctx.symbol, e),
            }
        }

        levels
    }
}

#[async_trait]
impl Strategy for LevelBreakout {
    type Params = LevelBreakoutParams;

    fn kind(&self) -> StrategyKind {
        StrategyKind::LevelBreakout
    }

    async fn check(
        &self,
        ctx: &SignalContext<'_>,
        params: &Self::Params,
    ) -> Result<Vec<AlertCandidate>> {
        if params.level_detection.method != "advanced" {
            return Ok(Vec::new());
        }
        let candles = ctx.candles;
        let atr_values = atr(candles, params.atr_period);
        let Some((prev, cur)) = last_two_valid(&[atr_values.as_slice()], candles.len()) else {
            return Ok(Vec::new());
        };
        let Some(atr_now) = atr_values[cur].filter(|v| *v != 0.0) else {
            return Ok(Vec::new());
        };
        let buffer = atr_now * params.atr_multiplier_breakout;
        let (current, previous) = (&candles[cur], &candles[prev]);

        // 阻力與支撐以前一根收盤價劃分
        let levels = self.collect_levels(ctx, &params.level_detection).await;
        let (resistances, supports) = split_levels(levels, previous.close);
        if resistances.is_empty() && supports.is_empty() {
            return Ok(Vec::new());
        }
        let trend = current_trend(candles, ctx.timeframe, ctx.settings);

        let mut alerts = Vec::new();

        if let Some(resistance) = resistances.first() {
            let breakout = current.close > resistance.level + buffer && previous.close < resistance.level;
            if breakout && matches!(trend, Trend::Bullish | Trend::Ranging) {
                alerts.push(level_alert(ctx, params, resistance, current.close, true));
            }
        }

        if let Some(support) = supports.first() {
            let breakdown = current.close < support.level - buffer && previous.close > support.level;
            if breakdown && matches!(trend, Trend::Bearish | Trend::Ranging) {
                alerts.push(level_alert(ctx, params, support, current.close, false));
            }
        }

        Ok(alerts)
    }
}

fn level_alert(
    ctx: &SignalContext<'_>,
    params: &LevelBreakoutParams,
    level: &PriceLevel,
    current_price: f64,
    is_resistance: bool,
) -> AlertCandidate {
    let prefix = if level.is_confluence() {
        "🔥共振区域"
    } else {
        "水平位"
    };
    let (log_name, key_side, emoji, action) = if is_resistance {
        ("Level Breakout", "resistance", "🚨", "突破关键阻力")
    } else {
        ("Level Breakdown", "support", "📉", "跌破关键支撑")
    };

    AlertCandidate {
        log_name: log_name.to_string(),
        alert_key: format!(
            "{}_{}_breakout_{}_{:.4}",
            ctx.symbol, ctx.timeframe, key_side, level.level
        ),
        title: format!("{} {{vol_label}}{}: {} ({})", emoji, action, ctx.symbol, ctx.timeframe),
        body: format!(
            "**信号**: **{{vol_label}}{}**!\n\n\
             **价格行为**: {} ({})\n\
             > **关键价位**: {:.4}\n\
             > **当前价格**: {:.4}\n\n",
            action,
            prefix,
            level.kind_label(),
            level.level,
            current_price
        ),
        volume_policy: VolumePolicy::MustConfirm,
        fallback_volume_multiplier: params.volume_multiplier,
        cooldown_multiplier: 1.0,
    }
}
