use crate::config::resolve_params;
use crate::core::alerts::DispatchOutcome;
use crate::core::context::AppContext;
use crate::core::market_data::fetch_candles;
use crate::core::universe::{refresh_symbol_cache, use_static_symbols};
use crate::domain::model::Candle;
use crate::strategies::{evaluate, CommonParams, SignalContext, StrategyKind};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::time::Instant;

/// 一輪掃描的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub symbols: usize,
    pub candidates: usize,
    pub queued: usize,
}

/// 更新監控列表後並發檢查所有交易對（最多 `max_workers` 個同時進行）
pub async fn run_signal_check_cycle(ctx: &AppContext) -> ScanSummary {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("🔄 Starting signal check cycle");
    let started = Instant::now();

    let dynamic = &ctx.config.market.dynamic_scan;
    if dynamic.enabled {
        refresh_symbol_cache(
            ctx.exchange.as_ref(),
            &ctx.config,
            &ctx.symbols,
            dynamic.top_n_for_signals,
            false,
        )
        .await;
    } else {
        use_static_symbols(&ctx.config, &ctx.symbols).await;
    }

    let symbols = ctx.symbols.snapshot().await;
    if symbols.is_empty() {
        tracing::warn!("⚠️ No symbols to monitor");
        return ScanSummary::default();
    }

    tracing::info!("🔍 Scanning {} symbols concurrently", symbols.len());
    let max_workers = ctx.config.app.max_workers.max(1);

    let results: Vec<ScanSummary> = stream::iter(symbols.iter().enumerate())
        .map(|(index, symbol)| check_symbol(ctx, symbol, index + 1))
        .buffer_unordered(max_workers)
        .collect()
        .await;

    let summary = results.into_iter().fold(
        ScanSummary {
            symbols: symbols.len(),
            ..Default::default()
        },
        |mut total, part| {
            total.candidates += part.candidates;
            total.queued += part.queued;
            total
        },
    );

    tracing::info!(
        "✅ Signal check cycle finished in {:.1}s: {} symbols, {} signals, {} queued",
        started.elapsed().as_secs_f64(),
        summary.symbols,
        summary.candidates,
        summary.queued
    );
    summary
}

async fn check_symbol(ctx: &AppContext, symbol: &str, rank: usize) -> ScanSummary {
    tracing::debug!("--- Checking {} (rank {}) ---", symbol, rank);
    let mut summary = ScanSummary::default();
    let limit = StrategyKind::max_lookback();

    for timeframe in &ctx.config.market.timeframes {
        let Some(candles) = fetch_candles(ctx.exchange.as_ref(), symbol, timeframe, limit).await else {
            tracing::debug!("No data for {} {}, skipping this round", symbol, timeframe);
            continue;
        };

        let part = check_timeframe(ctx, symbol, timeframe, &candles, rank).await;
        summary.candidates += part.candidates;
        summary.queued += part.queued;
    }

    summary
}

async fn check_timeframe(
    ctx: &AppContext,
    symbol: &str,
    timeframe: &str,
    candles: &[Candle],
    rank: usize,
) -> ScanSummary {
    let mut summary = ScanSummary::default();
    let signal_ctx = SignalContext {
        symbol,
        timeframe,
        candles,
        settings: &ctx.config.strategies,
        rank: Some(rank),
        exchange: ctx.exchange.as_ref(),
    };

    for kind in StrategyKind::ALL {
        for (index, params) in ctx.config.strategies.param_sets(kind).iter().enumerate() {
            let common: CommonParams = match resolve_params(params, timeframe) {
                Ok(common) => common,
                Err(e) => {
                    tracing::error!("❌ Bad parameters for {} #{}: {}", kind, index, e);
                    continue;
                }
            };
            if !common.applies_to(timeframe) {
                if common.enabled {
                    tracing::trace!(
                        "{} ({}) skipped on {}",
                        kind,
                        common.name.clone().unwrap_or_else(|| index.to_string()),
                        timeframe
                    );
                }
                continue;
            }

            let candidates = match evaluate(kind, &signal_ctx, params).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!("❌ Strategy {} on {} {} failed: {}", kind, symbol, timeframe, e);
                    continue;
                }
            };

            for candidate in candidates {
                summary.candidates += 1;
                match ctx.dispatcher.dispatch(&signal_ctx, candidate, Utc::now()).await {
                    Ok(DispatchOutcome::Queued) => summary.queued += 1,
                    Ok(_) => {}
                    Err(e) => tracing::error!("❌ Failed to dispatch alert for {}: {}", symbol, e),
                }
            }
        }
    }

    summary
}
