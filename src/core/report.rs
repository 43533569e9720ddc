//! Market reports: top gainers, volume anomalies and consecutive-up streaks
//! over the hottest symbols, computed on the last closed candle.

use crate::config::toml_config::{DailyReportSettings, PeriodicReportSettings};
use crate::core::context::AppContext;
use crate::core::market_data::fetch_candles;
use crate::core::universe::refresh_symbol_cache;
use crate::domain::model::Candle;
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use std::fmt::Write;

const REPORT_CANDLES: usize = 200;
pub const REPORT_SYMBOL: &str = "Market Report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Daily,
    Periodic,
}

impl ReportKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Periodic => "periodic",
        }
    }
}

/// 兩種報告共用的參數
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub timeframe: String,
    pub top_n_by_volume: usize,
    pub top_n_gainers: usize,
    pub top_n_volume_ratio: usize,
    pub volume_ma_period: usize,
    pub min_streak: usize,
}

impl From<&DailyReportSettings> for ReportOptions {
    fn from(s: &DailyReportSettings) -> Self {
        Self {
            timeframe: "1d".to_string(),
            top_n_by_volume: s.top_n_by_volume,
            top_n_gainers: s.top_n_gainers,
            top_n_volume_ratio: s.top_n_volume_ratio,
            volume_ma_period: s.volume_ma_period,
            min_streak: s.min_consecutive_days,
        }
    }
}

impl From<&PeriodicReportSettings> for ReportOptions {
    fn from(s: &PeriodicReportSettings) -> Self {
        Self {
            timeframe: s.run_interval.clone(),
            top_n_by_volume: s.top_n_by_volume,
            top_n_gainers: s.top_n_gainers,
            top_n_volume_ratio: s.top_n_volume_ratio,
            volume_ma_period: s.volume_ma_period,
            min_streak: s.min_consecutive_candles,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAnomaly {
    pub ratio: f64,
    pub volume: f64,
    pub volume_ma: f64,
}

/// 單一交易對在最後一根已收盤 K 線上的統計
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolStats {
    pub symbol: String,
    pub gain_pct: Option<f64>,
    pub streak: usize,
    pub volume: Option<VolumeAnomaly>,
}

/// 最後一根 K 線視為未收盤；歷史不足 `volume_ma_period + 2` 根時回傳 `None`
pub fn analyze_candles(symbol: &str, candles: &[Candle], volume_ma_period: usize) -> Option<SymbolStats> {
    if volume_ma_period == 0 || candles.len() < volume_ma_period + 2 {
        return None;
    }

    let closed_index = candles.len() - 2;
    let closed = &candles[closed_index];

    let gain_pct = (closed.open > 0.0).then(|| (closed.close - closed.open) / closed.open * 100.0);

    let streak = candles[..=closed_index]
        .iter()
        .rev()
        .take_while(|c| c.is_bullish())
        .count();

    let window = &candles[closed_index - volume_ma_period..closed_index];
    let volume_ma = window.iter().map(|c| c.volume).sum::<f64>() / volume_ma_period as f64;
    let volume = (volume_ma > 0.0).then(|| VolumeAnomaly {
        ratio: closed.volume / volume_ma,
        volume: closed.volume,
        volume_ma,
    });

    Some(SymbolStats {
        symbol: symbol.to_string(),
        gain_pct,
        streak,
        volume,
    })
}

fn medal(index: usize, tail: &'static str) -> &'static str {
    match index {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => tail,
    }
}

fn fire(streak: usize) -> String {
    match streak {
        n if n > 3 => "🔥".repeat(n / 2),
        3 => "🔥".to_string(),
        _ => String::new(),
    }
}

pub fn report_title(kind: ReportKind, timeframe: &str, now: DateTime<FixedOffset>) -> String {
    match kind {
        ReportKind::Daily => format!(
            "📰 {} 合约市场热点报告",
            (now - Duration::days(1)).format("%Y-%m-%d")
        ),
        ReportKind::Periodic => format!(
            "📰 {} ({}周期) 合约市场热点报告",
            now.format("%Y-%m-%d %H:%M"),
            timeframe
        ),
    }
}

/// 組合報告內容；沒有任何段落時為空字串
pub fn render_report(kind: ReportKind, opts: &ReportOptions, stats: &[SymbolStats]) -> String {
    let tf = &opts.timeframe;
    let (gainers_header, volume_header, volume_word, streak_header, streak_unit) = match kind {
        ReportKind::Daily => (
            "### 🚀 合约昨日涨幅榜".to_string(),
            "### 📈 昨日成交量异动榜".to_string(),
            "昨日量",
            "### 💪 连涨强势合约".to_string(),
            "天",
        ),
        ReportKind::Periodic => (
            format!("### 🚀 {} 周期涨幅榜", tf),
            format!("### 📈 {} 周期成交量异动", tf),
            "周期量",
            format!("### 💪 {} 周期连涨强势合约", tf),
            "根",
        ),
    };

    let mut message = String::new();

    let mut gainers: Vec<(&str, f64)> = stats
        .iter()
        .filter_map(|s| s.gain_pct.map(|g| (s.symbol.as_str(), g)))
        .collect();
    if !gainers.is_empty() {
        gainers.sort_by(|a, b| b.1.total_cmp(&a.1));
        let _ = write!(message, "{}\n\n", gainers_header);
        for (i, (symbol, gain)) in gainers.iter().take(opts.top_n_gainers).enumerate() {
            let _ = write!(message, "{} **{}**\n> **涨幅: {:.2}%**\n\n", medal(i, "🔥"), symbol, gain);
        }
    }

    let mut ratios: Vec<(&str, &VolumeAnomaly)> = stats
        .iter()
        .filter_map(|s| s.volume.as_ref().map(|v| (s.symbol.as_str(), v)))
        .collect();
    if !ratios.is_empty() {
        ratios.sort_by(|a, b| b.1.ratio.total_cmp(&a.1.ratio));
        let _ = write!(message, "\n---\n\n{}\n\n", volume_header);
        for (i, (symbol, v)) in ratios.iter().take(opts.top_n_volume_ratio).enumerate() {
            let _ = write!(
                message,
                "{} **{}**\n> **放量倍数: {:.2} 倍**\n> ({}: {:.0}, 均量: {:.0})\n\n",
                medal(i, "⚡️"),
                symbol,
                v.ratio,
                volume_word,
                v.volume,
                v.volume_ma
            );
        }
    }

    let mut streaks: Vec<(&str, usize)> = stats
        .iter()
        .filter(|s| s.streak >= opts.min_streak)
        .map(|s| (s.symbol.as_str(), s.streak))
        .collect();
    if !streaks.is_empty() {
        streaks.sort_by(|a, b| b.1.cmp(&a.1));
        let _ = write!(message, "\n---\n\n{}\n\n", streak_header);
        for (symbol, streak) in streaks {
            let _ = write!(
                message,
                "💪 **{}**\n> **连涨: {} {}** {}\n\n",
                symbol,
                streak,
                streak_unit,
                fire(streak)
            );
        }
    }

    message
}

fn beijing_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// 產生並推送市場報告；回傳是否有送出內容
pub async fn run_market_report(ctx: &AppContext, kind: ReportKind) -> bool {
    let opts = match kind {
        ReportKind::Daily => ctx.config.daily_report.as_ref().map(ReportOptions::from),
        ReportKind::Periodic => ctx.config.periodic_report.as_ref().map(ReportOptions::from),
    };
    let Some(opts) = opts else {
        tracing::warn!("⚠️ No [{}_report] section configured", kind.label());
        return false;
    };

    tracing::info!("--- 📊 Starting {} market report ({}) ---", kind.label(), opts.timeframe);

    refresh_symbol_cache(
        ctx.exchange.as_ref(),
        &ctx.config,
        &ctx.symbols,
        ctx.config.universe_fetch_size(opts.top_n_by_volume),
        true,
    )
    .await;

    let symbols = ctx.symbols.snapshot().await;
    if symbols.is_empty() {
        tracing::warn!("⚠️ Report aborted: symbol cache is empty");
        return false;
    }

    let pause = ctx.exchange.rate_limit() / 2;
    let mut stats = Vec::new();
    for symbol in symbols.iter().take(opts.top_n_by_volume) {
        if let Some(candles) =
            fetch_candles(ctx.exchange.as_ref(), symbol, &opts.timeframe, REPORT_CANDLES).await
        {
            stats.extend(analyze_candles(symbol, &candles, opts.volume_ma_period));
        }
        tokio::time::sleep(pause).await;
    }

    tracing::info!("📈 Analysed {} symbols for the {} report", stats.len(), kind.label());

    let message = render_report(kind, &opts, &stats);
    if message.is_empty() {
        tracing::info!("ℹ️ Nothing to report");
        return false;
    }

    let title = report_title(kind, &opts.timeframe, beijing_now());
    ctx.queue.send_alert(&title, &message, REPORT_SYMBOL);
    tracing::info!("--- ✅ {} market report queued ---", kind.label());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use chrono::TimeZone;

    fn options() -> ReportOptions {
        ReportOptions {
            timeframe: "4h".to_string(),
            top_n_by_volume: 100,
            top_n_gainers: 10,
            top_n_volume_ratio: 10,
            volume_ma_period: 3,
            min_streak: 2,
        }
    }

    fn history() -> Vec<Candle> {
        vec![
            candle(0, 10.0, 11.0, 9.0, 9.5, 100.0),
            candle(1, 9.5, 10.0, 9.0, 9.8, 100.0),
            candle(2, 9.8, 10.5, 9.7, 10.2, 100.0),
            candle(3, 10.2, 10.8, 10.1, 10.5, 100.0),
            candle(4, 10.0, 11.5, 10.0, 11.0, 300.0),
            // 未收盤
            candle(5, 11.0, 11.2, 10.0, 10.1, 5.0),
        ]
    }

    #[test]
    fn test_analyze_last_closed_candle() {
        let stats = analyze_candles("BTC/USDT:USDT", &history(), 3).unwrap();

        assert!((stats.gain_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(stats.streak, 4);
        let volume = stats.volume.unwrap();
        assert!((volume.volume_ma - 100.0).abs() < 1e-9);
        assert!((volume.ratio - 3.0).abs() < 1e-9);

        assert!(analyze_candles("BTC/USDT:USDT", &history()[..4], 3).is_none());
    }

    #[test]
    fn test_render_periodic_report() {
        let stats = vec![
            SymbolStats {
                symbol: "AAA".to_string(),
                gain_pct: Some(2.0),
                streak: 1,
                volume: Some(VolumeAnomaly { ratio: 1.5, volume: 150.0, volume_ma: 100.0 }),
            },
            SymbolStats {
                symbol: "BBB".to_string(),
                gain_pct: Some(8.0),
                streak: 4,
                volume: None,
            },
        ];

        let message = render_report(ReportKind::Periodic, &options(), &stats);
        assert!(message.starts_with("### 🚀 4h 周期涨幅榜\n\n🥇 **BBB**\n> **涨幅: 8.00%**\n\n🥈 **AAA**"));
        assert!(message.contains("### 📈 4h 周期成交量异动\n\n🥇 **AAA**\n> **放量倍数: 1.50 倍**\n> (周期量: 150, 均量: 100)"));
        assert!(message.contains("💪 **BBB**\n> **连涨: 4 根** 🔥🔥"));
        assert!(!message.contains("💪 **AAA**"));
    }

    #[test]
    fn test_render_daily_sections_and_empty() {
        let stats = vec![SymbolStats {
            symbol: "CCC".to_string(),
            gain_pct: None,
            streak: 3,
            volume: None,
        }];
        let mut opts = options();
        opts.timeframe = "1d".to_string();

        assert_eq!(
            render_report(ReportKind::Daily, &opts, &stats),
            "\n---\n\n### 💪 连涨强势合约\n\n💪 **CCC**\n> **连涨: 3 天** 🔥\n\n"
        );
        assert!(render_report(ReportKind::Daily, &opts, &[]).is_empty());
    }

    #[test]
    fn test_report_titles() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();

        assert_eq!(report_title(ReportKind::Daily, "1d", now), "📰 2024-02-29 合约市场热点报告");
        assert_eq!(
            report_title(ReportKind::Periodic, "4h", now),
            "📰 2024-03-01 08:30 (4h周期) 合约市场热点报告"
        );
    }
}
