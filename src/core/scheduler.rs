use crate::core::context::AppContext;
use crate::core::report::{run_market_report, ReportKind};
use crate::core::scanner::run_signal_check_cycle;
use crate::utils::monitor::SystemMonitor;
use crate::utils::timeframe::timeframe_to_minutes;
use crate::utils::validation::parse_clock_time;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// 啟動時先跑一輪掃描，啟用時再跑一次日報
pub async fn run_startup(ctx: &AppContext, monitor: &SystemMonitor) {
    tracing::info!("📌 Running the first signal check cycle");
    run_signal_check_cycle(ctx).await;
    monitor.log_stats("Startup scan");

    if ctx.config.daily_report_enabled() {
        tracing::info!("📌 Running the first daily report");
        run_market_report(ctx, ReportKind::Daily).await;
    }
}

/// 下一次北京時間 `hour:minute` 對應的 UTC 時刻（嚴格晚於 `now`）
pub fn next_daily_run(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let Some(offset) = FixedOffset::east_opt(BEIJING_OFFSET_SECS) else {
        return now + ChronoDuration::days(1);
    };
    let Some(at) = NaiveTime::from_hms_opt(hour, minute, 0) else {
        return now + ChronoDuration::days(1);
    };

    let local = now.with_timezone(&offset);
    let today = local.date_naive().and_time(at);
    let candidate = today - ChronoDuration::seconds(BEIJING_OFFSET_SECS as i64);
    let candidate = candidate.and_utc();

    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

/// 固定週期執行；同一任務不重疊，錯過的觸發直接略過
async fn run_every<F, Fut>(name: &str, period: Duration, shutdown: &CancellationToken, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                tracing::debug!("⏰ {} triggered", name);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = job() => {}
                }
            }
        }
    }
    tracing::info!("🛑 {} stopped", name);
}

async fn run_daily(ctx: &AppContext, hour: u32, minute: u32, shutdown: &CancellationToken) {
    loop {
        let now = Utc::now();
        let next = next_daily_run(now, hour, minute);
        let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
        tracing::info!("📅 Next daily report at {} UTC", next.format("%Y-%m-%d %H:%M"));

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = run_market_report(ctx, ReportKind::Daily) => {}
        }
    }
    tracing::info!("🛑 Daily report stopped");
}

/// 依設定同時執行掃描、日報與週期報告，直到收到關閉訊號
pub async fn run_scheduler(ctx: Arc<AppContext>, monitor: Arc<SystemMonitor>, shutdown: CancellationToken) {
    let scan_period = Duration::from_secs(ctx.config.app.check_interval_minutes.max(1) * 60);
    tracing::info!(
        "   - Signal check every {} minute(s)",
        ctx.config.app.check_interval_minutes
    );

    let app: &AppContext = &ctx;
    let stats: &SystemMonitor = &monitor;

    let scan = run_every("Signal check", scan_period, &shutdown, || async move {
        run_signal_check_cycle(app).await;
        stats.log_stats("Scan cycle");
    });

    let daily = async {
        let Some(report) = ctx.config.daily_report.as_ref().filter(|d| d.enabled) else {
            return;
        };
        match parse_clock_time("daily_report.scan_time_beijing", &report.scan_time_beijing) {
            Ok((hour, minute)) => {
                tracing::info!("   - Daily report at {:02}:{:02} Beijing time", hour, minute);
                run_daily(app, hour, minute, &shutdown).await;
            }
            Err(e) => tracing::error!("❌ Daily report disabled: {}", e),
        }
    };

    let periodic = async {
        let Some(report) = ctx.config.periodic_report.as_ref().filter(|p| p.enabled) else {
            return;
        };
        let minutes = timeframe_to_minutes(&report.run_interval);
        if minutes == 0 {
            tracing::error!("❌ Periodic report disabled: bad run_interval '{}'", report.run_interval);
            return;
        }
        tracing::info!("   - Periodic report every {}", report.run_interval);
        run_every("Periodic report", Duration::from_secs(minutes * 60), &shutdown, || async move {
            run_market_report(app, ReportKind::Periodic).await;
        })
        .await;
    };

    tracing::info!("📅 Scheduler started, press Ctrl+C to exit");
    tokio::join!(scan, daily, periodic);
}

/// 等待 Ctrl+C 或 SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("👋 Shutdown signal received, stopping gracefully...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_next_daily_run_in_beijing_time() {
        // 北京 08:00 → 同日 08:30
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 8, 30),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap()
        );

        // 已過時間 → 隔天
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 8, 30),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 30, 0).unwrap()
        );

        // UTC 20:00 已是北京隔日 04:00
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 8, 30),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 30, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_every_ticks_until_cancelled() {
        let shutdown = CancellationToken::new();
        let counter = AtomicUsize::new(0);
        let runs = &counter;

        let job = run_every("test", Duration::from_secs(60), &shutdown, || async move {
            runs.fetch_add(1, Ordering::SeqCst);
        });
        let stopper = async {
            tokio::time::sleep(Duration::from_secs(190)).await;
            shutdown.cancel();
        };
        tokio::join!(job, stopper);

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
