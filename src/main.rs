use clap::Parser;
use signal_monitor::config::cli::MonitorArgs;
use signal_monitor::core::notifications::{build_notifiers, spawn_consumer};
use signal_monitor::core::scheduler::{run_scheduler, run_startup, wait_for_shutdown_signal};
use signal_monitor::core::{build_exchange, AppContext, NotificationQueue};
use signal_monitor::strategies::StrategyKind;
use signal_monitor::utils::error::{ErrorSeverity, MonitorError};
use signal_monitor::utils::logger::{init_logger, LoggerOptions};
use signal_monitor::utils::monitor::SystemMonitor;
use signal_monitor::utils::validation::Validate;
use signal_monitor::MonitorConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let args = MonitorArgs::parse();

    let (config, config_path) = match MonitorConfig::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let logger_options = LoggerOptions {
        level: config.app.log_level.clone(),
        verbose: args.verbose,
        json: config.logging.json,
        file: config.logging.file.clone(),
    };
    if let Err(e) = init_logger(&logger_options) {
        eprintln!("⚠️ {}", e);
    }

    tracing::info!("📁 Loaded configuration from {}", config_path.display());

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - exchange will not be contacted");
        return;
    }

    if let Err(e) = run(config, &args).await {
        tracing::error!(
            "❌ Monitor failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: MonitorConfig, args: &MonitorArgs) -> Result<(), MonitorError> {
    let exchange = build_exchange(&config)?;
    let notifiers = build_notifiers(&config.notification)?;
    if notifiers.is_empty() {
        tracing::warn!("⚠️ All notifiers are disabled, alerts will only be logged");
    }

    let monitor = Arc::new(SystemMonitor::new(args.monitor));
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    tracing::info!(
        "🚀 Signal monitor started | exchange: {} | market: {} | interval: {} min",
        config.app.exchange,
        config.app.market_type,
        config.app.check_interval_minutes
    );

    let shutdown = CancellationToken::new();
    let (queue, receiver) = NotificationQueue::channel();
    let consumer = spawn_consumer(receiver, notifiers, shutdown.clone());
    let ctx = Arc::new(AppContext::new(config, exchange, queue));

    if args.once {
        run_startup(&ctx, &monitor).await;
        // 關閉佇列後等待剩餘通知送出
        drop(ctx);
        if tokio::time::timeout(Duration::from_secs(120), consumer).await.is_err() {
            tracing::warn!("⚠️ Timed out waiting for pending notifications");
        }
        return Ok(());
    }

    let startup_and_schedule = {
        let ctx = ctx.clone();
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = run_startup(&ctx, &monitor) => {}
            }
            run_scheduler(ctx, monitor, shutdown).await;
        }
    };

    tokio::select! {
        _ = startup_and_schedule => {}
        _ = wait_for_shutdown_signal() => {}
    }
    shutdown.cancel();

    if consumer.await.is_err() {
        tracing::warn!("⚠️ Notification consumer ended abnormally");
    }
    tracing::info!("👋 Signal monitor stopped");
    Ok(())
}

fn display_config_summary(config: &MonitorConfig, args: &MonitorArgs) {
    println!("📋 Configuration Summary:");
    println!(
        "  Exchange: {} ({})",
        config.app.exchange, config.app.market_type
    );
    println!("  Timeframes: {}", config.market.timeframes.join(", "));
    println!(
        "  Check interval: {} min, workers: {}",
        config.app.check_interval_minutes, config.app.max_workers
    );

    let dynamic = &config.market.dynamic_scan;
    if dynamic.enabled {
        println!(
            "  Dynamic scan: top {} by {} volume",
            dynamic.top_n_for_signals, dynamic.primary_quote_currency
        );
    }
    if !config.market.static_symbols.is_empty() {
        println!("  Static symbols: {}", config.market.static_symbols.join(", "));
    }

    let strategies: Vec<String> = StrategyKind::ALL
        .iter()
        .filter(|kind| !config.strategies.param_sets(**kind).is_empty())
        .map(|kind| format!("{} x{}", kind, config.strategies.param_sets(*kind).len()))
        .collect();
    println!("  Strategies: {}", strategies.join(", "));

    println!(
        "  Notifiers: dingtalk={} console={}",
        config.notification.dingtalk.enabled, config.notification.console.enabled
    );
    println!(
        "  Reports: daily={} periodic={}",
        config.daily_report_enabled(),
        config.periodic_report_enabled()
    );
    println!("  State file: {}", config.app.state_file);

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
