use crate::utils::error::{MonitorError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// 日誌輸出設定（對應設定檔的 `[logging]` 區塊與 CLI 參數）
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    pub level: String,
    pub verbose: bool,
    pub json: bool,
    pub file: Option<String>,
}

fn build_filter(options: &LoggerOptions) -> EnvFilter {
    let level = if options.verbose {
        "debug".to_string()
    } else if options.level.trim().is_empty() {
        "info".to_string()
    } else {
        options.level.to_lowercase()
    };

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "signal_monitor={level},deploy={level},export_code={level},reqwest=info,hyper=info,warn"
        ))
    })
}

pub fn init_logger(options: &LoggerOptions) -> Result<()> {
    let console: Box<dyn Layer<Registry> + Send + Sync> = if options.json {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    // 檔案日誌保留執行緒名稱與 target，方便事後排查並發掃描
    let file_layer = match &options.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(build_filter(options))
        .try_init()
        .map_err(|e| MonitorError::ProcessingError {
            message: format!("Failed to initialise logger: {}", e),
        })
}

/// CLI 工具（deploy / export-code）用的精簡初始化
pub fn init_cli_logger(verbose: bool) {
    let options = LoggerOptions {
        level: "info".to_string(),
        verbose,
        ..Default::default()
    };
    if let Err(e) = init_logger(&options) {
        eprintln!("⚠️ {}", e);
    }
}
