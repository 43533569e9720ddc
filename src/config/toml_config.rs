use crate::analysis::dynamic::DynamicValueConfig;
use crate::domain::model::MarketType;
use crate::strategies::StrategyKind;
use crate::utils::error::{MonitorError, Result};
use crate::utils::timeframe::timeframe_to_minutes;
use crate::utils::validation::{
    parse_clock_time, validate_non_empty_string, validate_one_of, validate_path,
    validate_positive_number, validate_timeframe, validate_url, Validate,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["monitor.toml", "config/monitor.toml"];
pub const SUPPORTED_EXCHANGES: [&str; 1] = ["binance"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub app: AppSettings,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub notification: NotificationSettings,
    #[serde(default)]
    pub strategies: StrategySettings,
    pub daily_report: Option<DailyReportSettings>,
    pub periodic_report: Option<PeriodicReportSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub exchange: String,
    #[serde(default)]
    pub market_type: MarketType,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,
    #[serde(default)]
    pub static_symbols: Vec<String>,
    #[serde(default)]
    pub dynamic_scan: DynamicScanSettings,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            timeframes: default_timeframes(),
            static_symbols: Vec::new(),
            dynamic_scan: DynamicScanSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicScanSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_top_n")]
    pub top_n_for_signals: usize,
    #[serde(default)]
    pub exclude_symbols: Vec<String>,
    #[serde(default = "default_primary_quote")]
    pub primary_quote_currency: String,
    #[serde(default)]
    pub cross_market_filter: CrossMarketFilter,
}

impl Default for DynamicScanSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            top_n_for_signals: default_top_n(),
            exclude_symbols: Vec::new(),
            primary_quote_currency: default_primary_quote(),
            cross_market_filter: CrossMarketFilter::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossMarketFilter {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub must_exist_in: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default)]
    pub dingtalk: DingTalkSettings,
    #[serde(default)]
    pub console: ConsoleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DingTalkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
    pub secret: Option<String>,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DingTalkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            secret: None,
            timeout_seconds: default_webhook_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEmaSettings {
    pub fast: usize,
    pub medium: usize,
    pub long: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSettings {
    #[serde(default = "default_volume_ma_period")]
    pub volume_ma_period: usize,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            volume_ma_period: default_volume_ma_period(),
        }
    }
}

/// 策略參數：單一表格或多組參數陣列
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSets {
    One(toml::Table),
    Many(Vec<toml::Table>),
}

impl ParamSets {
    pub fn as_slice(&self) -> &[toml::Table] {
        match self {
            ParamSets::One(table) => std::slice::from_ref(table),
            ParamSets::Many(tables) => tables,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategySettings {
    pub trend_ema_short: Option<TrendEmaSettings>,
    pub trend_ema_long: Option<TrendEmaSettings>,
    pub trend_ema: Option<TrendEmaSettings>,
    #[serde(default)]
    pub volume: VolumeSettings,
    pub dynamic_volume_multipliers: Option<DynamicValueConfig>,
    pub dynamic_atr_multipliers: Option<DynamicValueConfig>,

    pub ema_cross: Option<ParamSets>,
    pub kdj_cross: Option<ParamSets>,
    pub volatility_breakout: Option<ParamSets>,
    pub level_breakout: Option<ParamSets>,
    pub rsi_divergence: Option<ParamSets>,
    pub trend_channel_breakout: Option<ParamSets>,
    pub consecutive_candles: Option<ParamSets>,
    pub order_block_interaction: Option<ParamSets>,
}

impl StrategySettings {
    pub fn param_sets(&self, kind: StrategyKind) -> &[toml::Table] {
        let sets = match kind {
            StrategyKind::EmaCross => &self.ema_cross,
            StrategyKind::KdjCross => &self.kdj_cross,
            StrategyKind::VolatilityBreakout => &self.volatility_breakout,
            StrategyKind::LevelBreakout => &self.level_breakout,
            StrategyKind::RsiDivergence => &self.rsi_divergence,
            StrategyKind::TrendChannelBreakout => &self.trend_channel_breakout,
            StrategyKind::ConsecutiveCandles => &self.consecutive_candles,
            StrategyKind::OrderBlockInteraction => &self.order_block_interaction,
        };
        sets.as_ref().map(ParamSets::as_slice).unwrap_or(&[])
    }

    /// 60 分鐘以內用短週期組，其餘用長週期組，缺少時退回 `trend_ema`
    pub fn trend_settings(&self, timeframe: &str) -> Option<&TrendEmaSettings> {
        let preferred = if timeframe_to_minutes(timeframe) <= 60 {
            self.trend_ema_short.as_ref()
        } else {
            self.trend_ema_long.as_ref()
        };
        preferred.or(self.trend_ema.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_scan_time")]
    pub scan_time_beijing: String,
    #[serde(default = "default_top_n")]
    pub top_n_by_volume: usize,
    #[serde(default = "default_top_n_ranking")]
    pub top_n_gainers: usize,
    #[serde(default = "default_top_n_ranking")]
    pub top_n_volume_ratio: usize,
    #[serde(default = "default_volume_ma_period")]
    pub volume_ma_period: usize,
    #[serde(default = "default_min_streak")]
    pub min_consecutive_days: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicReportSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_report_interval")]
    pub run_interval: String,
    #[serde(default = "default_top_n")]
    pub top_n_by_volume: usize,
    #[serde(default = "default_top_n_ranking")]
    pub top_n_gainers: usize,
    #[serde(default = "default_top_n_ranking")]
    pub top_n_volume_ratio: usize,
    #[serde(default = "default_volume_ma_period")]
    pub volume_ma_period: usize,
    #[serde(default = "default_min_streak")]
    pub min_consecutive_candles: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub json: bool,
    pub file: Option<String>,
}

fn default_check_interval() -> u64 {
    15
}
fn default_max_workers() -> usize {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_state_file() -> String {
    "cooldown_status.json".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_rate_limit_ms() -> u64 {
    50
}
fn default_retries() -> u32 {
    5
}
fn default_timeframes() -> Vec<String> {
    vec!["1h".to_string(), "4h".to_string()]
}
fn default_top_n() -> usize {
    100
}
fn default_primary_quote() -> String {
    "USDT".to_string()
}
fn default_webhook_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_volume_ma_period() -> usize {
    20
}
fn default_scan_time() -> String {
    "08:30".to_string()
}
fn default_top_n_ranking() -> usize {
    10
}
fn default_min_streak() -> usize {
    2
}
fn default_report_interval() -> String {
    "4h".to_string()
}

impl MonitorConfig {
    /// 載入設定：指定路徑，或依序嘗試預設路徑
    pub fn load(path: Option<&str>) -> Result<(Self, PathBuf)> {
        let candidates: Vec<PathBuf> = match path {
            Some(p) => vec![PathBuf::from(p)],
            None => DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect(),
        };

        for candidate in &candidates {
            if candidate.is_file() {
                let config = Self::from_file(candidate)?;
                return Ok((config, candidate.clone()));
            }
        }

        Err(MonitorError::ConfigValidationError {
            field: "config".to_string(),
            message: format!(
                "Config file not found, tried: {}",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MonitorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換 `${VAR}`；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| MonitorError::ProcessingError {
            message: format!("Invalid env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("app.exchange", &self.app.exchange)?;
        validate_one_of(
            "app.exchange",
            &self.app.exchange.to_lowercase(),
            &SUPPORTED_EXCHANGES,
        )?;
        if let Some(base_url) = &self.app.base_url {
            validate_url("app.base_url", base_url)?;
        }
        validate_positive_number(
            "app.check_interval_minutes",
            self.app.check_interval_minutes as usize,
            1,
        )?;
        validate_positive_number("app.max_workers", self.app.max_workers, 1)?;
        validate_positive_number("app.retries", self.app.retries as usize, 1)?;
        validate_path("app.state_file", &self.app.state_file)?;

        if self.market.timeframes.is_empty() {
            return Err(MonitorError::MissingConfigError {
                field: "market.timeframes".to_string(),
            });
        }
        for timeframe in &self.market.timeframes {
            validate_timeframe("market.timeframes", timeframe)?;
        }
        validate_non_empty_string(
            "market.dynamic_scan.primary_quote_currency",
            &self.market.dynamic_scan.primary_quote_currency,
        )?;

        if self.notification.dingtalk.enabled {
            validate_url(
                "notification.dingtalk.webhook_url",
                &self.notification.dingtalk.webhook_url,
            )?;
        }

        validate_positive_number(
            "strategies.volume.volume_ma_period",
            self.strategies.volume.volume_ma_period,
            1,
        )?;

        if let Some(daily) = self.daily_report.as_ref().filter(|d| d.enabled) {
            parse_clock_time("daily_report.scan_time_beijing", &daily.scan_time_beijing)?;
            validate_positive_number("daily_report.volume_ma_period", daily.volume_ma_period, 1)?;
        }
        if let Some(periodic) = self.periodic_report.as_ref().filter(|p| p.enabled) {
            validate_timeframe("periodic_report.run_interval", &periodic.run_interval)?;
            validate_positive_number(
                "periodic_report.volume_ma_period",
                periodic.volume_ma_period,
                1,
            )?;
        }

        Ok(())
    }

    pub fn daily_report_enabled(&self) -> bool {
        self.daily_report.as_ref().map(|d| d.enabled).unwrap_or(false)
    }

    pub fn periodic_report_enabled(&self) -> bool {
        self.periodic_report
            .as_ref()
            .map(|p| p.enabled)
            .unwrap_or(false)
    }

    /// 訊號掃描與報告共用的熱門幣種數量上限
    pub fn universe_fetch_size(&self, report_top_n: usize) -> usize {
        self.market.dynamic_scan.top_n_for_signals.max(report_top_n)
    }
}

impl Validate for MonitorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// 依時間週期合併 `timeframe_overrides.<tf>` 後反序列化成具體參數
pub fn resolve_params<T: DeserializeOwned>(base: &toml::Table, timeframe: &str) -> Result<T> {
    let mut merged = base.clone();
    let overrides = merged.remove("timeframe_overrides");

    if let Some(toml::Value::Table(overrides)) = overrides {
        if let Some(toml::Value::Table(for_timeframe)) = overrides.get(timeframe) {
            merge_tables(&mut merged, for_timeframe);
        }
    }

    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| MonitorError::ConfigValidationError {
            field: "strategies".to_string(),
            message: format!("Invalid strategy parameters for {}: {}", timeframe, e),
        })
}

fn merge_tables(target: &mut toml::Table, overlay: &toml::Table) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
