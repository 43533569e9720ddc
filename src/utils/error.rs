use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Exchange error: {message}")]
    ExchangeError { message: String },

    #[error("Notification error: {message}")]
    NotificationError { message: String },

    #[error("Failed to run '{program}': {message}")]
    CommandError { program: String, message: String },

    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MonitorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MonitorError::HttpError(_)
            | MonitorError::ExchangeError { .. }
            | MonitorError::NotificationError { .. } => ErrorCategory::Network,
            MonitorError::ConfigValidationError { .. }
            | MonitorError::InvalidConfigValueError { .. }
            | MonitorError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MonitorError::SerializationError(_) | MonitorError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            MonitorError::IoError(_)
            | MonitorError::CommandError { .. }
            | MonitorError::StepFailed { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MonitorError::NotificationError { .. } => ErrorSeverity::Low,
            MonitorError::HttpError(_) | MonitorError::ExchangeError { .. } => {
                ErrorSeverity::Medium
            }
            MonitorError::ConfigValidationError { .. }
            | MonitorError::InvalidConfigValueError { .. }
            | MonitorError::MissingConfigError { .. }
            | MonitorError::SerializationError(_)
            | MonitorError::ProcessingError { .. }
            | MonitorError::StepFailed { .. } => ErrorSeverity::High,
            MonitorError::IoError(_) | MonitorError::CommandError { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "檢查網路連線與交易所/Webhook 是否可達，稍後重試",
            ErrorCategory::Configuration => "檢查設定檔中對應欄位的值與格式",
            ErrorCategory::Data => "檢查交易所回傳的資料格式，或調整策略參數",
            ErrorCategory::System => "檢查檔案權限、磁碟空間以及 git/docker 是否已安裝",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MonitorError::ConfigValidationError { field, message } => {
                format!("設定錯誤 ({}): {}", field, message)
            }
            MonitorError::InvalidConfigValueError { field, value, reason } => {
                format!("設定值無效 {} = '{}': {}", field, value, reason)
            }
            MonitorError::MissingConfigError { field } => format!("缺少必要設定: {}", field),
            MonitorError::StepFailed { step, code } => {
                format!("步驟 '{}' 失敗 (exit code {})", step, code)
            }
            other => other.to_string(),
        }
    }

    /// 子程序的結束碼；非子程序錯誤時為 1。
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::StepFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
