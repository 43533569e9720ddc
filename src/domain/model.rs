use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    #[default]
    Swap,
    Spot,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Swap => "swap",
            MarketType::Spot => "spot",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一根 K 線；`timestamp` 為開盤時間（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// 24h 行情摘要，symbol 為統一格式（`BTC/USDT:USDT`、`BTC/USDT`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub market_type: MarketType,
    pub quote_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub symbol: String,
}

/// 成交量確認策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePolicy {
    /// 不做量能分析，直接推送
    Skip,
    /// 附上量能分析，但不因縮量而過濾
    Annotate,
    /// 必須放量才推送
    MustConfirm,
}

impl VolumePolicy {
    pub fn from_confirm_flag(volume_confirm: bool) -> Self {
        if volume_confirm {
            VolumePolicy::MustConfirm
        } else {
            VolumePolicy::Annotate
        }
    }
}

/// 策略命中後產生的待推送訊號
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub log_name: String,
    pub alert_key: String,
    /// 標題中的 `{vol_label}` 會被替換為「放量(x.x) 」或「缩量 」
    pub title: String,
    pub body: String,
    pub volume_policy: VolumePolicy,
    pub fallback_volume_multiplier: f64,
    pub cooldown_multiplier: f64,
}

pub const VOLUME_LABEL_SLOT: &str = "{vol_label}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Ranging,
    Unknown,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Bullish => "多头趋势",
            Trend::Bearish => "空头趋势",
            Trend::Ranging => "震荡趋势",
            Trend::Unknown => "趋势未知",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Trend::Bullish => "🐂",
            Trend::Bearish => "🐻",
            Trend::Ranging | Trend::Unknown => "↔️",
        }
    }

    /// 訊息開頭的趨勢行
    pub fn headline(&self) -> String {
        format!("**当前趋势**: {} {}\n\n", self.emoji(), self.label())
    }
}

/// 支撐 / 阻力價位
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    pub level: f64,
    pub kinds: Vec<String>,
    pub strength: usize,
}

impl PriceLevel {
    pub fn new(level: f64, kind: impl Into<String>, strength: usize) -> Self {
        Self {
            level,
            kinds: vec![kind.into()],
            strength,
        }
    }

    pub fn is_confluence(&self) -> bool {
        self.kinds.len() > 1
    }

    pub fn kind_label(&self) -> String {
        let mut kinds = self.kinds.clone();
        kinds.sort();
        kinds.dedup();
        kinds.join("+")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBlockKind {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBlock {
    pub kind: OrderBlockKind,
    pub top: f64,
    pub bottom: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionChannel {
    pub direction: ChannelDirection,
    pub slope: f64,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
    pub trend_length: usize,
}
