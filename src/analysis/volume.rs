use crate::domain::model::Candle;
use chrono::{DateTime, Utc};

const MIN_TIME_RATIO: f64 = 0.05;

/// 即時量能檢查結果
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeCheck {
    pub is_over: bool,
    pub ratio: f64,
    pub text: String,
}

impl VolumeCheck {
    fn empty() -> Self {
        Self {
            is_over: false,
            ratio: 0.0,
            text: String::new(),
        }
    }

    /// 標題中的量能標籤
    pub fn label(&self) -> String {
        if self.is_over {
            format!("放量({:.1}x) ", self.ratio)
        } else {
            "缩量 ".to_string()
        }
    }
}

/// 以「前 `ma_period` 根均量 × 當前 K 線已經過的時間比例」作為動態基準，
/// 判斷最新一根（尚未收盤）K 線是否放量
pub fn realtime_volume_check(
    candles: &[Candle],
    tf_minutes: u64,
    ma_period: usize,
    multiplier: f64,
    now: DateTime<Utc>,
) -> VolumeCheck {
    if ma_period == 0 || candles.len() < ma_period + 1 {
        return VolumeCheck::empty();
    }

    let current = candles[candles.len() - 1];
    let previous = &candles[candles.len() - 1 - ma_period..candles.len() - 1];
    let volume_ma = previous.iter().map(|c| c.volume).sum::<f64>() / ma_period as f64;

    let minutes_elapsed = (now.timestamp_millis() - current.timestamp) as f64 / 60_000.0;
    let (time_ratio, progress) = if tf_minutes > 0 {
        let raw = minutes_elapsed / tf_minutes as f64;
        (raw.max(MIN_TIME_RATIO).min(1.0), raw)
    } else {
        (1.0, 1.0)
    };

    let baseline = volume_ma * time_ratio;
    let threshold = baseline * multiplier;
    let is_over = current.volume > threshold;
    let ratio = if baseline > 0.0 {
        current.volume / baseline
    } else {
        f64::INFINITY
    };

    let text = format!(
        "**成交量分析** (周期进行{:.0}%):\n\
         > **当前量**: {:.0} **(为动态基准的 {:.1} 倍)**\n\
         > **动态基准**: {:.0} (已按时间调整)\n\
         > **放量阈值({:.1}x)**: {:.0}",
        progress * 100.0,
        current.volume,
        ratio,
        baseline,
        multiplier,
        threshold
    );

    VolumeCheck {
        is_over,
        ratio,
        text,
    }
}
