use crate::analysis::indicators::{closes, ema};
use crate::config::toml_config::StrategySettings;
use crate::domain::model::{Candle, Trend};

/// 以三條 EMA 的排列判斷當前趨勢
pub fn current_trend(candles: &[Candle], timeframe: &str, settings: &StrategySettings) -> Trend {
    let Some(trend_params) = settings.trend_settings(timeframe) else {
        tracing::debug!("Trend EMA settings missing for {}", timeframe);
        return Trend::Unknown;
    };

    let periods = [trend_params.fast, trend_params.medium, trend_params.long];
    if periods.iter().any(|&p| p == 0) {
        tracing::debug!("Invalid trend EMA periods: {:?}", periods);
        return Trend::Unknown;
    }

    classify(candles, periods[0], periods[1], periods[2])
}

pub fn classify(candles: &[Candle], fast: usize, medium: usize, long: usize) -> Trend {
    let close = closes(candles);
    let (Some(Some(fast)), Some(Some(medium)), Some(Some(long))) = (
        ema(&close, fast).last().copied(),
        ema(&close, medium).last().copied(),
        ema(&close, long).last().copied(),
    ) else {
        return Trend::Unknown;
    };

    if fast > medium && medium > long {
        Trend::Bullish
    } else if fast < medium && medium < long {
        Trend::Bearish
    } else {
        Trend::Ranging
    }
}
