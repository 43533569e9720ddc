use chrono::{DateTime, Duration, TimeDelta, Utc};

/// 冷卻時間上限（十年）
pub const MAX_COOLDOWN_MINUTES: f64 = 10.0 * 365.0 * 24.0 * 60.0;

/// `15m` / `4h` / `1d` / `1w` 轉分鐘；無法解析時為 0
pub fn timeframe_to_minutes(timeframe: &str) -> u64 {
    let timeframe = timeframe.trim();
    if timeframe.len() < 2 || !timeframe.is_char_boundary(timeframe.len() - 1) {
        return 0;
    }

    let (number, unit) = timeframe.split_at(timeframe.len() - 1);
    let Ok(number) = number.parse::<u64>() else {
        return 0;
    };

    match unit.to_ascii_lowercase().as_str() {
        "m" => number,
        "h" => number * 60,
        "d" => number * 24 * 60,
        "w" => number * 7 * 24 * 60,
        _ => 0,
    }
}

/// 冷卻到期時間；非正值視為一分鐘，過大的值截在 `MAX_COOLDOWN_MINUTES`
pub fn cooldown_until(now: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    if minutes.is_nan() || minutes <= 0.0 {
        return now + Duration::minutes(1);
    }
    let seconds = (minutes.min(MAX_COOLDOWN_MINUTES) * 60.0).round() as i64;
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
