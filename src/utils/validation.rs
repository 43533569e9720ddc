use crate::utils::error::{MonitorError, Result};
use crate::utils::timeframe::timeframe_to_minutes;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MonitorError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_timeframe(field_name: &str, timeframe: &str) -> Result<()> {
    if timeframe_to_minutes(timeframe) == 0 {
        return Err(MonitorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: timeframe.to_string(),
            reason: "Expected <number><m|h|d|w>, e.g. 15m, 4h, 1d".to_string(),
        });
    }
    Ok(())
}

/// 解析 `HH:MM`，回傳 (時, 分)
pub fn parse_clock_time(field_name: &str, value: &str) -> Result<(u32, u32)> {
    let invalid = |reason: &str| MonitorError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (hour, minute) = value.split_once(':').ok_or_else(|| invalid("Expected HH:MM"))?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid("Hour is not a number"))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| invalid("Minute is not a number"))?;

    validate_range(field_name, hour, 0, 23)?;
    validate_range(field_name, minute, 0, 59)?;
    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("webhook_url", "https://oapi.dingtalk.com/robot/send").is_ok());
        assert!(validate_url("webhook_url", "http://example.com").is_ok());
        assert!(validate_url("webhook_url", "").is_err());
        assert!(validate_url("webhook_url", "invalid-url").is_err());
        assert!(validate_url("webhook_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("max_workers", 5, 1).is_ok());
        assert!(validate_positive_number("max_workers", 0, 1).is_err());
    }

    #[test]
    fn test_validate_timeframe() {
        assert!(validate_timeframe("timeframes", "15m").is_ok());
        assert!(validate_timeframe("timeframes", "4h").is_ok());
        assert!(validate_timeframe("timeframes", "4x").is_err());
        assert!(validate_timeframe("timeframes", "h").is_err());
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("scan_time", "08:30").unwrap(), (8, 30));
        assert_eq!(parse_clock_time("scan_time", "23:59").unwrap(), (23, 59));
        assert!(parse_clock_time("scan_time", "24:00").is_err());
        assert!(parse_clock_time("scan_time", "0830").is_err());
        assert!(parse_clock_time("scan_time", "aa:10").is_err());
    }
}
