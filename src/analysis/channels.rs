use crate::domain::model::{Candle, ChannelDirection, RegressionChannel};

/// 橫盤過濾：斜率需大於均價的 0.05%
const MIN_SLOPE_RATIO: f64 = 0.0005;

#[derive(Debug, Clone, Copy)]
pub struct ChannelParams {
    pub lookback_period: usize,
    pub min_trend_length: usize,
    pub std_dev_multiplier: f64,
}

/// 動態趨勢段回歸通道。
///
/// 在回看窗口內取最高點與最低點中較近的一個作為趨勢起點，
/// 只對起點到最新 K 線這一段做線性回歸，並以 ±k·σ 作為上下軌。
/// 趨勢段過短、斜率方向與起點不符、或斜率過小時回傳 `None`。
pub fn regression_channel(candles: &[Candle], params: ChannelParams) -> Option<RegressionChannel> {
    if params.lookback_period == 0 || candles.len() < params.lookback_period {
        return None;
    }

    let window = &candles[candles.len() - params.lookback_period..];
    let high_pos = first_extreme(window.iter().map(|c| c.high), |a, b| a > b)?;
    let low_pos = first_extreme(window.iter().map(|c| c.low), |a, b| a < b)?;

    let (start, direction) = if high_pos > low_pos {
        (high_pos, ChannelDirection::Down)
    } else {
        (low_pos, ChannelDirection::Up)
    };

    let segment = &window[start..];
    if segment.len() < params.min_trend_length.max(2) {
        tracing::trace!(
            "Trend segment too short ({} < {})",
            segment.len(),
            params.min_trend_length
        );
        return None;
    }

    let y: Vec<f64> = segment.iter().map(|c| c.close).collect();
    let (slope, intercept) = linear_fit(&y);

    let mismatched = match direction {
        ChannelDirection::Up => slope < 0.0,
        ChannelDirection::Down => slope > 0.0,
    };
    if mismatched {
        tracing::trace!("Regression slope contradicts trend start, ranging market");
        return None;
    }

    let mean = y.iter().sum::<f64>() / y.len() as f64;
    if slope.abs() < mean * MIN_SLOPE_RATIO {
        tracing::trace!("Regression slope too flat: {:.6}", slope);
        return None;
    }

    let line: Vec<f64> = (0..y.len()).map(|x| slope * x as f64 + intercept).collect();
    let deviations: Vec<f64> = y.iter().zip(&line).map(|(v, l)| v - l).collect();
    let dev_mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
    let std_dev = (deviations
        .iter()
        .map(|d| (d - dev_mean).powi(2))
        .sum::<f64>()
        / deviations.len() as f64)
        .sqrt();
    let width = std_dev * params.std_dev_multiplier;

    Some(RegressionChannel {
        direction,
        slope,
        upper_band: line.iter().map(|l| l + width).collect(),
        lower_band: line.iter().map(|l| l - width).collect(),
        trend_length: segment.len(),
    })
}

// 第一個極值的位置
fn first_extreme(values: impl Iterator<Item = f64>, better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// 最小平方法一次擬合，x 為 0..n
fn linear_fit(y: &[f64]) -> (f64, f64) {
    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, v) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (v - y_mean);
        sxx += dx * dx;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, y_mean - slope * x_mean)
}
