//! Technical indicators over plain `f64` series.
//!
//! Every function returns one entry per input bar; bars without enough
//! history are `None`.

use crate::domain::model::Candle;

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// EMA，以前 `period` 根的 SMA 作為起始值
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for i in period..values.len() {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }
    out
}

/// Wilder 平滑 (RMA)。從第一個有效值開始累積 `period` 個值作為種子
pub fn rma(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    if values.len() < start + period {
        return out;
    }

    let mut seed = 0.0;
    for value in &values[start..start + period] {
        match value {
            Some(v) => seed += v,
            None => return out,
        }
    }

    let mut prev = seed / period as f64;
    out[start + period - 1] = Some(prev);
    for i in start + period..values.len() {
        let Some(v) = values[i] else {
            break;
        };
        prev = (prev * (period as f64 - 1.0) + v) / period as f64;
        out[i] = Some(prev);
    }
    out
}

pub fn true_range(candles: &[Candle]) -> Vec<Option<f64>> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                return None;
            }
            let prev_close = candles[i - 1].close;
            Some(
                (c.high - c.low)
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs()),
            )
        })
        .collect()
}

pub fn atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    rma(&true_range(candles), period)
}

pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = vec![None; values.len()];
    let mut losses = vec![None; values.len()];
    for i in 1..values.len() {
        let diff = values[i] - values[i - 1];
        gains[i] = Some(diff.max(0.0));
        losses[i] = Some((-diff).max(0.0));
    }

    let avg_gain = rma(&gains, period);
    let avg_loss = rma(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(gain, loss)| match (gain, loss) {
            (Some(g), Some(l)) if *l == 0.0 && *g == 0.0 => Some(50.0),
            (Some(_), Some(l)) if *l == 0.0 => Some(100.0),
            (Some(g), Some(l)) => Some(100.0 - 100.0 / (1.0 + g / l)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Kdj {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
}

/// 隨機指標 KDJ：RSV 取 `length` 根高低點，K/D 以 1/`signal` 平滑
pub fn kdj(candles: &[Candle], length: usize, signal: usize) -> Kdj {
    let n = candles.len();
    let mut rsv = vec![None; n];
    if length > 0 && n >= length {
        for i in length - 1..n {
            let window = &candles[i + 1 - length..=i];
            let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            rsv[i] = Some(if range > 0.0 {
                100.0 * (candles[i].close - lowest) / range
            } else {
                50.0
            });
        }
    }

    let k = smooth(&rsv, signal);
    let d = smooth(&k, signal);
    let j = k
        .iter()
        .zip(d.iter())
        .map(|(k, d)| match (k, d) {
            (Some(k), Some(d)) => Some(3.0 * k - 2.0 * d),
            _ => None,
        })
        .collect();

    Kdj { k, d, j }
}

// 指數平滑，首個有效值即為起點
fn smooth(values: &[Option<f64>], signal: usize) -> Vec<Option<f64>> {
    let alpha = 1.0 / signal.max(1) as f64;
    let mut prev: Option<f64> = None;
    values
        .iter()
        .map(|value| {
            let v = (*value)?;
            let next = match prev {
                Some(p) => alpha * v + (1.0 - alpha) * p,
                None => v,
            };
            prev = Some(next);
            Some(next)
        })
        .collect()
}

/// 所有序列皆有值的最後兩根索引 (前一根, 當前)
pub fn last_two_valid(series: &[&[Option<f64>]], len: usize) -> Option<(usize, usize)> {
    let mut valid = (0..len)
        .rev()
        .filter(|&i| series.iter().all(|s| s.get(i).copied().flatten().is_some()));
    let current = valid.next()?;
    let previous = valid.next()?;
    Some((previous, current))
}

pub fn max_of(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |acc, v| match acc {
        Some(a) if a >= v => Some(a),
        _ => Some(v),
    })
}

pub fn min_of(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |acc, v| match acc {
        Some(a) if a <= v => Some(a),
        _ => Some(v),
    })
}
