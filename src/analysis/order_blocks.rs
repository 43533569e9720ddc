use crate::analysis::indicators::atr;
use crate::domain::model::{Candle, OrderBlock, OrderBlockKind};

const OB_ATR_PERIOD: usize = 14;

/// 局部峰值，且任兩峰距離至少 `distance` 根；距離內只保留較高者
pub fn find_peaks(values: &[f64], distance: usize) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if values[i - 1] < values[i] {
            // 平台取中點
            let mut ahead = i + 1;
            while ahead + 1 < n && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| values[peaks[b]].total_cmp(&values[peaks[a]]).then(b.cmp(&a)));

    let mut keep = vec![true; peaks.len()];
    for &idx in &by_height {
        if !keep[idx] {
            continue;
        }
        let position = peaks[idx];
        for (other, &other_pos) in peaks.iter().enumerate() {
            if other != idx && keep[other] && position.abs_diff(other_pos) < distance {
                keep[other] = false;
            }
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// 最新的 (看漲訂單塊, 看跌訂單塊)。
///
/// 看跌：最近一個擺動低點被收盤價跌破 `低點 - ATR × atr_multiplier`，
/// 取低點到跌破之間最後一根陽線。看漲反之。
pub fn latest_order_blocks(
    candles: &[Candle],
    swing_length: usize,
    atr_multiplier: f64,
) -> (Option<OrderBlock>, Option<OrderBlock>) {
    if candles.len() < swing_length * 2 + 2 {
        return (None, None);
    }

    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let inverted_lows: Vec<f64> = candles.iter().map(|c| -c.low).collect();
    let swing_highs = find_peaks(&highs, swing_length);
    let swing_lows = find_peaks(&inverted_lows, swing_length);
    let atr_values = atr(candles, OB_ATR_PERIOD);

    let bearish = swing_lows.iter().rev().find_map(|&low_idx| {
        let threshold = candles[low_idx].low - valid_atr(&atr_values, low_idx)? * atr_multiplier;
        locate_block(candles, low_idx, OrderBlockKind::Bearish, |c| c.close < threshold)
    });

    let bullish = swing_highs.iter().rev().find_map(|&high_idx| {
        let threshold = candles[high_idx].high + valid_atr(&atr_values, high_idx)? * atr_multiplier;
        locate_block(candles, high_idx, OrderBlockKind::Bullish, |c| c.close > threshold)
    });

    (bullish, bearish)
}

fn valid_atr(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten().filter(|v| *v != 0.0)
}

fn locate_block(
    candles: &[Candle],
    swing_idx: usize,
    kind: OrderBlockKind,
    breaks: impl Fn(&Candle) -> bool,
) -> Option<OrderBlock> {
    if swing_idx + 1 >= candles.len() {
        return None;
    }

    let break_idx = swing_idx + 1 + candles[swing_idx + 1..].iter().position(breaks)?;
    let opposite = candles[swing_idx..=break_idx].iter().rev().find(|c| match kind {
        OrderBlockKind::Bearish => c.is_bullish(),
        OrderBlockKind::Bullish => c.is_bearish(),
    })?;

    Some(OrderBlock {
        kind,
        top: opposite.high,
        bottom: opposite.low,
        timestamp: opposite.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;

    #[test]
    fn test_find_peaks_basic_and_plateau() {
        let values = [0.0, 2.0, 1.0, 3.0, 3.0, 3.0, 0.0, 1.0];
        assert_eq!(find_peaks(&values, 1), vec![1, 4]);
    }

    #[test]
    fn test_find_peaks_distance_keeps_higher() {
        let values = [0.0, 5.0, 0.0, 7.0, 0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        // 1 與 3 距離 2 < 3，保留較高的 3；5 與 3 距離 2，也被移除
        assert_eq!(find_peaks(&values, 3), vec![3, 9]);
    }

    fn flat(i: usize, price: f64) -> Candle {
        candle(i, price, price + 1.0, price - 1.0, price + 0.1, 10.0)
    }

    #[test]
    fn test_bullish_order_block_after_break_of_high() {
        let mut candles: Vec<Candle> = (0..30).map(|i| flat(i, 100.0)).collect();
        // 擺動高點
        candles[15] = candle(15, 100.0, 106.0, 99.0, 105.0, 10.0);
        // 回落的陰線即訂單塊
        candles[20] = candle(20, 101.0, 101.5, 97.0, 98.0, 10.0);
        // 突破高點
        candles.extend((30..40).map(|i| candle(i, 100.0, 112.0, 99.5, 111.0, 10.0)));

        let (bullish, _) = latest_order_blocks(&candles, 5, 0.1);
        let block = bullish.unwrap();

        assert_eq!(block.kind, OrderBlockKind::Bullish);
        assert_eq!(block.top, 101.5);
        assert_eq!(block.bottom, 97.0);
        assert_eq!(block.timestamp, candles[20].timestamp);
    }

    #[test]
    fn test_not_enough_history() {
        let candles: Vec<Candle> = (0..10).map(|i| flat(i, 100.0)).collect();
        assert_eq!(latest_order_blocks(&candles, 10, 0.1), (None, None));
    }
}
