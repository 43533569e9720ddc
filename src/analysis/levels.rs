//! Support / resistance detection: classic pivots and clustered fractal zones.

use crate::analysis::indicators::atr;
use crate::domain::model::{Candle, PriceLevel};

const ZONE_ATR_PERIOD: usize = 14;
const FRACTAL_WING: usize = 2;
const MIN_ZONE_HISTORY: usize = 50;

/// 經典樞軸點，回傳 (阻力 R1-R3, 支撐 S1-S3)
pub fn pivot_points(prev_day: &Candle) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
    let (h, l, c) = (prev_day.high, prev_day.low, prev_day.close);
    let p = (h + l + c) / 3.0;

    let resistances = [2.0 * p - l, p + (h - l), h + 2.0 * (p - l)];
    let supports = [2.0 * p - h, p - (h - l), l - 2.0 * (h - p)];

    (
        resistances
            .iter()
            .enumerate()
            .map(|(i, &level)| PriceLevel::new(level, format!("R{}", i + 1), 1))
            .collect(),
        supports
            .iter()
            .enumerate()
            .map(|(i, &level)| PriceLevel::new(level, format!("S{}", i + 1), 1))
            .collect(),
    )
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneParams {
    pub atr_grouping_multiplier: f64,
    pub min_cluster_size: usize,
    pub min_separation_atr_mult: f64,
}

/// 價格興趣區：5 根分形拐點 → 1-D DBSCAN 聚類 → 合併過近的區域。
/// 結果依價格由高到低排列
pub fn price_interest_zones(candles: &[Candle], params: ZoneParams) -> Vec<PriceLevel> {
    if candles.len() < MIN_ZONE_HISTORY || params.min_cluster_size == 0 {
        return Vec::new();
    }

    let atr_values = atr(candles, ZONE_ATR_PERIOD);
    let Some(current_atr) = atr_values.last().copied().flatten() else {
        return Vec::new();
    };
    let valid: Vec<f64> = atr_values.iter().flatten().copied().collect();
    let avg_atr = valid.iter().sum::<f64>() / valid.len() as f64;
    if !avg_atr.is_finite() || avg_atr == 0.0 {
        return Vec::new();
    }

    let fractals = fractal_prices(candles);
    if fractals.len() < params.min_cluster_size {
        return Vec::new();
    }

    let eps = avg_atr * params.atr_grouping_multiplier;
    let zones: Vec<PriceLevel> = dbscan_1d(&fractals, eps, params.min_cluster_size)
        .into_iter()
        .map(|cluster| {
            let level = cluster.iter().sum::<f64>() / cluster.len() as f64;
            let strength = cluster.len();
            PriceLevel::new(level, format!("Zone ({} touches)", strength), strength)
        })
        .collect();

    merge_close_levels(zones, current_atr * params.min_separation_atr_mult)
}

// 前後各 2 根的局部高點與低點
fn fractal_prices(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    if n < 2 * FRACTAL_WING + 1 {
        return Vec::new();
    }

    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for i in FRACTAL_WING..n - FRACTAL_WING {
        let window = &candles[i - FRACTAL_WING..=i + FRACTAL_WING];
        let max_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let min_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        if candles[i].high == max_high {
            highs.push(candles[i].high);
        }
        if candles[i].low == min_low {
            lows.push(candles[i].low);
        }
    }

    highs.extend(lows);
    highs
}

/// 一維 DBSCAN：鄰域半徑 `eps`（含邊界），核心點需 `min_samples` 個鄰居（含自身），
/// 噪聲點丟棄
pub fn dbscan_1d(points: &[f64], eps: f64, min_samples: usize) -> Vec<Vec<f64>> {
    let mut sorted: Vec<f64> = points.iter().copied().filter(|p| p.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 0 {
        return Vec::new();
    }

    // 雙指標計算每點的鄰居數
    let mut is_core = vec![false; n];
    let (mut lo, mut hi) = (0usize, 0usize);
    for i in 0..n {
        while sorted[i] - sorted[lo] > eps {
            lo += 1;
        }
        if hi < i {
            hi = i;
        }
        while hi + 1 < n && sorted[hi + 1] - sorted[i] <= eps {
            hi += 1;
        }
        is_core[i] = hi - lo + 1 >= min_samples;
    }

    // 相鄰核心點距離 ≤ eps 即屬同一群
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut cluster_count = 0usize;
    let mut last_core: Option<usize> = None;
    for i in (0..n).filter(|&i| is_core[i]) {
        match last_core {
            Some(prev) if sorted[i] - sorted[prev] <= eps => labels[i] = labels[prev],
            _ => {
                labels[i] = Some(cluster_count);
                cluster_count += 1;
            }
        }
        last_core = Some(i);
    }

    // 邊界點歸入最近的核心點
    let cores: Vec<usize> = (0..n).filter(|&i| is_core[i]).collect();
    for i in (0..n).filter(|&i| !is_core[i]) {
        let nearest = cores
            .iter()
            .filter(|&&c| (sorted[c] - sorted[i]).abs() <= eps)
            .min_by(|&&a, &&b| {
                (sorted[a] - sorted[i])
                    .abs()
                    .total_cmp(&(sorted[b] - sorted[i]).abs())
            });
        if let Some(&core) = nearest {
            labels[i] = labels[core];
        }
    }

    let mut clusters: Vec<Vec<f64>> = vec![Vec::new(); cluster_count];
    for (value, label) in sorted.iter().zip(labels.iter()) {
        if let Some(label) = label {
            clusters[*label].push(*value);
        }
    }
    clusters
}

/// 強度高者優先保留，距離小於 `min_separation` 的較弱區域捨棄
pub fn merge_close_levels(mut zones: Vec<PriceLevel>, min_separation: f64) -> Vec<PriceLevel> {
    zones.sort_by(|a, b| b.strength.cmp(&a.strength));

    let mut kept: Vec<PriceLevel> = Vec::new();
    for zone in zones {
        if kept
            .iter()
            .all(|existing| (zone.level - existing.level).abs() >= min_separation)
        {
            kept.push(zone);
        }
    }

    kept.sort_by(|a, b| b.level.total_cmp(&a.level));
    kept
}

/// 以當前價切分：阻力由近到遠（升序），支撐由近到遠（降序）
pub fn split_levels(levels: Vec<PriceLevel>, price: f64) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
    let (mut resistances, mut supports): (Vec<_>, Vec<_>) = levels
        .into_iter()
        .filter(|l| l.level != price)
        .partition(|l| l.level > price);

    resistances.sort_by(|a, b| a.level.total_cmp(&b.level));
    supports.sort_by(|a, b| b.level.total_cmp(&a.level));
    (resistances, supports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;

    #[test]
    fn test_pivot_points() {
        let day = candle(0, 100.0, 110.0, 90.0, 105.0, 1.0);
        let (res, sup) = pivot_points(&day);

        let p = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((res[0].level - (2.0 * p - 90.0)).abs() < 1e-9);
        assert!((res[1].level - (p + 20.0)).abs() < 1e-9);
        assert!((sup[2].level - (90.0 - 2.0 * (110.0 - p))).abs() < 1e-9);
        assert_eq!(res[2].kind_label(), "R3");
        assert_eq!(sup[0].kind_label(), "S1");
    }

    #[test]
    fn test_dbscan_groups_and_drops_noise() {
        let points = [10.0, 10.2, 10.1, 20.0, 20.3, 35.0];
        let clusters = dbscan_1d(&points, 0.5, 2);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], vec![10.0, 10.1, 10.2]);
        assert_eq!(clusters[1], vec![20.0, 20.3]);
    }

    #[test]
    fn test_dbscan_border_point_joins_cluster() {
        // 兩端的點只有一個鄰居，不是核心點但屬於邊界
        let points = [10.0, 10.3, 10.6, 10.9];
        let clusters = dbscan_1d(&points, 0.35, 3);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
    }

    #[test]
    fn test_merge_prefers_stronger_levels() {
        let zones = vec![
            PriceLevel::new(100.0, "Zone (2 touches)", 2),
            PriceLevel::new(100.5, "Zone (5 touches)", 5),
            PriceLevel::new(110.0, "Zone (3 touches)", 3),
        ];
        let merged = merge_close_levels(zones, 1.0);

        let levels: Vec<f64> = merged.iter().map(|z| z.level).collect();
        assert_eq!(levels, vec![110.0, 100.5]);
    }

    #[test]
    fn test_split_levels_orders_by_distance() {
        let levels = vec![
            PriceLevel::new(90.0, "S1", 1),
            PriceLevel::new(120.0, "R2", 1),
            PriceLevel::new(110.0, "R1", 1),
            PriceLevel::new(95.0, "Zone (2 touches)", 2),
        ];
        let (res, sup) = split_levels(levels, 100.0);

        assert_eq!(res.iter().map(|l| l.level).collect::<Vec<_>>(), vec![110.0, 120.0]);
        assert_eq!(sup.iter().map(|l| l.level).collect::<Vec<_>>(), vec![95.0, 90.0]);
    }

    #[test]
    fn test_zones_from_oscillating_market() {
        // 在 95 與 105 之間來回震盪
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let phase = (i % 10) as f64;
                let mid = if phase < 5.0 { 96.0 + phase * 2.0 } else { 114.0 - phase * 2.0 };
                candle(i, mid, mid + 1.0, mid - 1.0, mid, 10.0)
            })
            .collect();

        let zones = price_interest_zones(
            &candles,
            ZoneParams {
                atr_grouping_multiplier: 0.5,
                min_cluster_size: 2,
                min_separation_atr_mult: 1.0,
            },
        );

        assert!(!zones.is_empty());
        assert!(zones.windows(2).all(|w| w[0].level > w[1].level));
        assert!(zones.iter().all(|z| z.strength >= 2));
    }

    #[test]
    fn test_zones_need_history() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| candle(i, 100.0, 101.0, 99.0, 100.0, 1.0))
            .collect();
        let params = ZoneParams {
            atr_grouping_multiplier: 0.5,
            min_cluster_size: 2,
            min_separation_atr_mult: 1.0,
        };
        assert!(price_interest_zones(&candles, params).is_empty());
    }
}
