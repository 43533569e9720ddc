//! Rank-based parameter scaling.
//!
//! Liquid symbols (low rank numbers) get the `min` value, thinner markets
//! drift towards `max`. Used for volume / ATR multipliers and the
//! consecutive-candle count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DynamicMethod {
    #[default]
    Linear,
    LinearStepped,
    Stepped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankTier {
    pub up_to_rank: usize,
    #[serde(alias = "multiplier", alias = "count")]
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicValueConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: DynamicMethod,
    #[serde(default = "default_apply_to_rank")]
    pub apply_to_rank_n: usize,
    #[serde(default, alias = "min_multiplier", alias = "min_count")]
    pub min: Option<f64>,
    #[serde(default, alias = "max_multiplier", alias = "max_count")]
    pub max: Option<f64>,
    #[serde(default, alias = "default_multiplier", alias = "default_count")]
    pub default: Option<f64>,
    #[serde(default = "default_step_size")]
    pub rank_step_size: usize,
    #[serde(default)]
    pub tiers: Vec<RankTier>,
}

fn default_apply_to_rank() -> usize {
    100
}

fn default_step_size() -> usize {
    10
}

impl DynamicValueConfig {
    /// `rank` 為 1 起算的熱度排名；不在快取中的交易對傳入 `None`
    pub fn value_for_rank(&self, rank: Option<usize>, fallback: f64) -> f64 {
        if !self.enabled {
            return fallback;
        }

        let Some(rank) = rank else {
            return self.default.unwrap_or(fallback);
        };

        let min = self.min.unwrap_or(fallback);
        let max = self.max.unwrap_or(min * 2.0);
        let default = self.default.unwrap_or(max);

        if rank > self.apply_to_rank_n {
            return default;
        }

        match self.method {
            DynamicMethod::Linear => {
                if self.apply_to_rank_n <= 1 {
                    return min;
                }
                let slope = (max - min) / (self.apply_to_rank_n - 1) as f64;
                clamp(min + (rank - 1) as f64 * slope, min, max)
            }
            DynamicMethod::LinearStepped => {
                if self.rank_step_size == 0 {
                    return min;
                }
                let num_steps = self.apply_to_rank_n.div_ceil(self.rank_step_size);
                if num_steps <= 1 {
                    return min;
                }
                let increment = (max - min) / (num_steps - 1) as f64;
                let step_index = (rank - 1) / self.rank_step_size;
                clamp(min + step_index as f64 * increment, min, max)
            }
            DynamicMethod::Stepped => {
                let mut tiers: Vec<&RankTier> = self.tiers.iter().collect();
                tiers.sort_by_key(|t| t.up_to_rank);
                tiers
                    .into_iter()
                    .find(|tier| rank <= tier.up_to_rank)
                    .map(|tier| tier.value)
                    .unwrap_or(default)
            }
        }
    }

    /// K 線根數版本，取最近整數（.5 取偶數）且至少為 1
    pub fn count_for_rank(&self, rank: Option<usize>, fallback: usize) -> usize {
        let value = self.value_for_rank(rank, fallback as f64);
        (value.round_ties_even().max(1.0)) as usize
    }
}

// min > max 時以 min 為準
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    min.max(value.min(max))
}
