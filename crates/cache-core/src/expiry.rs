//! 过期时间计算
//!
//! 随机抖动让同一批写入的键在不同时刻过期，避免缓存雪崩

use rand::Rng;
use std::time::Duration;

/// 过期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// 固定过期时间
    Fixed(Duration),
    /// 基础时间 + [0, 抖动范围] 的随机值
    Jittered { base: Duration, percent: u32 },
}

impl ExpiryPolicy {
    /// 抖动范围（秒）：基础时间的 `percent`%，至少 1 秒
    pub fn jitter_range_secs(base_secs: u64, percent: u32) -> u64 {
        let range = u128::from(base_secs) * u128::from(percent) / 100;
        u64::try_from(range).unwrap_or(u64::MAX).max(1)
    }

    /// 计算本次写入的过期时间，每次调用独立抽样
    pub fn resolve<G: Rng + ?Sized>(&self, rng: &mut G) -> Duration {
        match *self {
            Self::Fixed(ttl) => ttl,
            Self::Jittered { base, percent } => {
                let base_secs = base.as_secs();
                let range = Self::jitter_range_secs(base_secs, percent);
                Duration::from_secs(base_secs.saturating_add(rng.gen_range(0..=range)))
            }
        }
    }

    pub fn base(&self) -> Duration {
        match *self {
            Self::Fixed(ttl) => ttl,
            Self::Jittered { base, .. } => base,
        }
    }
}
