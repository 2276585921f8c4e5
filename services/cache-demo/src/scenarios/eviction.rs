//! 内存淘汰策略观察
//!
//! 在受限内存下写满数据，访问一部分热点键，再写入新键，统计哪些键被淘汰。
//! 会清空当前数据库，结束后恢复原有的内存配置

use std::time::Duration;

use aside_adapter_redis::{EvictionPolicy, EvictionSettings};
use aside_bootstrap::Infrastructure;
use aside_errors::AppResult;
use aside_ports::CachePort;
use tracing::{info, warn};

pub struct EvictionOptions {
    pub policy: EvictionPolicy,
    pub max_memory: String,
    pub keys: usize,
    pub value_bytes: usize,
    pub hot_keys: usize,
    pub new_keys: usize,
}

#[derive(Debug, Default)]
struct FillReport {
    written: usize,
    rejected: usize,
}

pub async fn run(infra: &Infrastructure, options: &EvictionOptions) -> AppResult<()> {
    let admin = infra.redis_admin();
    let cache = infra.cache();

    let previous = admin.eviction_settings().await?;
    admin.flush_db().await?;
    admin
        .configure_eviction(&options.max_memory, options.policy)
        .await?;

    let result = observe(cache.as_ref(), options).await;

    if let Err(e) = restore(infra, &previous).await {
        warn!(error = %e, "Failed to restore eviction settings");
    }
    result?;

    info!(
        used_memory = admin.used_memory().await?,
        key_count = admin.key_count().await?,
        "Redis state after the run"
    );
    Ok(())
}

async fn observe(cache: &dyn CachePort, options: &EvictionOptions) -> AppResult<()> {
    let value = "x".repeat(options.value_bytes);
    let policy = options.policy;

    let keys: Vec<String> = (0..options.keys).map(|i| format!("test:key:{}", i)).collect();
    let fill = write_keys(cache, &keys, &value, policy).await;
    info!(%policy, written = fill.written, rejected = fill.rejected, "Initial fill finished");

    // 热点键：LFU 需要更高的访问频率才能拉开差距
    let hot = &keys[..options.hot_keys.min(keys.len())];
    for (i, key) in hot.iter().enumerate() {
        let touches = if policy.is_lfu() && i < hot.len() / 2 { 6 } else { 1 };
        for _ in 0..touches {
            cache.get(key).await?;
        }
    }
    info!(hot_keys = hot.len(), "Hot keys accessed");

    let new_keys: Vec<String> = (0..options.new_keys)
        .map(|i| format!("test:new:key:{}", i))
        .collect();
    let extra = write_keys(cache, &new_keys, &value, policy).await;
    info!(written = extra.written, rejected = extra.rejected, "New keys written");

    let survivors = count_existing(cache, &keys).await?;
    let hot_survivors = count_existing(cache, hot).await?;
    let new_survivors = count_existing(cache, &new_keys).await?;
    info!(
        %policy,
        survivors,
        evicted = keys.len() - survivors,
        hot_survivors,
        new_survivors,
        "Eviction result"
    );
    Ok(())
}

/// 写入失败（noeviction 下内存不足）只计数，不中断
async fn write_keys(
    cache: &dyn CachePort,
    keys: &[String],
    value: &str,
    policy: EvictionPolicy,
) -> FillReport {
    let mut report = FillReport::default();
    for (i, key) in keys.iter().enumerate() {
        match cache.set(key, value, key_ttl(policy, i)).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                if report.rejected == 0 {
                    warn!(key = %key, error = %e, "Write rejected");
                }
                report.rejected += 1;
            }
        }
    }
    report
}

/// volatile-* 只会淘汰带过期时间的键；volatile-ttl 让越早写入的键越早过期
fn key_ttl(policy: EvictionPolicy, index: usize) -> Option<Duration> {
    match policy {
        EvictionPolicy::VolatileTtl => Some(Duration::from_secs(1000 + index as u64 * 10)),
        p if p.is_volatile() => Some(Duration::from_secs(3600)),
        _ => None,
    }
}

async fn count_existing(cache: &dyn CachePort, keys: &[String]) -> AppResult<usize> {
    let mut count = 0;
    for key in keys {
        if cache.exists(key).await? {
            count += 1;
        }
    }
    Ok(count)
}

async fn restore(infra: &Infrastructure, previous: &EvictionSettings) -> AppResult<()> {
    let policy = previous.policy.parse()?;
    infra
        .redis_admin()
        .configure_eviction(&previous.max_memory.to_string(), policy)
        .await
}
