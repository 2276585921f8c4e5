//! 跨进程临界区
//!
//! 抢锁失败按退避节奏重试，临界区结束后总是释放锁

use std::future::Future;
use std::time::Duration;

use aside_common::{RetryConfig, poll_with_backoff};
use aside_config::LockConfig;
use aside_errors::{AppError, AppResult};
use aside_ports::DistributedLock;
use tracing::{debug, warn};

/// 由锁配置生成抢锁的重试节奏
pub fn lock_retry_config(config: &LockConfig) -> RetryConfig {
    RetryConfig::new(
        config.max_attempts,
        Duration::from_millis(config.initial_delay_ms),
        Duration::from_millis(config.max_delay_ms),
    )
}

/// 持有分布式锁执行 `f`
///
/// 重试耗尽仍未抢到锁时返回 `Conflict`。
/// `lease` 需覆盖临界区执行时间，过期的锁会被存储端回收
pub async fn with_lock<F, Fut, T>(
    lock: &dyn DistributedLock,
    key: &str,
    lease: Duration,
    retry: &RetryConfig,
    f: F,
) -> AppResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let token = poll_with_backoff(retry, "lock acquire", || lock.acquire(key, lease))
        .await?
        .ok_or_else(|| AppError::conflict(format!("Failed to acquire lock: {}", key)))?;
    debug!(key, owner = %token.owner, "Lock acquired");

    let result = f().await;

    // 临界区已执行完毕，释放失败只记录，交给租约过期兜底
    match lock.release(&token).await {
        Ok(true) => debug!(key, "Lock released"),
        Ok(false) => warn!(key, "Lock lease expired before release"),
        Err(e) => warn!(key, error = %e, "Failed to release lock"),
    }

    result
}
