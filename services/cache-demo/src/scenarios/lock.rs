//! 分布式锁保护的库存扣减
//!
//! 多个购买方并发扣减同一商品库存，读-改-写在锁内完成

use std::time::Duration;

use aside_bootstrap::Infrastructure;
use aside_cache_core::{lock_retry_config, with_lock};
use aside_errors::{AppError, AppResult};
use aside_ports::CachePort;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub const INITIAL_STOCK: i64 = 100;

/// 库存键的过期时间，扣减时保留
const STOCK_TTL: Duration = Duration::from_secs(3600);

pub struct LockOptions {
    pub product_id: String,
    pub quantity: i64,
    pub buyers: usize,
}

pub async fn run(infra: &Infrastructure, options: &LockOptions) -> AppResult<()> {
    let cache = infra.cache();
    let lock = infra.lock();
    let lock_config = &infra.config().lock;
    let lease = Duration::from_secs(lock_config.lease_secs);
    let retry = lock_retry_config(lock_config);

    let stock_key = format!("stock:product:{}", options.product_id);
    if cache.set_nx(&stock_key, &INITIAL_STOCK.to_string(), STOCK_TTL).await? {
        info!(key = %stock_key, stock = INITIAL_STOCK, "Stock initialized");
    }
    info!(key = %stock_key, stock = read_stock(cache.as_ref(), &stock_key).await?, "Current stock");

    let mut buyers = JoinSet::new();
    for buyer in 1..=options.buyers {
        let cache = cache.clone();
        let lock = lock.clone();
        let retry = retry.clone();
        let stock_key = stock_key.clone();
        let quantity = options.quantity;

        buyers.spawn(async move {
            let key = stock_key.clone();
            let result = with_lock(lock.as_ref(), &stock_key, lease, &retry, move || async move {
                let stock = read_stock(cache.as_ref(), &key).await?;
                let Some(remaining) = deduct(stock, quantity) else {
                    return Ok(None);
                };
                write_stock(cache.as_ref(), &key, remaining).await?;
                Ok::<_, AppError>(Some((stock, remaining)))
            })
            .await;
            (buyer, result)
        });
    }

    while let Some(joined) = buyers.join_next().await {
        let (buyer, result) =
            joined.map_err(|e| AppError::internal(format!("Buyer task failed: {}", e)))?;
        match result {
            Ok(Some((before, after))) => {
                info!(buyer, before, after, quantity = options.quantity, "Stock deducted")
            }
            Ok(None) => warn!(buyer, quantity = options.quantity, "Insufficient stock"),
            Err(e) => warn!(buyer, error = %e, "Purchase failed"),
        }
    }

    info!(key = %stock_key, stock = read_stock(cache.as_ref(), &stock_key).await?, "Final stock");
    Ok(())
}

async fn read_stock(cache: &dyn CachePort, key: &str) -> AppResult<i64> {
    let value = cache
        .get(key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("stock key {} does not exist", key)))?;
    value
        .parse()
        .map_err(|_| AppError::serialization(format!("invalid stock value: {}", value)))
}

async fn write_stock(cache: &dyn CachePort, key: &str, stock: i64) -> AppResult<()> {
    cache.set(key, &stock.to_string(), Some(STOCK_TTL)).await
}

/// 扣减后的库存，不足时返回 None
fn deduct(stock: i64, quantity: i64) -> Option<i64> {
    (quantity > 0 && stock >= quantity).then(|| stock - quantity)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// 只记录 set 调用的缓存
    #[derive(Default)]
    struct RecordingCache {
        sets: Mutex<Vec<(String, String, Option<Duration>)>>,
    }

    #[async_trait]
    impl CachePort for RecordingCache {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
            self.sets.lock().unwrap().push((key.to_string(), value.to_string(), ttl));
            Ok(())
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn ttl(&self, _key: &str) -> AppResult<Option<Duration>> {
            Ok(None)
        }

        async fn keys(&self, _pattern: &str) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<bool> {
            Ok(true)
        }

        async fn delete_if_equals(&self, _key: &str, _expected_value: &str) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_write_stock_keeps_ttl() {
        let cache = RecordingCache::default();
        write_stock(&cache, "stock:product:1", 90).await.unwrap();

        let sets = cache.sets.lock().unwrap();
        assert_eq!(
            sets.as_slice(),
            &[("stock:product:1".to_string(), "90".to_string(), Some(STOCK_TTL))]
        );
    }

    #[test]
    fn test_deduct() {
        assert_eq!(deduct(100, 10), Some(90));
        assert_eq!(deduct(10, 10), Some(0));
        assert_eq!(deduct(5, 10), None);
        assert_eq!(deduct(100, 0), None);
    }
}
