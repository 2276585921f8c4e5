//! 缓存雪崩：同一批写入的键是否同时过期
//!
//! 固定过期时间下整批键在同一秒失效，随机过期时间把失效时刻打散

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use aside_bootstrap::Infrastructure;
use aside_cache_core::User;
use aside_config::StrategyKind;
use aside_errors::{AppError, AppResult};
use aside_ports::Repository;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::counting::CountingRepository;
use crate::scenarios::lookup_service;

pub struct AvalancheOptions {
    pub batch: usize,
    pub base: Duration,
    /// 等待基础过期时间后并发查询，观察打到仓储的请求数
    pub wait: bool,
    pub requests: usize,
}

pub async fn run(infra: &Infrastructure, options: &AvalancheOptions) -> AppResult<()> {
    if options.batch == 0 {
        return Err(AppError::invalid_argument("batch size must be positive"));
    }
    let ids = ensure_users(infra, options.batch).await?;
    let cache = infra.cache();

    for kind in [StrategyKind::Plain, StrategyKind::RandomTtl] {
        let repo = Arc::new(CountingRepository::<User>::new(infra.user_repository()));
        let service = Arc::new(
            lookup_service(infra, repo.clone(), kind)
                .await?
                .with_ttl(Some(options.base)),
        );
        for &id in &ids {
            service.strategy().delete(id).await?;
        }

        let written = service.warm_up(&ids).await?;

        let mut ttls = Vec::with_capacity(ids.len());
        for &id in &ids {
            let key = service.strategy().keys().key(id);
            if let Some(ttl) = cache.ttl(&key).await? {
                info!(strategy = %kind, key = %key, ttl_secs = ttl.as_secs(), "Cached with expiry");
                ttls.push(ttl.as_secs());
            }
        }
        let spread = TtlSpread::from_secs(&ttls);
        info!(
            strategy = %kind,
            written,
            distinct_expiries = spread.distinct,
            min_ttl_secs = spread.min,
            max_ttl_secs = spread.max,
            "Batch warmed up"
        );

        if !options.wait {
            continue;
        }

        info!(strategy = %kind, wait_secs = options.base.as_secs(), "Waiting for the base expiry");
        tokio::time::sleep(options.base).await;
        repo.reset();

        let mut requests = JoinSet::new();
        for n in 0..options.requests {
            let service = service.clone();
            let id = ids[n % ids.len()];
            requests.spawn(async move { service.get_by_id(id).await });
        }
        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "Lookup failed"),
                Err(e) => return Err(AppError::internal(format!("Lookup task failed: {}", e))),
            }
        }
        info!(
            strategy = %kind,
            requests = options.requests,
            repository_reads = repo.reads(),
            "Concurrent lookups right after the base expiry"
        );
    }

    Ok(())
}

/// 取前 `batch` 个用户，不足时补建
async fn ensure_users(infra: &Infrastructure, batch: usize) -> AppResult<Vec<i64>> {
    let repo = infra.user_repository();
    let mut ids = repo.all_ids().await?;

    let mut n = ids.len();
    while ids.len() < batch {
        n += 1;
        let username = format!("avalanche_user_{}", n);
        let email = format!("{}@example.com", username);
        let created = repo.create(&User::new(username, email, 20)).await?;
        ids.push(created.id);
    }

    ids.truncate(batch);
    Ok(ids)
}

#[derive(Debug, PartialEq, Eq)]
struct TtlSpread {
    distinct: usize,
    min: u64,
    max: u64,
}

impl TtlSpread {
    fn from_secs(ttls: &[u64]) -> Self {
        let distinct: BTreeSet<u64> = ttls.iter().copied().collect();
        Self {
            distinct: distinct.len(),
            min: distinct.first().copied().unwrap_or_default(),
            max: distinct.last().copied().unwrap_or_default(),
        }
    }
}
