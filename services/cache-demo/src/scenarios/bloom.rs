//! 布隆过滤器前置检查
//!
//! 过滤器判定不存在的 ID 直接返回，既不查缓存也不查仓储

use std::sync::Arc;

use aside_bootstrap::Infrastructure;
use aside_cache_core::User;
use aside_config::StrategyKind;
use aside_errors::AppResult;
use tracing::info;

use crate::counting::CountingRepository;
use crate::scenarios::lookup_service;

pub async fn run(infra: &Infrastructure, missing_id: i64, attempts: usize) -> AppResult<()> {
    let repo = Arc::new(CountingRepository::<User>::new(infra.user_repository()));
    let service = lookup_service(infra, repo.clone(), StrategyKind::BloomGated).await?;

    if let Some(&existing) = infra.user_repository().all_ids().await?.first() {
        let user = service.get_by_id(existing).await?;
        info!(
            id = user.id,
            username = %user.username,
            repository_reads = repo.reads(),
            "Existing id passed the bloom filter"
        );
    }

    repo.reset();
    for attempt in 1..=attempts {
        let outcome = service.get_by_id(missing_id).await;
        info!(
            attempt,
            id = missing_id,
            not_found = outcome.as_ref().is_err_and(|e| e.is_not_found()),
            repository_reads = repo.reads(),
            "Lookup of unknown id"
        );
    }
    let gated_reads = repo.reads();

    // 同样的查询不经过滤器
    repo.reset();
    let plain = lookup_service(infra, repo.clone(), StrategyKind::Plain).await?;
    for _ in 0..attempts {
        let _ = plain.get_by_id(missing_id).await;
    }

    info!(
        attempts,
        bloom_gated_reads = gated_reads,
        plain_reads = repo.reads(),
        "Bloom filter comparison"
    );
    Ok(())
}
