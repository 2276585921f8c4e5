//! 更新时的两种缓存一致性策略：更新缓存 / 删除缓存

use std::sync::Arc;

use aside_bootstrap::Infrastructure;
use aside_cache_core::User;
use aside_config::{ConsistencyPolicy, StrategyKind};
use aside_errors::AppResult;
use chrono::Utc;
use tracing::info;

use crate::counting::CountingRepository;
use crate::scenarios::lookup_service;

pub async fn run(
    infra: &Infrastructure,
    kind: StrategyKind,
    policies: &[ConsistencyPolicy],
) -> AppResult<()> {
    let cache = infra.cache();

    for (index, &policy) in policies.iter().enumerate() {
        let id = index as i64 + 1;
        let repo = Arc::new(CountingRepository::<User>::new(infra.user_repository()));
        let service = lookup_service(infra, repo.clone(), kind)
            .await?
            .with_consistency(policy);
        let key = service.strategy().keys().key(id);
        service.strategy().delete(id).await?;

        info!(%policy, strategy = %kind, id, "Consistency scenario started with a cold cache");

        let first = service.get_by_id(id).await?;
        info!(id, age = first.age, repository_reads = repo.reads(), "First lookup (cache miss)");

        let second = service.get_by_id(id).await?;
        info!(
            id,
            identical = second == first,
            repository_reads = repo.reads(),
            "Second lookup (cache hit)"
        );

        let mut updated = second.clone();
        updated.age += 1;
        updated.updated_at = Utc::now();
        service.update(&updated).await?;
        info!(
            id,
            age = updated.age,
            cached = cache.exists(&key).await?,
            "Record updated"
        );

        let reads_before = repo.reads();
        let third = service.get_by_id(id).await?;
        info!(
            id,
            age = third.age,
            repository_reads = repo.reads() - reads_before,
            "Lookup after update"
        );
    }

    Ok(())
}
