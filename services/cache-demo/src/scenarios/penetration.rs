//! 缓存穿透：反复查询不存在的记录
//!
//! 对比不缓存空结果与缓存空值标记时打到仓储的次数

use std::sync::Arc;

use aside_bootstrap::Infrastructure;
use aside_cache_core::User;
use aside_config::StrategyKind;
use aside_errors::AppResult;
use tracing::{info, warn};

use crate::counting::CountingRepository;
use crate::scenarios::lookup_service;

pub async fn run(infra: &Infrastructure, missing_id: i64, attempts: usize) -> AppResult<()> {
    let repo = Arc::new(CountingRepository::<User>::new(infra.user_repository()));
    let mut reads = Vec::new();

    for kind in [StrategyKind::Plain, StrategyKind::NullMarker] {
        repo.reset();
        let service = lookup_service(infra, repo.clone(), kind).await?;
        service.strategy().delete(missing_id).await?;

        for attempt in 1..=attempts {
            match service.get_by_id(missing_id).await {
                Err(e) if e.is_not_found() => info!(
                    strategy = %kind,
                    attempt,
                    repository_reads = repo.reads(),
                    "Missing record reported as not found"
                ),
                Ok(user) => warn!(strategy = %kind, id = user.id, "Record unexpectedly exists"),
                Err(e) => return Err(e),
            }
        }

        if kind == StrategyKind::NullMarker {
            info!(
                null_ttl_secs = service.strategy().null_ttl().as_secs(),
                "Absent marker cached for the missing id"
            );
        }
        reads.push((kind, repo.reads()));
    }

    let (_, without) = reads[0];
    let (_, with) = reads[1];
    info!(
        attempts,
        plain_reads = without,
        null_marker_reads = with,
        reduction_percent = reduction_percent(without, with),
        "Penetration comparison"
    );
    Ok(())
}

pub(crate) fn reduction_percent(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    before.saturating_sub(after) as f64 / before as f64 * 100.0
}
