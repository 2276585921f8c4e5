//! 演示场景，每个子命令对应一个模块

pub mod avalanche;
pub mod bloom;
pub mod eviction;
pub mod lock;
pub mod penetration;
pub mod reset;
pub mod strategies;

use std::sync::Arc;

use aside_bootstrap::Infrastructure;
use aside_cache_core::{LookupService, User};
use aside_config::StrategyKind;
use aside_errors::AppResult;
use aside_ports::Repository;
use tracing::info;

/// 按指定策略构建查询服务，其余参数取自配置
///
/// 布隆策略会先把仓储中已有的 ID 全部登记到过滤器
pub async fn lookup_service(
    infra: &Infrastructure,
    repo: Arc<dyn Repository<User>>,
    kind: StrategyKind,
) -> AppResult<LookupService<User>> {
    let mut config = infra.config().cache.clone();
    config.strategy = kind;

    let bloom = match kind {
        StrategyKind::BloomGated => Some(infra.bloom().await?),
        _ => None,
    };
    let service = LookupService::from_config(&config, repo, infra.cache(), bloom)?;

    if kind == StrategyKind::BloomGated {
        let ids = infra.user_repository().all_ids().await?;
        for &id in &ids {
            service.strategy().register(id).await?;
        }
        info!(registered = ids.len(), "Bloom filter seeded from repository");
    }

    Ok(service)
}
