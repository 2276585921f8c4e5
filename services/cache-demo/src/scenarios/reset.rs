//! 恢复初始数据：清理缓存键和布隆过滤器，重建三条用户记录

use aside_bootstrap::Infrastructure;
use aside_cache_core::{CacheKeys, User};
use aside_errors::AppResult;
use aside_ports::Repository;
use tracing::info;

pub const SEED_USERS: [(&str, i32); 3] = [("alice", 25), ("bob", 30), ("charlie", 28)];

pub async fn run(infra: &Infrastructure) -> AppResult<()> {
    let admin = infra.redis_admin();
    let config = &infra.config().cache;

    let keys = CacheKeys::new(config.key_prefix.clone());
    let removed = admin.delete_matching(&keys.pattern()).await?;
    let bloom_removed = admin.delete_matching(&config.bloom.key).await?;
    info!(removed, bloom_removed, "Cache keys cleared");

    let repo = infra.user_repository();
    repo.truncate().await?;
    for (username, age) in SEED_USERS {
        let user = repo
            .create(&User::new(username, format!("{}@example.com", username), age))
            .await?;
        info!(id = user.id, username = %user.username, age = user.age, "User seeded");
    }

    info!(users = repo.count().await?, "Reset finished");
    Ok(())
}
