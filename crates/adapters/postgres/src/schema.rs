//! users 表结构
//!
//! 启动时幂等建表，不引入迁移框架

use aside_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::info;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(50) NOT NULL UNIQUE,
    email VARCHAR(100) NOT NULL,
    age INT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_EMAIL_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)";

/// 确保 users 表存在
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    for sql in [CREATE_USERS_TABLE, CREATE_EMAIL_INDEX] {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| AppError::repository(format!("Failed to create schema: {}", e)))?;
    }

    info!("Users schema ready");
    Ok(())
}
