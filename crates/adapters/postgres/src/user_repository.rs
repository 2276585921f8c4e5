//! PostgreSQL 用户仓储

use async_trait::async_trait;
use aside_cache_core::User;
use aside_errors::{AppError, AppResult};
use aside_ports::Repository;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

/// 用户仓储
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 全部用户 ID，升序
    pub async fn all_ids(&self) -> AppResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::repository(format!("Failed to list user ids: {}", e)))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::repository(format!("Failed to count users: {}", e)))?;

        Ok(count)
    }

    /// 清空用户表并重置自增 ID
    pub async fn truncate(&self) -> AppResult<()> {
        sqlx::query("TRUNCATE TABLE users RESTART IDENTITY")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::repository(format!("Failed to truncate users: {}", e)))?;

        info!("Users table truncated");
        Ok(())
    }
}

#[async_trait]
impl Repository<User> for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, age, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(row.into())),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(AppError::repository(format!("Failed to find user {}: {}", id, e))),
        }
    }

    async fn create(&self, entity: &User) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, age, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, username, email, age, created_at, updated_at
            "#,
        )
        .bind(&entity.username)
        .bind(&entity.email)
        .bind(entity.age)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::repository(format!("Failed to create user: {}", e)))?;

        Ok(row.into())
    }

    /// 按调用方给出的 `updated_at` 写入，刷新缓存时写入的正是同一份数据
    async fn update(&self, entity: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, age = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(entity.id)
        .bind(&entity.username)
        .bind(&entity.email)
        .bind(entity.age)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::repository(format!("Failed to update user {}: {}", entity.id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user {} does not exist", entity.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::repository(format!("Failed to delete user {}: {}", id, e)))?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    age: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            age: row.age,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
