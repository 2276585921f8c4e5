//! 缓存实体

use aside_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// 可缓存的记录
///
/// `id` 由数据仓储在创建时分配，未分配（非正数）的记录视为空记录
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 缓存键前缀
    const KEY_PREFIX: &'static str;

    fn id(&self) -> i64;
}

/// 用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 创建尚未持久化的用户（id 为 0）
    pub fn new(username: impl Into<String>, email: impl Into<String>, age: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            age,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for User {
    const KEY_PREFIX: &'static str = "user:";

    fn id(&self) -> i64 {
        self.id
    }
}

/// 序列化为缓存载荷
pub fn encode<R: Record>(record: &R) -> AppResult<String> {
    serde_json::to_string(record).map_err(|e| {
        AppError::serialization(format!("Failed to serialize record {}: {}", record.id(), e))
    })
}

/// 从缓存载荷反序列化
pub fn decode<R: Record>(payload: &str) -> AppResult<R> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::serialization(format!("Failed to deserialize record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_every_field() {
        let mut user = User::new("alice", "alice@example.com", 25);
        user.id = 1;

        let payload = encode(&user).unwrap();
        let decoded: User = decode(&payload).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn test_decode_rejects_foreign_payload() {
        let err = decode::<User>(r#"{"id":"one"}"#).unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
