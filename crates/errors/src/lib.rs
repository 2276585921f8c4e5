//! aside-errors - 统一错误处理
//!
//! 区分「确认不存在」与「基础设施暂时不可用」，调用方据此决定是否重试

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 是否为「记录不存在」
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// 是否为暂时性故障（上层可重试）
    ///
    /// NotFound 是确定的结果，重试不会改变它
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Repository(_))
    }

    /// 稳定的错误码，用于日志和指标标签
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Serialization(_) => "serialization",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Repository(_) => "repository",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::store_unavailable("redis down").is_transient());
        assert!(AppError::repository("connection reset").is_transient());
        assert!(!AppError::not_found("user:1").is_transient());
        assert!(!AppError::serialization("bad json").is_transient());
        assert!(!AppError::invalid_argument("empty record").is_transient());
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        let err = AppError::not_found("user_id=42");
        assert!(err.is_not_found());
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "Not found: user_id=42");
    }
}
