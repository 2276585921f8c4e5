//! 缓存键编码

use crate::model::Record;

/// 空值标记，表示「已确认不存在」
///
/// 与任何合法的 JSON 载荷都不相同，读取时必须在反序列化之前识别
pub const ABSENT_MARKER: &str = "NULL";

/// 缓存键生成器：`"<prefix><id>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 使用记录类型自带的前缀
    pub fn for_record<R: Record>() -> Self {
        Self::new(R::KEY_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key(&self, id: i64) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// 匹配全部键的模式，供重置工具使用
    pub fn pattern(&self) -> String {
        format!("{}*", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    #[test]
    fn test_key_format() {
        let keys = CacheKeys::for_record::<User>();
        assert_eq!(keys.key(1), "user:1");
        assert_eq!(keys.key(1024), "user:1024");
        assert_eq!(keys.pattern(), "user:*");
    }

    #[test]
    fn test_custom_prefix() {
        let keys = CacheKeys::new("demo:user:");
        assert_eq!(keys.key(7), "demo:user:7");
    }

    #[test]
    fn test_marker_is_not_json() {
        assert!(serde_json::from_str::<serde_json::Value>(ABSENT_MARKER).is_err());
    }
}
