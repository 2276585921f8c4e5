//! 测试用的内存实现，统计每类调用次数

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use aside_errors::{AppError, AppResult};
use aside_ports::{BloomMembership, CachePort, DistributedLock, LockToken, Repository};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::model::User;

pub(crate) fn user(id: i64, username: &str, age: i32) -> User {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    User {
        id,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        age,
        created_at: at,
        updated_at: at,
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
    ttl: Option<Duration>,
}

/// 支持过期的内存键值存储，时间取自 tokio 时钟
#[derive(Default)]
pub(crate) struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.gets() + self.sets() + self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
                ttl: None,
            },
        );
    }

    /// 绕过计数读取当前值
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.live(key, |entry| entry.value.clone())
    }

    pub(crate) fn last_ttl(&self, key: &str) -> Option<Duration> {
        self.live(key, |entry| entry.ttl).flatten()
    }

    fn live<T>(&self, key: &str, f: impl FnOnce(&Entry) -> T) -> Option<T> {
        let mut entries = self.entries.lock();
        let expired = entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| Instant::now() >= at);
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(f)
    }
}

#[async_trait]
impl CachePort for InMemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("mock cache read error"));
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("mock cache write error"));
        }
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|t| Instant::now() + t),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("mock cache delete error"));
        }
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.raw(key).is_some())
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        Ok(self.last_ttl(key))
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        if self.raw(key).is_some() {
            return Ok(false);
        }
        self.set(key, value, Some(ttl)).await?;
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool> {
        if self.raw(key).as_deref() == Some(expected_value) {
            self.entries.lock().remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}

/// 内存用户仓储
pub(crate) struct InMemoryRepository {
    users: Mutex<HashMap<i64, User>>,
    next_id: AtomicI64,
    finds: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub(crate) fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            finds: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.next_id.fetch_max(user.id + 1, Ordering::SeqCst);
            repo.users.lock().insert(user.id, user);
        }
        repo
    }

    pub(crate) fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::repository("mock repository connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<User> for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.users.lock().get(&id).cloned())
    }

    async fn create(&self, entity: &User) -> AppResult<User> {
        self.check()?;
        let mut created = entity.clone();
        created.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.users.lock().insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, entity: &User) -> AppResult<()> {
        self.check()?;
        let mut users = self.users.lock();
        match users.get_mut(&entity.id) {
            Some(existing) => {
                *existing = entity.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("user {} does not exist", entity.id))),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.check()?;
        self.users.lock().remove(&id);
        Ok(())
    }
}

/// 精确集合充当布隆过滤器（无误判）
#[derive(Default)]
pub(crate) struct InMemoryBloom {
    items: Mutex<HashSet<Vec<u8>>>,
    checks: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryBloom {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, item: &[u8]) -> bool {
        self.items.lock().contains(item)
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BloomMembership for InMemoryBloom {
    async fn add(&self, item: &[u8]) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("mock bloom error"));
        }
        self.items.lock().insert(item.to_vec());
        Ok(())
    }

    async fn may_exist(&self, item: &[u8]) -> AppResult<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("mock bloom error"));
        }
        Ok(self.contains(item))
    }
}

/// 内存分布式锁（无租约过期）
#[derive(Default)]
pub(crate) struct InMemoryLock {
    owners: Mutex<HashMap<String, String>>,
    counter: AtomicUsize,
}

impl InMemoryLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_held(&self, key: &str) -> bool {
        self.owners.lock().contains_key(key)
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn acquire(&self, key: &str, _lease: Duration) -> AppResult<Option<LockToken>> {
        let mut owners = self.owners.lock();
        if owners.contains_key(key) {
            return Ok(None);
        }
        let owner = format!("owner-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        owners.insert(key.to_string(), owner.clone());
        Ok(Some(LockToken {
            key: key.to_string(),
            owner,
        }))
    }

    async fn release(&self, token: &LockToken) -> AppResult<bool> {
        let mut owners = self.owners.lock();
        if owners.get(&token.key) == Some(&token.owner) {
            owners.remove(&token.key);
            return Ok(true);
        }
        Ok(false)
    }
}
