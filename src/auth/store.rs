/// Key-value store backing the refresh token store
///
/// The store must offer per-key TTL and an atomic get-and-delete. The
/// Redis implementation maps these onto `SET NX PX` and `GETDEL`, each a
/// single command; the in-memory one holds a single lock per operation.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::AppError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key` with a TTL unless the key already exists.
    /// Returns `false` when the key was present.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, AppError>;

    /// Read and remove `key` in one atomic step. Concurrent callers for the
    /// same key observe the value at most once between them.
    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

// ---------------- Redis Implementation ----------------

#[derive(Clone)]
pub struct RedisKeyValueStore {
    manager: ConnectionManager,
}

impl RedisKeyValueStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

// ---------------- In-Memory Implementation ----------------

#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let guard = self.entries.lock().await;
        guard.values().filter(|(_, expires_at)| *expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        // Tokens that expire unused are never read again; sweep them here
        guard.retain(|_, (_, expires_at)| *expires_at > now);
        if guard.contains_key(key) {
            return Ok(false);
        }
        guard.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, AppError> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        Ok(guard
            .remove(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
