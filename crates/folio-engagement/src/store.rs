use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed (connection, query, timeout).
    #[error("counter store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be interpreted.
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Key-value primitives the engagement layer is written against.
///
/// Integer keys and sorted-set keys live in separate namespaces; a key is
/// never both. Score ranges are inclusive on both ends. Each call is atomic
/// on its own but there are no multi-key transactions.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Values for many keys in one round trip, in the order given.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<i64>>, StoreError>;

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError>;

    /// Increment by one, creating the key at 0 first. Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Decrement by one without going below zero. Returns the new value.
    async fn decr_floor_zero(&self, key: &str) -> Result<i64, StoreError>;

    /// Add `member` with `score`, or move it to `score` if already present.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError>;

    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError>;

    /// Members with their scores in `[min, max]`, ascending by score.
    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError>;

    /// Remove members scored in `[min, max]`. Returns how many were removed.
    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError>;

    /// Every integer or sorted-set key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
