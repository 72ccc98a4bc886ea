//! Process-local [`CounterStore`], used in development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{CounterStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, i64>,
    sets: HashMap<String, HashMap<String, f64>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_range(score: f64, min: f64, max: f64) -> bool {
    score >= min && score <= max
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.inner.lock().await.values.get(key).copied())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<i64>>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(keys.iter().map(|k| inner.values.get(k).copied()).collect())
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .values
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        let value = inner.values.entry(key.to_string()).or_insert(0);
        *value = value.saturating_add(1);
        Ok(*value)
    }

    async fn decr_floor_zero(&self, key: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        let value = inner.values.entry(key.to_string()).or_insert(0);
        *value = (*value - 1).max(0);
        Ok(*value)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        if score.is_nan() {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: "score is NaN".to_string(),
            });
        }
        self.inner
            .lock()
            .await
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        let count = inner.sets.get(key).map_or(0, |set| {
            set.values()
                .filter(|score| in_range(**score, min, max))
                .count()
        });
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let inner = self.inner.lock().await;
        let mut members: Vec<(String, f64)> = inner
            .sets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(_, score)| in_range(**score, min, max))
                    .map(|(member, score)| (member.clone(), *score))
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(members)
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(set) = inner.sets.get_mut(key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|_, score| !in_range(*score, min, max));
        let removed = before - set.len();
        if set.is_empty() {
            inner.sets.remove(key);
        }
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        let mut keys: Vec<String> = inner
            .values
            .keys()
            .chain(inner.sets.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn incr_creates_and_increments() {
        let store = MemoryStore::new();
        assert_eq!(store.get("views:a").await.unwrap(), None);
        assert_eq!(store.incr("views:a").await.unwrap(), 1);
        assert_eq!(store.incr("views:a").await.unwrap(), 2);
        assert_eq!(store.get("views:a").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn decr_never_goes_negative() {
        let store = MemoryStore::new();
        assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 0);
        store.incr("likes:a").await.unwrap();
        assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 0);
        assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mget_preserves_order_and_missing() {
        let store = MemoryStore::new();
        store.set("b", 7).await.unwrap();
        let values = store
            .mget(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some(7)]);
    }

    #[tokio::test]
    async fn sorted_set_range_ops_are_inclusive() {
        let store = MemoryStore::new();
        for (score, member) in [(1.0, "a"), (2.0, "b"), (3.0, "c")] {
            store.zadd("h", score, member).await.unwrap();
        }
        assert_eq!(store.zcount("h", 1.0, 2.0).await.unwrap(), 2);
        assert_eq!(
            store.zrange_by_score("h", 2.0, 3.0).await.unwrap(),
            vec![("b".to_string(), 2.0), ("c".to_string(), 3.0)]
        );
        assert_eq!(
            store
                .zremrangebyscore("h", f64::NEG_INFINITY, 1.0)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .zcount("h", f64::NEG_INFINITY, f64::INFINITY)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn zadd_existing_member_moves_score() {
        let store = MemoryStore::new();
        store.zadd("h", 1.0, "a").await.unwrap();
        store.zadd("h", 5.0, "a").await.unwrap();
        assert_eq!(store.zcount("h", 0.0, 10.0).await.unwrap(), 1);
        assert_eq!(store.zcount("h", 0.0, 2.0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn keys_with_prefix_covers_both_namespaces() {
        let store = MemoryStore::new();
        store.incr("views:a").await.unwrap();
        store.zadd("views:history:a", 1.0, "m").await.unwrap();
        store.incr("likes:a").await.unwrap();
        assert_eq!(
            store.keys_with_prefix("views:").await.unwrap(),
            vec!["views:a".to_string(), "views:history:a".to_string()]
        );
    }

    #[tokio::test]
    async fn nan_scores_are_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.zadd("h", f64::NAN, "a").await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
