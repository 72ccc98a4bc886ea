//! Postgres-backed [`CounterStore`].
//!
//! Integer counters live in `counters`, scored members in `counter_events`.
//! Every primitive is a single statement so concurrent callers never lose
//! an increment.

use std::collections::HashMap;

use async_trait::async_trait;
use folio_engagement::{CounterStore, StoreError};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn count_to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT value FROM counters WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<i64>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT key, value FROM counters WHERE key = ANY($1)")
                .bind(keys)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        let found: HashMap<String, i64> = rows.into_iter().collect();
        Ok(keys.iter().map(|k| found.get(k).copied()).collect())
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO counters (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO counters (key, value) VALUES ($1, 1) \
             ON CONFLICT (key) DO UPDATE SET value = counters.value + 1, updated_at = now() \
             RETURNING value",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn decr_floor_zero(&self, key: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO counters (key, value) VALUES ($1, 0) \
             ON CONFLICT (key) DO UPDATE SET value = GREATEST(counters.value - 1, 0), \
                                             updated_at = now() \
             RETURNING value",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        if score.is_nan() {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: "score is NaN".to_string(),
            });
        }
        sqlx::query(
            "INSERT INTO counter_events (key, member, score) VALUES ($1, $2, $3) \
             ON CONFLICT (key, member) DO UPDATE SET score = EXCLUDED.score",
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM counter_events WHERE key = $1 AND score BETWEEN $2 AND $3",
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(count_to_u64(count))
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        sqlx::query_as::<_, (String, f64)>(
            "SELECT member, score FROM counter_events \
             WHERE key = $1 AND score BETWEEN $2 AND $3 \
             ORDER BY score, member",
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM counter_events WHERE key = $1 AND score BETWEEN $2 AND $3",
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT key FROM counters WHERE starts_with(key, $1) \
             UNION \
             SELECT DISTINCT key FROM counter_events WHERE starts_with(key, $1) \
             ORDER BY 1",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::ping(&self.pool).await.map_err(StoreError::backend)
    }
}
