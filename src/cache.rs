// =============================================================================
// STOCK CACHE
// =============================================================================
// Read-through cache for the per-item stock view (GET /items/:id/stock).
//
// The database is the only source of truth. A cache failure never fails a
// request: reads fall back to the database, writes and invalidations are
// logged and dropped. Every committed ledger change invalidates the keys of
// the items it touched; a warehouse write flushes all of them.
// =============================================================================

use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;

use crate::metrics;

#[derive(Clone)]
pub struct StockCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

const STOCK_KEY_PATTERN: &str = "stock:*";
const SCAN_BATCH: usize = 100;

pub fn stock_key(item_id: &str) -> String {
    format!("stock:{}", item_id)
}

impl StockCache {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl_secs })
    }

    pub async fn get<T: DeserializeOwned>(&self, item_id: &str) -> Option<T> {
        let start = Instant::now();
        let raw: redis::RedisResult<Option<String>> = redis::cmd("GET")
            .arg(stock_key(item_id))
            .query_async(&mut self.conn.clone())
            .await;
        metrics::record_redis_operation("get", start.elapsed().as_secs_f64());

        match raw {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(item_id, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "Cache read failed");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, item_id: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "Cache value not serializable");
                return;
            }
        };

        let start = Instant::now();
        let result: redis::RedisResult<()> = redis::cmd("SETEX")
            .arg(stock_key(item_id))
            .arg(self.ttl_secs)
            .arg(json)
            .query_async(&mut self.conn.clone())
            .await;
        metrics::record_redis_operation("set", start.elapsed().as_secs_f64());

        if let Err(e) = result {
            tracing::warn!(item_id, error = %e, "Cache write failed");
        }
    }

    pub async fn invalidate<'a>(&self, item_ids: impl IntoIterator<Item = &'a str>) {
        let keys: Vec<String> = item_ids.into_iter().map(stock_key).collect();
        if keys.is_empty() {
            return;
        }

        let start = Instant::now();
        let result: redis::RedisResult<()> = redis::cmd("DEL")
            .arg(&keys)
            .query_async(&mut self.conn.clone())
            .await;
        metrics::record_redis_operation("delete", start.elapsed().as_secs_f64());

        if let Err(e) = result {
            tracing::warn!(keys = ?keys, error = %e, "Cache invalidation failed");
        }
    }

    /// Drop every cached stock view.
    ///
    /// Each view lists all floors of all warehouses, so a warehouse create,
    /// rename, resize or delete changes every item's view at once. SCAN walks
    /// the keyspace in batches instead of blocking Redis the way KEYS would.
    pub async fn invalidate_all(&self) {
        let start = Instant::now();
        let result = self.scan_and_delete().await;
        metrics::record_redis_operation("delete_all", start.elapsed().as_secs_f64());

        match result {
            Ok(removed) => tracing::debug!(removed, "Stock cache flushed"),
            Err(e) => tracing::warn!(error = %e, "Cache flush failed"),
        }
    }

    async fn scan_and_delete(&self) -> redis::RedisResult<usize> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(STOCK_KEY_PATTERN)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, ()>(&mut conn)
                    .await?;
                removed += keys.len();
            }

            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }

    pub async fn ping(&self) -> bool {
        let start = Instant::now();
        let ok = redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn.clone())
            .await
            .is_ok();
        metrics::record_redis_operation("ping", start.elapsed().as_secs_f64());
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_key() {
        assert_eq!(stock_key("BA_00042"), "stock:BA_00042");
    }

    #[tokio::test]
    async fn test_invalidate_all_drops_every_stock_view() {
        let Some(cache) = crate::db::test_support::cache().await else {
            return;
        };
        cache.put("BA_90001", &vec![1_i64, 2]).await;
        cache.put("BA_90002", &vec![3_i64]).await;

        cache.invalidate_all().await;

        assert_eq!(cache.get::<Vec<i64>>("BA_90001").await, None);
        assert_eq!(cache.get::<Vec<i64>>("BA_90002").await, None);
    }
}
