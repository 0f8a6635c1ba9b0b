//! Redis cache implementation.
//!
//! Backs the fixed-window rate limiter and the cache health probe.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Pipeline, RedisError};

use super::health::HealthProbe;
use crate::config::{Config, CACHE_HEALTH_KEY, CACHE_PREFIX_RATE_LIMIT};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fixed-window request counter.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `identifier` in the current window.
    /// Returns (current_count, is_allowed).
    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    /// Round-trip to Redis.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: bool = conn.exists(CACHE_HEALTH_KEY).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for Cache {
    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let key = rate_limit_key(identifier);
        let mut conn = self.connection.clone();

        let (count, ttl): (u64, i64) = window_pipeline(&key).query_async(&mut conn).await?;
        // A counter without an expiry opens its window here. A failed EXPIRE
        // is retried by the next request instead of pinning the counter.
        if needs_expiry(ttl) {
            let _: bool = conn.expire(&key, window_seconds as i64).await?;
        }

        Ok((count, count <= max_requests))
    }
}

#[async_trait]
impl HealthProbe for Cache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> Result<(), String> {
        self.ping().await.map_err(|e| e.to_string())
    }
}

fn rate_limit_key(identifier: &str) -> String {
    format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier)
}

/// Count the hit and read the remaining window in one transaction.
fn window_pipeline(key: &str) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().incr(key, 1u64).ttl(key);
    pipe
}

/// `TTL` is -1 for a key that exists without an expiry.
fn needs_expiry(ttl: i64) -> bool {
    ttl == -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_is_prefixed() {
        assert_eq!(rate_limit_key("auth:10.0.0.1"), "rate_limit:auth:10.0.0.1");
    }

    #[test]
    fn test_window_counts_and_reads_ttl_atomically() {
        let packed = window_pipeline("rate_limit:general:10.0.0.1").get_packed_pipeline();
        let text = String::from_utf8_lossy(&packed);

        let order: Vec<usize> = ["MULTI", "INCR", "TTL", "EXEC"]
            .iter()
            .map(|cmd| text.find(cmd).unwrap_or_else(|| panic!("{cmd} missing")))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_only_counters_without_expiry_get_a_window() {
        assert!(needs_expiry(-1));
        // Missing key, or a window already running
        assert!(!needs_expiry(-2));
        assert!(!needs_expiry(0));
        assert!(!needs_expiry(900));
    }
}
