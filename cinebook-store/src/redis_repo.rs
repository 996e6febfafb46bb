use redis::RedisResult;
use tracing::debug;

/// Thin Redis handle. Only request throttling lives here; seat state is
/// owned by the relational ledger.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns `true` while `key` is within `limit`
    /// requests for the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await?;

        if count > limit {
            debug!(key, count, limit, "rate limit exceeded");
        }
        Ok(count <= limit)
    }
}

pub fn rate_limit_key(client: &str) -> String {
    format!("rate_limit:{}", client)
}
