use async_trait::async_trait;

use crate::error::Result;

/// The primitive operations the key-value stores are built from
///
/// Mirrors the Redis command set: plain string values, sorted sets (score +
/// member) and unordered sets. Range arguments follow Redis conventions:
/// inclusive on both ends, negative indices count from the tail.
#[async_trait]
pub trait KvEngine: Send + Sync {
    /// Short engine name used as the logging backend tag
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// One slot per key, `None` where the key is absent
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set only if absent; `true` when the value was written
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool>;

    /// `true` when a key was removed
    async fn del(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn incr(&self, key: &str) -> Result<i64>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    async fn zrem(&self, key: &str, member: &str) -> Result<bool>;

    /// Members by ascending score
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Members by descending score
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    async fn zrevrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>>;

    /// Members whose score lies in `min..=max`, ascending
    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    async fn srem(&self, key: &str, member: &str) -> Result<bool>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    async fn close(&self) -> Result<()>;
}
