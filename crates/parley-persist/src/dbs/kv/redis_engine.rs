use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::dbs::kv::engine::KvEngine;
use crate::error::Result;

/// Redis engine over a multiplexed, auto-reconnecting connection
#[derive(Clone)]
pub struct RedisEngine {
    manager: ConnectionManager,
}

impl RedisEngine {
    /// Connect to `redis://`, `rediss://` or `redis+unix://`; fails fast when the server is unreachable
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KvEngine for RedisEngine {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self.conn().get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut self.conn()).await?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _: () = self.conn().set(key, value).await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let written: bool = self.conn().set_nx(key, value).await?;
        Ok(written)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let removed: i64 = self.conn().del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let found: bool = self.conn().exists(key).await?;
        Ok(found)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let next: i64 = self.conn().incr(key, 1).await?;
        Ok(next)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let _: i64 = self.conn().zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let removed: i64 = self.conn().zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let members: Vec<String> = self.conn().zrange(key, start, stop).await?;
        Ok(members)
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let members: Vec<String> = self.conn().zrevrange(key, start, stop).await?;
        Ok(members)
    }

    async fn zrevrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>> {
        let entries: Vec<(String, f64)> = self.conn().zrevrange_withscores(key, start, stop).await?;
        Ok(entries)
    }

    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        let members: Vec<String> = self.conn().zrangebyscore(key, min, max).await?;
        Ok(members)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let _: i64 = self.conn().sadd(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let removed: i64 = self.conn().srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let members: Vec<String> = self.conn().smembers(key).await?;
        Ok(members)
    }

    async fn close(&self) -> Result<()> {
        // the manager's connection is dropped with the last clone
        Ok(())
    }
}
