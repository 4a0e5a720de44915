#![cfg(feature = "redis")]
//! Key-value backend against a live Redis server
//!
//! Ignored by default. Point `REDIS_URL` at a database that may be flushed
//! and run `cargo test --test redis_backend -- --ignored`.

#[macro_use]
mod common;

use std::sync::OnceLock;

use parley_persist::dbs::kv::RedisEngine;
use parley_persist::{create_provider, BackendKind, KvEngine, MemoryEngine, ProviderConfig};
use tokio::sync::{Mutex, MutexGuard};

use common::Harness;

/// Every test flushes the same database, so they take turns
async fn exclusive() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().await
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").expect("REDIS_URL must point at a Redis database that may be flushed")
}

async fn flush(url: &str) {
    let client = redis::Client::open(url).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await.unwrap();
}

async fn setup() -> Harness {
    let lock = exclusive().await;
    let url = redis_url();
    flush(&url).await;

    let config = ProviderConfig::new(url, "redis")
        .with_debug(true)
        .with_log_level("debug");
    let provider = create_provider(&config).await.unwrap();
    assert_eq!(provider.backend(), BackendKind::KeyValue);
    Harness::exclusive(provider, lock)
}

contract_tests!(#[ignore = "needs a Redis server at REDIS_URL"] setup);

/// Replies to the same command sequence, rendered for comparison
async fn replies(engine: &dyn KvEngine) -> Vec<String> {
    engine.set("s:a", "1").await.unwrap();
    engine.set("s:b", "2").await.unwrap();
    for (member, score) in [("b", 2.0), ("a", 2.0), ("c", 3.0), ("d", 5.0)] {
        engine.zadd("z", member, score).await.unwrap();
    }
    engine.sadd("set", "2").await.unwrap();
    engine.sadd("set", "1").await.unwrap();

    let mut members = engine.smembers("set").await.unwrap();
    members.sort();

    vec![
        format!("{:?}", engine.mget(&["s:a".to_string(), "s:missing".to_string(), "s:b".to_string()]).await.unwrap()),
        format!("{:?}", engine.mget(&[]).await.unwrap()),
        format!("{:?}", engine.set_nx("s:a", "other").await.unwrap()),
        format!("{:?}", engine.set_nx("s:c", "3").await.unwrap()),
        format!("{:?}", engine.incr("seq").await.unwrap()),
        format!("{:?}", engine.incr("seq").await.unwrap()),
        format!("{:?}", engine.zrange("z", 0, -1).await.unwrap()),
        format!("{:?}", engine.zrange("z", 1, 2).await.unwrap()),
        format!("{:?}", engine.zrange("z", 10, 20).await.unwrap()),
        format!("{:?}", engine.zrevrange("z", 0, 0).await.unwrap()),
        format!("{:?}", engine.zrevrange_withscores("z", 0, 1).await.unwrap()),
        format!("{:?}", engine.zrangebyscore("z", 2.0, 2.0).await.unwrap()),
        format!("{:?}", engine.zrangebyscore("z", 4.0, 4.0).await.unwrap()),
        format!("{members:?}"),
        format!("{:?}", engine.zrem("z", "a").await.unwrap()),
        format!("{:?}", engine.zrem("z", "a").await.unwrap()),
        format!("{:?}", engine.srem("set", "1").await.unwrap()),
        format!("{:?}", engine.del("s:a").await.unwrap()),
        format!("{:?}", engine.del("s:a").await.unwrap()),
        format!("{:?}", engine.exists("s:b").await.unwrap()),
        format!("{:?}", engine.get("s:a").await.unwrap()),
    ]
}

#[tokio::test]
#[ignore = "needs a Redis server at REDIS_URL"]
async fn test_engine_replies_match_memory_engine() {
    let _lock = exclusive().await;
    let url = redis_url();
    flush(&url).await;

    let redis = RedisEngine::connect(&url).await.unwrap();
    let memory = MemoryEngine::new();
    assert_eq!(replies(&redis).await, replies(&memory).await);
    redis.close().await.unwrap();
}
