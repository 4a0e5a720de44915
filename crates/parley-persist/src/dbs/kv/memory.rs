use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dbs::kv::engine::KvEngine;
use crate::error::{PersistError, Result};

#[derive(Default)]
struct State {
    strings: HashMap<String, String>,
    zsets: HashMap<String, HashMap<String, f64>>,
    sets: HashMap<String, HashSet<String>>,
}

impl State {
    /// Sorted set entries by (score, member), ascending
    fn sorted(&self, key: &str) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .zsets
            .get(key)
            .map(|zset| zset.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        entries
    }
}

/// In-process engine with Redis semantics, selected with `memory://`
///
/// Nothing is persisted; state lives as long as the engine.
#[derive(Default)]
pub struct MemoryEngine {
    state: RwLock<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolve an inclusive Redis-style range against `len` items
fn range_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start >= len || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn slice<T: Clone>(items: &[T], start: isize, stop: isize) -> Vec<T> {
    match range_bounds(items.len(), start, stop) {
        Some((from, to)) => items[from..=to].to_vec(),
        None => Vec::new(),
    }
}

#[async_trait]
impl KvEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.read().await.strings.get(key).cloned())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let state = self.state.read().await;
        Ok(keys.iter().map(|key| state.strings.get(key).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .await
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.strings.contains_key(key) {
            return Ok(false);
        }
        state.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.strings.remove(key).is_some()
            | state.zsets.remove(key).is_some()
            | state.sets.remove(key).is_some();
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.strings.contains_key(key) || state.zsets.contains_key(key) || state.sets.contains_key(key))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut state = self.state.write().await;
        let current = match state.strings.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| PersistError::Backend(format!("value at {key} is not an integer")))?,
            None => 0,
        };
        let next = current + 1;
        state.strings.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        self.state
            .write()
            .await
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(zset) = state.zsets.get_mut(key) else {
            return Ok(false);
        };
        let removed = zset.remove(member).is_some();
        if zset.is_empty() {
            state.zsets.remove(key);
        }
        Ok(removed)
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let entries = self.state.read().await.sorted(key);
        Ok(slice(&entries, start, stop).into_iter().map(|(m, _)| m).collect())
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        Ok(self
            .zrevrange_withscores(key, start, stop)
            .await?
            .into_iter()
            .map(|(m, _)| m)
            .collect())
    }

    async fn zrevrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>> {
        let mut entries = self.state.read().await.sorted(key);
        entries.reverse();
        Ok(slice(&entries, start, stop))
    }

    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .sorted(key)
            .into_iter()
            .filter(|(_, score)| *score >= min && *score <= max)
            .map(|(m, _)| m)
            .collect())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        self.state
            .write()
            .await
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(set) = state.sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            state.sets.remove(key);
        }
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds() {
        assert_eq!(range_bounds(5, 0, -1), Some((0, 4)));
        assert_eq!(range_bounds(5, 1, 2), Some((1, 2)));
        assert_eq!(range_bounds(5, 3, 100), Some((3, 4)));
        assert_eq!(range_bounds(5, -2, -1), Some((3, 4)));
        assert_eq!(range_bounds(5, -100, 0), Some((0, 0)));
        assert_eq!(range_bounds(5, 5, 10), None);
        assert_eq!(range_bounds(5, 3, 2), None);
        assert_eq!(range_bounds(0, 0, -1), None);
    }

    #[tokio::test]
    async fn test_set_nx_only_writes_once() {
        let engine = MemoryEngine::new();
        assert!(engine.set_nx("k", "first").await.unwrap());
        assert!(!engine.set_nx("k", "second").await.unwrap());
        assert_eq!(engine.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_sorted_set_ordering() {
        let engine = MemoryEngine::new();
        engine.zadd("z", "c", 3.0).await.unwrap();
        engine.zadd("z", "a", 1.0).await.unwrap();
        engine.zadd("z", "b", 2.0).await.unwrap();

        assert_eq!(engine.zrange("z", 0, -1).await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(engine.zrevrange("z", 0, 1).await.unwrap(), vec!["c", "b"]);
        assert_eq!(
            engine.zrevrange_withscores("z", 0, 0).await.unwrap(),
            vec![("c".to_string(), 3.0)]
        );

        // re-adding moves the member
        engine.zadd("z", "a", 10.0).await.unwrap();
        assert_eq!(engine.zrevrange("z", 0, 0).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_zrangebyscore_is_inclusive() {
        let engine = MemoryEngine::new();
        engine.zadd("z", "b", 2.0).await.unwrap();
        engine.zadd("z", "a", 2.0).await.unwrap();
        engine.zadd("z", "c", 3.0).await.unwrap();
        engine.zadd("z", "d", 5.0).await.unwrap();

        assert_eq!(engine.zrangebyscore("z", 2.0, 2.0).await.unwrap(), vec!["a", "b"]);
        assert_eq!(engine.zrangebyscore("z", 2.0, 3.0).await.unwrap(), vec!["a", "b", "c"]);
        assert!(engine.zrangebyscore("z", 4.0, 4.0).await.unwrap().is_empty());
        assert!(engine.zrangebyscore("missing", 0.0, 10.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_collections_disappear() {
        let engine = MemoryEngine::new();
        engine.sadd("s", "1").await.unwrap();
        engine.zadd("z", "m", 1.0).await.unwrap();
        assert!(engine.srem("s", "1").await.unwrap());
        assert!(engine.zrem("z", "m").await.unwrap());
        assert!(!engine.exists("s").await.unwrap());
        assert!(!engine.exists("z").await.unwrap());
        assert!(engine.smembers("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incr_and_del() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.incr("seq").await.unwrap(), 1);
        assert_eq!(engine.incr("seq").await.unwrap(), 2);
        assert!(engine.del("seq").await.unwrap());
        assert!(!engine.del("seq").await.unwrap());

        engine.set("text", "abc").await.unwrap();
        assert!(engine.incr("text").await.is_err());
    }

    #[tokio::test]
    async fn test_mget_keeps_slots() {
        let engine = MemoryEngine::new();
        engine.set("a", "1").await.unwrap();
        let values = engine
            .mget(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None]);
    }
}
