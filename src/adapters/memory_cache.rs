//! Process-local cache behind a read-write lock.

use crate::ports::cache_port::CachePort;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, (String, Arc<V>)>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + Sync> CachePort<V> for MemoryCache<V> {
    fn get(&self, key: &str, token: &str) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((stored, value)) if stored == token => Some(Arc::clone(value)),
            _ => None,
        }
    }

    fn set(&self, key: &str, token: &str, value: Arc<V>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (token.to_string(), value));
    }

    fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn hit_requires_matching_token() {
        let cache = MemoryCache::new();
        cache.set("k", "t1", Arc::new(5));
        assert_eq!(cache.get("k", "t1").as_deref(), Some(&5));
        assert!(cache.get("k", "t2").is_none());
        assert!(cache.get("other", "t1").is_none());
    }

    #[test]
    fn set_overwrites_token() {
        let cache = MemoryCache::new();
        cache.set("k", "t1", Arc::new(1));
        cache.set("k", "t2", Arc::new(2));
        assert!(cache.get("k", "t1").is_none());
        assert_eq!(cache.get("k", "t2").as_deref(), Some(&2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = MemoryCache::new();
        cache.set("a", "t", Arc::new(1));
        cache.set("b", "t", Arc::new(2));
        cache.invalidate("a");
        assert!(cache.get("a", "t").is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(MemoryCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.set(&format!("k{i}"), "t", Arc::new(i)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("k3", "t").as_deref(), Some(&3));
    }
}
