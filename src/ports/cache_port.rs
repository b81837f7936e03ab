//! Keyed cache with explicit staleness tokens.

use std::sync::Arc;

pub trait CachePort<V>: Send + Sync {
    /// Hit only when an entry exists for `key` and was stored under `token`.
    fn get(&self, key: &str, token: &str) -> Option<Arc<V>>;
    fn set(&self, key: &str, token: &str, value: Arc<V>);
    fn invalidate(&self, key: &str);
    fn clear(&self);
}
