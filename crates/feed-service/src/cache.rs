//! In-memory query cache with per-entry expiry.

use std::collections::HashMap;
use std::time::Duration;
use supabase_gateway::{Comment, Post};
use tokio::time::Instant;

/// Identifies one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// One zero-based page of the feed.
    Posts { page: u32 },
    Post(String),
    Comments(String),
}

impl QueryKey {
    pub fn is_posts_page(&self) -> bool {
        matches!(self, QueryKey::Posts { .. })
    }
}

#[derive(Debug, Clone)]
pub enum CachedQuery {
    Posts(Vec<Post>),
    Post(Post),
    Comments(Vec<Comment>),
}

#[derive(Debug, Clone)]
struct Entry {
    expires_at: Instant,
    value: CachedQuery,
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<QueryKey, Entry>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get(&mut self, key: &QueryKey, now: Instant) -> Option<CachedQuery> {
        self.cleanup(now);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: QueryKey, value: CachedQuery, now: Instant) {
        self.cleanup(now);
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            Entry {
                expires_at: now + self.ttl,
                value,
            },
        );
    }

    pub fn invalidate(&mut self, key: &QueryKey) {
        self.entries.remove(key);
    }

    /// Drop every page of the feed.
    pub fn invalidate_posts_pages(&mut self) {
        self.entries.retain(|key, _| !key.is_posts_page());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cleanup(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments() -> CachedQuery {
        CachedQuery::Comments(Vec::new())
    }

    #[test]
    fn entries_expire_after_ttl() {
        let now = Instant::now();
        let mut cache = QueryCache::new(Duration::from_secs(5));
        let key = QueryKey::Comments("p1".to_string());
        cache.insert(key.clone(), comments(), now);

        assert!(cache.get(&key, now + Duration::from_secs(4)).is_some());
        assert!(cache.get(&key, now + Duration::from_secs(5)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_posts_pages_keeps_other_queries() {
        let now = Instant::now();
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(QueryKey::Posts { page: 0 }, CachedQuery::Posts(Vec::new()), now);
        cache.insert(QueryKey::Posts { page: 1 }, CachedQuery::Posts(Vec::new()), now);
        cache.insert(QueryKey::Comments("p1".to_string()), comments(), now);

        cache.invalidate_posts_pages();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&QueryKey::Comments("p1".to_string())));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let now = Instant::now();
        let mut cache = QueryCache::new(Duration::ZERO);
        cache.insert(QueryKey::Comments("p1".to_string()), comments(), now);
        assert!(cache.is_empty());
    }
}
