//! Time-bounded response storage.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A fully buffered response, ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// LRU-bounded response store whose entries expire after a fixed TTL.
pub struct ResponseStore {
    ttl: Duration,
    responses: RwLock<LruCache<ResponseKey, Entry>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.index_ttl,
            responses: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`; an expired entry is dropped and reported as a miss.
    pub fn get_at(&self, key: &ResponseKey, now: Instant) -> Option<CachedResponse> {
        let mut responses = rw_write(&self.responses, SOURCE, "get");
        let expired = match responses.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            responses.pop(key);
        }
        None
    }

    /// Store a response. Returns the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        self.set_at(key, response, Instant::now())
    }

    pub fn set_at(
        &self,
        key: ResponseKey,
        response: CachedResponse,
        now: Instant,
    ) -> Option<ResponseKey> {
        let entry = Entry {
            response,
            expires_at: now + self.ttl,
        };
        rw_write(&self.responses, SOURCE, "set")
            .push(key.clone(), entry)
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted))
    }

    pub fn invalidate_all(&self) {
        rw_write(&self.responses, SOURCE, "invalidate_all").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
