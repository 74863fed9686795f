//! Response cache for the global index.
//!
//! A single in-process layer: rendered `GET /` responses (one entry per query
//! string) are kept for a fixed TTL in an LRU-bounded store.
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! max_entries = 64
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::ResponseKey;
pub use middleware::{CacheState, index_cache_layer};
pub use store::{CachedResponse, ResponseStore};
