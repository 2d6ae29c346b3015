pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use store::{
    AccountStore, CatalogStore, EngagementStore, ListStore, RecommendationSource, SocialStore,
    Store, WatchPartyStore,
};
