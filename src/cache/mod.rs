use crate::{database::Database, redis_client::RedisClient};
use tracing::info;

pub mod genres;
pub mod stalls;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database) -> Self {
        Self { redis, db }
    }

    // Warm the catalog caches at startup
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let (stalls, genres) = futures::join!(self.get_stalls(), self.get_genres());
        info!("Cache warmed: {} stalls, {} genres", stalls.len(), genres.len());

        info!("Cache warmup done");
    }
}
