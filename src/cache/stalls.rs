use crate::cache::CacheService;
use crate::models::Stall;
use redis::AsyncCommands;
use tracing::info;

const STALLS_KEY: &str = "stalls";
const STALLS_TTL_SECS: u64 = 3600;

impl CacheService {
    // Get the stall catalog, cache first
    pub async fn get_stalls(&self) -> Vec<Stall> {
        if let Ok(stalls) = self.get_stalls_from_cache().await {
            return stalls;
        }

        // Cache miss or Redis down - go to the database
        if let Ok(stalls) = self.load_stalls_from_db().await {
            let _ = self.save_stalls_to_cache(&stalls).await;
            return stalls;
        }

        vec![]
    }

    // Drop the cached catalog after any stall mutation
    pub async fn invalidate_stalls(&self) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(STALLS_KEY).await;
        info!("Invalidated stall catalog cache");
    }

    async fn load_stalls_from_db(&self) -> Result<Vec<Stall>, sqlx::Error> {
        sqlx::query_as::<_, Stall>(
            "SELECT id, name, size, dimension, price, status, pos_x, pos_y
             FROM stalls
             ORDER BY pos_y, pos_x",
        )
        .fetch_all(&self.db.pool)
        .await
    }

    async fn get_stalls_from_cache(&self) -> Result<Vec<Stall>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(STALLS_KEY).await?;
        let stalls: Vec<Stall> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(stalls)
    }

    async fn save_stalls_to_cache(&self, stalls: &[Stall]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(stalls).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(STALLS_KEY, data, STALLS_TTL_SECS).await
    }
}
