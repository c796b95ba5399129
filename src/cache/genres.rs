use crate::cache::CacheService;
use crate::models::Genre;
use redis::AsyncCommands;

const GENRES_KEY: &str = "genres";
const GENRES_TTL_SECS: u64 = 3600;

impl CacheService {
    pub async fn get_genres(&self) -> Vec<Genre> {
        if let Ok(genres) = self.get_genres_from_cache().await {
            return genres;
        }

        if let Ok(genres) = self.load_genres_from_db().await {
            let _ = self.save_genres_to_cache(&genres).await;
            return genres;
        }

        vec![]
    }

    pub async fn invalidate_genres(&self) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(GENRES_KEY).await;
    }

    async fn load_genres_from_db(&self) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as::<_, Genre>(
            "SELECT id, name, description FROM genres ORDER BY name",
        )
        .fetch_all(&self.db.pool)
        .await
    }

    async fn get_genres_from_cache(&self) -> Result<Vec<Genre>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(GENRES_KEY).await?;
        let genres: Vec<Genre> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(genres)
    }

    async fn save_genres_to_cache(&self, genres: &[Genre]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(genres).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(GENRES_KEY, data, GENRES_TTL_SECS).await
    }
}
