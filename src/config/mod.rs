use serde::Deserialize;
use std::env;

// Top-level configuration container. One base URL per environment:
// everything the portals call lives behind this single host/port.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub reservation: ReservationConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

// Reservation workflow knobs
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    // Max PENDING + CONFIRMED reservations per user
    pub max_active: i64,
    // PENDING reservations older than this are reaped
    pub pending_ttl_minutes: i64,
    // Secret for entry-pass signatures
    pub pass_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_analytics: bool,
    pub enable_cleanup: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "bookfair_system=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                expires_in_hours: env::var("JWT_EXPIRES_IN_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .expect("JWT_EXPIRES_IN_HOURS must be a valid number"),
            },
            reservation: ReservationConfig {
                max_active: env::var("MAX_ACTIVE_RESERVATIONS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("MAX_ACTIVE_RESERVATIONS must be a valid number"),
                pending_ttl_minutes: env::var("PENDING_TTL_MINUTES")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .expect("PENDING_TTL_MINUTES must be a valid number"),
                pass_secret: env::var("PASS_SECRET").expect("PASS_SECRET must be set"),
            },
            features: FeatureFlags {
                enable_analytics: env::var("ENABLE_ANALYTICS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .expect("ENABLE_ANALYTICS must be true or false"),
                enable_cleanup: env::var("ENABLE_CLEANUP")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .expect("ENABLE_CLEANUP must be true or false"),
            },
        }
    }
}
