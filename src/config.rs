use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for a whole service transaction.
    pub tx_timeout_secs: u64,
    /// How long SQLite waits on a locked database before giving up.
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = DbConfig {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://careerhub.db".into()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            tx_timeout_secs: env_or("DB_TX_TIMEOUT_SECS", 5),
            busy_timeout_secs: env_or("DB_BUSY_TIMEOUT_SECS", 5),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "careerhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "careerhub-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        Ok(Self { db, jwt })
    }
}
