use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = Database::connect(&config.db).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: Database, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// State over a migrated in-memory database with fixed JWT settings.
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        use crate::config::{DbConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            db: DbConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                tx_timeout_secs: 5,
                busy_timeout_secs: 5,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });
        Self::from_parts(crate::test_support::memory_db().await, config)
    }
}
