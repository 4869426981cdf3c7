use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::jwt::{TokenService, SESSION_TTL};
use crate::config::AppConfig;
use crate::storage::{LocalStorage, StorageClient};
use crate::users::{memory::MemoryUserRepo, CredentialStore, PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: CredentialStore,
    pub tokens: TokenService,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo: Arc<dyn UserRepo> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserRepo::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserRepo::new())
            }
        };

        let storage = LocalStorage::new(&config.uploads_root);
        storage
            .init()
            .await
            .with_context(|| format!("prepare uploads under {}", config.uploads_root.display()))?;
        info!(root = %config.uploads_root.display(), "image storage ready");

        Ok(Self::from_parts(config, repo, Arc::new(storage)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        repo: Arc<dyn UserRepo>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let tokens = TokenService::new(config.jwt.secret.as_bytes(), SESSION_TTL);
        Self {
            config,
            users: CredentialStore::new(repo),
            tokens,
            storage,
        }
    }

    #[cfg(test)]
    pub fn test_config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
            },
            uploads_root: root.to_path_buf(),
            origin: None,
        }
    }

    /// In-memory users and real files under `root`.
    #[cfg(test)]
    pub fn fake(root: &std::path::Path) -> Self {
        let config = Arc::new(Self::test_config(root));
        let storage = Arc::new(LocalStorage::new(root)) as Arc<dyn StorageClient>;
        Self::from_parts(config, Arc::new(MemoryUserRepo::new()), storage)
    }
}
