use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. Without it the service keeps users in memory.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// Directory that canonical image paths are resolved against.
    pub uploads_root: PathBuf,
    /// Allowed CORS origin for credentialed requests.
    pub origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_KEY").context("JWT_KEY must be set")?,
        };
        let uploads_root = std::env::var("UPLOADS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let origin = std::env::var("ORIGIN").ok().filter(|v| !v.is_empty());
        Ok(Self {
            database_url,
            jwt,
            uploads_root,
            origin,
        })
    }
}
