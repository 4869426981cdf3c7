use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory, relative to the storage root, that profile images live in.
pub const PROFILES_DIR: &str = "uploads/profiles";
const SCRATCH_DIR: &str = "tmp";

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes `body` under `key`. Either the whole object lands at `key` or
    /// nothing does. An existing object at `key` is never replaced; that
    /// fails with `ErrorKind::AlreadyExists`.
    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()>;
    /// Removes `key`. Returns `false` if it was already gone.
    async fn delete_object(&self, key: &str) -> io::Result<bool>;
}

/// Local-disk storage. Keys are relative paths below `root`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(self.root.join(SCRATCH_DIR)).await?;
        fs::create_dir_all(self.root.join(PROFILES_DIR)).await?;
        Ok(())
    }

    pub fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()> {
        let dest = self.resolve(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let scratch_dir = self.root.join(SCRATCH_DIR);
        fs::create_dir_all(&scratch_dir).await?;

        // Spool to scratch first, then link into place: the link is atomic and
        // refuses to clobber an object that already sits at `dest`.
        let staged = scratch_dir.join(Uuid::new_v4().to_string());
        let placed = match fs::write(&staged, &body).await {
            Ok(()) => fs::hard_link(&staged, &dest).await,
            Err(e) => Err(e),
        };
        if let Err(cleanup) = fs::remove_file(&staged).await {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(error = %cleanup, path = %staged.display(), "failed to drop staged upload");
            }
        }
        placed?;
        debug!(key, bytes = body.len(), "object stored");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> io::Result<bool> {
        match fs::remove_file(self.resolve(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
