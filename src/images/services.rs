use std::io;

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::storage::PROFILES_DIR;
use crate::users::{StoreError, UserPatch};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("file is required")]
    MissingFile,
    #[error("user not found")]
    UserNotFound,
    #[error("image storage failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UploadItem {
    /// Final path component of the client's filename, or a name derived from
    /// the content type when the client sent none.
    fn stored_name(&self) -> String {
        let from_client = self
            .file_name
            .as_deref()
            .and_then(|n| n.rsplit(['/', '\\']).next())
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != "." && *n != "..");
        match from_client {
            Some(name) => name.chars().filter(|c| !c.is_control()).collect(),
            None => match self.content_type.as_deref().and_then(ext_from_mime) {
                Some(ext) => format!("image.{ext}"),
                None => "image".to_string(),
            },
        }
    }
}

/// `uploads/profiles/<user id>/<unix millis>-<op id>-<name>`. The user id and
/// the per-operation id keep two uploads from ever sharing a path.
pub fn canonical_key(user_id: Uuid, op_id: Uuid, name: &str, at: OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("{PROFILES_DIR}/{user_id}/{millis}-{}-{name}", op_id.simple())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

/// Stores the upload at its canonical path, then points the user's record at
/// it. The record is only touched after the file is fully in place; if that
/// update fails the file stays behind as an orphan.
pub async fn attach(
    st: &AppState,
    user_id: Uuid,
    upload: Option<UploadItem>,
) -> Result<String, ImageError> {
    let upload = upload
        .filter(|u| !u.body.is_empty())
        .ok_or(ImageError::MissingFile)?;
    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ImageError::UserNotFound)?;

    let key = canonical_key(
        user_id,
        Uuid::new_v4(),
        &upload.stored_name(),
        OffsetDateTime::now_utc(),
    );
    st.storage.put_object(&key, upload.body).await?;

    if let Err(e) = st
        .users
        .update(user_id, &UserPatch::image(Some(key.clone())))
        .await
    {
        error!(error = %e, %user_id, key = %key, "image stored but record update failed; file orphaned");
        return Err(e.into());
    }

    // The old file is unreferenced now; failing to remove it only costs disk.
    if let Some(previous) = user.image.filter(|p| *p != key) {
        match st.storage.delete_object(&previous).await {
            Ok(_) => debug!(%user_id, previous = %previous, "replaced profile image removed"),
            Err(e) => warn!(error = %e, %user_id, previous = %previous, "failed to remove replaced profile image"),
        }
    }

    info!(%user_id, key = %key, "profile image attached");
    Ok(key)
}

/// Deletes the user's image file, then clears the record. A file that is
/// already gone counts as deleted.
pub async fn detach(st: &AppState, user_id: Uuid) -> Result<(), ImageError> {
    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ImageError::UserNotFound)?;
    let Some(path) = user.image else {
        debug!(%user_id, "no profile image to remove");
        return Ok(());
    };

    if !st.storage.delete_object(&path).await? {
        warn!(%user_id, path = %path, "profile image was already missing on disk");
    }
    st.users.update(user_id, &UserPatch::image(None)).await?;

    info!(%user_id, path = %path, "profile image removed");
    Ok(())
}

#[cfg(test)]
mod image_tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::state::AppState;
    use crate::storage::StorageClient;
    use crate::users::memory::MemoryUserRepo;

    fn png(name: &str) -> Option<UploadItem> {
        Some(UploadItem {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".into()),
            body: Bytes::from_static(b"\x89PNG\r\n"),
        })
    }

    async fn state_with_user(root: &std::path::Path) -> (AppState, Uuid) {
        let state = AppState::fake(root);
        let user = state.users.create("ada@example.com", "pw").await.unwrap();
        (state, user.id)
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn canonical_key_prefixes_millis_and_strips_directories() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let user = Uuid::from_u128(0xa1);
        let op = Uuid::from_u128(0xb2);
        let upload = png("../../etc/passwd").unwrap();
        assert_eq!(
            canonical_key(user, op, &upload.stored_name(), at),
            format!(
                "uploads/profiles/{user}/1700000000000-{}-passwd",
                op.simple()
            )
        );

        let windows = png("C:\\fakepath\\me.png").unwrap();
        assert_eq!(windows.stored_name(), "me.png");

        let unnamed = UploadItem {
            file_name: None,
            content_type: Some("image/jpeg".into()),
            body: Bytes::from_static(b"x"),
        };
        assert_eq!(unnamed.stored_name(), "image.jpg");
    }

    #[test]
    fn canonical_key_differs_per_user_and_per_operation() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let (ada, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let op = Uuid::new_v4();
        assert_ne!(
            canonical_key(ada, op, "avatar.png", at),
            canonical_key(bob, op, "avatar.png", at)
        );
        assert_ne!(
            canonical_key(ada, Uuid::new_v4(), "avatar.png", at),
            canonical_key(ada, Uuid::new_v4(), "avatar.png", at)
        );
    }

    #[tokio::test]
    async fn attach_then_detach_removes_file_and_reference() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_user(dir.path()).await;

        let key = attach(&state, id, png("me.png")).await.unwrap();
        assert!(key.starts_with(&format!("uploads/profiles/{id}/")));
        assert!(key.ends_with("me.png"));
        assert!(dir.path().join(&key).exists());
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.image.as_deref(), Some(key.as_str()));

        detach(&state, id).await.unwrap();
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert!(user.image.is_none());
        assert!(!dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn detach_without_image_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_user(dir.path()).await;
        detach(&state, id).await.unwrap();
        detach(&state, id).await.unwrap();
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert!(user.image.is_none());
    }

    #[tokio::test]
    async fn detach_tolerates_file_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_user(dir.path()).await;
        let key = attach(&state, id, png("me.png")).await.unwrap();
        std::fs::remove_file(dir.path().join(&key)).unwrap();

        detach(&state, id).await.unwrap();
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert!(user.image.is_none());
    }

    #[tokio::test]
    async fn attach_requires_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_user(dir.path()).await;
        assert!(matches!(
            attach(&state, id, None).await,
            Err(ImageError::MissingFile)
        ));
        let empty = UploadItem {
            file_name: Some("empty.png".into()),
            content_type: None,
            body: Bytes::new(),
        };
        assert!(matches!(
            attach(&state, id, Some(empty)).await,
            Err(ImageError::MissingFile)
        ));
    }

    #[tokio::test]
    async fn attach_for_unknown_user_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        let err = attach(&state, Uuid::new_v4(), png("me.png")).await.unwrap_err();
        assert!(matches!(err, ImageError::UserNotFound));
        let profiles = dir.path().join(PROFILES_DIR);
        let stored = std::fs::read_dir(&profiles).map(|d| d.count()).unwrap_or(0);
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn replacing_image_removes_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_user(dir.path()).await;
        let first = attach(&state, id, png("first.png")).await.unwrap();
        let second = attach(&state, id, png("second.png")).await.unwrap();

        assert!(!dir.path().join(&first).exists());
        assert!(dir.path().join(&second).exists());
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.image.as_deref(), Some(second.as_str()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_uploads_of_same_name_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        let ada = state.users.create("ada@example.com", "pw").await.unwrap().id;
        let bob = state.users.create("bob@example.com", "pw").await.unwrap().id;

        for _ in 0..20 {
            let upload = |bytes: &'static [u8]| {
                Some(UploadItem {
                    file_name: Some("avatar.png".into()),
                    content_type: Some("image/png".into()),
                    body: Bytes::from_static(bytes),
                })
            };
            let (a, b) = tokio::join!(
                attach(&state, ada, upload(b"AAAA")),
                attach(&state, bob, upload(b"BBBB"))
            );
            let (a, b) = (a.unwrap(), b.unwrap());
            assert_ne!(a, b);
            assert_eq!(std::fs::read(dir.path().join(&a)).unwrap(), b"AAAA");
            assert_eq!(std::fs::read(dir.path().join(&b)).unwrap(), b"BBBB");

            detach(&state, ada).await.unwrap();
            let bob_image = state.users.find_by_id(bob).await.unwrap().unwrap().image;
            assert_eq!(bob_image.as_deref(), Some(b.as_str()));
            assert!(dir.path().join(&b).exists());
        }
    }

    struct BrokenDisk;

    #[async_trait]
    impl StorageClient for BrokenDisk {
        async fn put_object(&self, _key: &str, _body: Bytes) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        async fn delete_object(&self, _key: &str) -> io::Result<bool> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn failed_move_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AppState::test_config(dir.path()));
        let state = AppState::from_parts(config, Arc::new(MemoryUserRepo::new()), Arc::new(BrokenDisk));
        let user = state.users.create("ada@example.com", "pw").await.unwrap();

        let err = attach(&state, user.id, png("me.png")).await.unwrap_err();
        assert!(matches!(err, ImageError::Io(_)));
        let reloaded = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.image.is_none());
    }

    #[tokio::test]
    async fn delete_failure_other_than_absent_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AppState::test_config(dir.path()));
        let state = AppState::from_parts(config, Arc::new(MemoryUserRepo::new()), Arc::new(BrokenDisk));
        let user = state.users.create("ada@example.com", "pw").await.unwrap();
        state
            .users
            .update(user.id, &UserPatch::image(Some("uploads/profiles/1x.png".into())))
            .await
            .unwrap();

        let err = detach(&state, user.id).await.unwrap_err();
        assert!(matches!(err, ImageError::Io(_)));
        let reloaded = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.image.as_deref(), Some("uploads/profiles/1x.png"));
    }
}
