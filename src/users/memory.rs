use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserRepo};
use super::repo_types::{NewUser, User, UserPatch};

/// In-process user table, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: None,
            last_name: None,
            color: 0,
            image: None,
            profile_setup: false,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        patch.apply_to(user);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let repo = MemoryUserRepo::new();
        repo.insert(new_user("a@example.com")).await.unwrap();
        let err = repo.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn update_only_touches_named_fields() {
        let repo = MemoryUserRepo::new();
        let user = repo.insert(new_user("b@example.com")).await.unwrap();
        repo.update(user.id, &UserPatch::image(Some("uploads/profiles/1a.png".into())))
            .await
            .unwrap();

        let patch = UserPatch {
            color: Some(2),
            ..UserPatch::default()
        };
        let updated = repo.update(user.id, &patch).await.unwrap();
        assert_eq!(updated.color, 2);
        assert_eq!(updated.image.as_deref(), Some("uploads/profiles/1a.png"));
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let repo = MemoryUserRepo::new();
        let err = repo
            .update(Uuid::new_v4(), &UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
