use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::repo::{StoreError, UserRepo};
use super::repo_types::{NewUser, User, UserPatch};
use crate::auth::password::{hash_password, verify_password};

/// Owns user records and everything derived from the plaintext password.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepo>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn UserRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, email: &str, password: &str) -> Result<User, StoreError> {
        if email.is_empty() || password.is_empty() {
            return Err(StoreError::Validation(
                "Email and password are required.".into(),
            ));
        }
        if self.repo.find_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(StoreError::DuplicateEmail);
        }
        let password_hash = hash_password(password)?;
        // The unique index still backs the pre-check above under concurrent signups.
        self.repo
            .insert(NewUser {
                email: email.to_string(),
                password_hash,
            })
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.repo.find_by_email(email).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.repo.find_by_id(id).await
    }

    pub fn verify_password(&self, user: &User, password: &str) -> anyhow::Result<bool> {
        let ok = verify_password(password, &user.password_hash)?;
        debug!(user_id = %user.id, ok, "password checked");
        Ok(ok)
    }

    pub async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<User, StoreError> {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        if blank(&patch.first_name) || blank(&patch.last_name) {
            return Err(StoreError::Validation("Names must not be empty.".into()));
        }
        self.repo.update(id, patch).await
    }
}
