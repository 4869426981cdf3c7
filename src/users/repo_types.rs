use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub color: i32,
    pub image: Option<String>, // relative storage path
    pub profile_setup: bool,
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; the hash is computed by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// Partial update. `None` leaves the column untouched; `image: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub color: Option<i32>,
    pub profile_setup: Option<bool>,
    pub image: Option<Option<String>>,
}

impl UserPatch {
    pub fn image(path: Option<String>) -> Self {
        Self {
            image: Some(path),
            ..Self::default()
        }
    }

    /// Applies the patch in place. Shared by the in-memory repo and tests.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(color) = self.color {
            user.color = color;
        }
        if let Some(profile_setup) = self.profile_setup {
            user.profile_setup = profile_setup;
        }
        if let Some(image) = &self.image {
            user.image = image.clone();
        }
    }
}
