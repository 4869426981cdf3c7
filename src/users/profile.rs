use tracing::info;
use uuid::Uuid;

use super::dto::ProfileView;
use super::repo::StoreError;
use super::repo_types::UserPatch;
use super::store::CredentialStore;

pub async fn get_profile(store: &CredentialStore, user_id: Uuid) -> Result<ProfileView, StoreError> {
    store
        .find_by_id(user_id)
        .await?
        .map(ProfileView::from)
        .ok_or(StoreError::NotFound)
}

/// Sets both names and the palette index. `color` is stored as given; mapping
/// it onto a palette is the client's business.
pub async fn update_profile(
    store: &CredentialStore,
    user_id: Uuid,
    first_name: &str,
    last_name: &str,
    color: i32,
) -> Result<ProfileView, StoreError> {
    let first_name = first_name.trim();
    let last_name = last_name.trim();
    if first_name.is_empty() {
        return Err(StoreError::Validation("firstName is required.".into()));
    }
    if last_name.is_empty() {
        return Err(StoreError::Validation("lastName is required.".into()));
    }

    let patch = UserPatch {
        first_name: Some(first_name.to_string()),
        last_name: Some(last_name.to_string()),
        color: Some(color),
        profile_setup: Some(true),
        image: None,
    };
    let user = store.update(user_id, &patch).await?;
    info!(user_id = %user.id, color, "profile updated");
    Ok(user.into())
}
