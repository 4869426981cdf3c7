use serde::{Deserialize, Serialize};

use crate::users::ProfileView;

/// Request body for signup and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub color: i32,
}

/// Response returned after signup or login; the token itself goes in a cookie.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: ProfileView,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image: String,
}
