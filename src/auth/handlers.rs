use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest, ImageResponse, UpdateProfileRequest},
        services,
        session::{clear_session_cookie, session_cookie, AuthUser},
    },
    errors::AppError,
    images::UploadItem,
    state::AppState,
    users::ProfileView,
};

/// Multipart field carrying the profile image.
pub const IMAGE_FIELD: &str = "profile-image";
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

type SetCookie = [(header::HeaderName, String); 1];

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/user-info", get(user_info))
        .route("/update-profile", post(update_profile))
        .route(
            "/add-profile-image",
            post(add_profile_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/remove-profile-image", delete(remove_profile_image))
        .route("/logout", post(logout))
}

fn set_cookie(state: &AppState, token: &str) -> SetCookie {
    [(header::SET_COOKIE, session_cookie(token, state.tokens.ttl()))]
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, SetCookie, Json<AuthResponse>), AppError> {
    let session = services::register(&state, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        set_cookie(&state, &session.token),
        Json(AuthResponse { user: session.user }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(SetCookie, Json<AuthResponse>), AppError> {
    let session = services::login(&state, &payload.email, &payload.password).await?;
    Ok((
        set_cookie(&state, &session.token),
        Json(AuthResponse { user: session.user }),
    ))
}

#[instrument(skip(state))]
pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(services::fetch_self(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileView>, AppError> {
    let view = services::save_profile(
        &state,
        user_id,
        &payload.first_name,
        &payload.last_name,
        payload.color,
    )
    .await?;
    Ok(Json(view))
}

/// POST /add-profile-image (multipart, field `profile-image`)
#[instrument(skip(state, mp))]
pub async fn add_profile_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<ImageResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        upload = Some(UploadItem {
            file_name,
            content_type,
            body,
        });
    }

    let image = services::add_profile_image(&state, user_id, upload).await?;
    Ok(Json(ImageResponse { image }))
}

#[instrument(skip(state))]
pub async fn remove_profile_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<&'static str, AppError> {
    services::remove_profile_image(&state, user_id).await?;
    Ok("Profile image removed successfully.")
}

/// Only clears the client's cookie; the token itself stays valid until it expires.
#[instrument]
pub async fn logout() -> (SetCookie, &'static str) {
    info!("logout");
    ([(header::SET_COOKIE, clear_session_cookie())], "Logout successfully.")
}
