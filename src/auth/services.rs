use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::images::{self, ImageError, UploadItem};
use crate::state::AppState;
use crate::users::{profile, ProfileView, StoreError};

/// A signed-in user together with the token that proves it.
#[derive(Debug)]
pub struct Session {
    pub user: ProfileView,
    pub token: String,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::NotFound => AppError::UserNotFound,
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::MissingFile => AppError::MissingFile,
            ImageError::UserNotFound => AppError::UserNotFound,
            ImageError::Io(e) => AppError::Io(e),
            ImageError::Store(e) => e.into(),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required.".into(),
        ));
    }
    Ok(())
}

pub async fn register(st: &AppState, email: &str, password: &str) -> Result<Session, AppError> {
    let email = normalize_email(email);
    require_credentials(&email, password)?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email.".into()));
    }

    let user = st.users.create(&email, password).await?;
    let token = st.tokens.issue(&user.email, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Session {
        user: user.into(),
        token,
    })
}

/// Unknown email and wrong password stay distinct here; clients may choose to
/// show them the same way.
pub async fn login(st: &AppState, email: &str, password: &str) -> Result<Session, AppError> {
    let email = normalize_email(email);
    require_credentials(&email, password)?;

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::UnknownEmail);
    };

    let ok = st.users.verify_password(&user, password).map_err(|e| {
        error!(error = %e, user_id = %user.id, "verify_password failed");
        AppError::Internal(e)
    })?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::WrongPassword);
    }

    let token = st.tokens.issue(&user.email, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Session {
        user: user.into(),
        token,
    })
}

pub async fn fetch_self(st: &AppState, user_id: Uuid) -> Result<ProfileView, AppError> {
    Ok(profile::get_profile(&st.users, user_id).await?)
}

pub async fn save_profile(
    st: &AppState,
    user_id: Uuid,
    first_name: &str,
    last_name: &str,
    color: i32,
) -> Result<ProfileView, AppError> {
    Ok(profile::update_profile(&st.users, user_id, first_name, last_name, color).await?)
}

pub async fn add_profile_image(
    st: &AppState,
    user_id: Uuid,
    upload: Option<UploadItem>,
) -> Result<String, AppError> {
    Ok(images::attach(st, user_id, upload).await?)
}

pub async fn remove_profile_image(st: &AppState, user_id: Uuid) -> Result<(), AppError> {
    Ok(images::detach(st, user_id).await?)
}
