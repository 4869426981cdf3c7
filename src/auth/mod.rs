use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;
pub mod session;

pub use claims::Claims;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
