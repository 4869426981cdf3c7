pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod images;
pub mod state;
pub mod storage;
pub mod users;
