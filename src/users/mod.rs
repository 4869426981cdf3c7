pub mod dto;
pub mod memory;
pub mod profile;
pub mod repo;
pub mod repo_types;
pub mod store;

pub use dto::ProfileView;
pub use repo::{PgUserRepo, StoreError, UserRepo};
pub use repo_types::{User, UserPatch};
pub use store::CredentialStore;
