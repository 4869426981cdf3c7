pub mod services;

pub use services::{attach, detach, ImageError, UploadItem};
