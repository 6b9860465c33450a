pub mod admin;
pub mod auth;
pub mod categories;
pub mod error;
pub mod favorites;
pub mod ratings;
pub mod recipes;
pub mod recommendations;
pub mod types;

pub use error::{ApiError, ApiResult};
