mod jwt;
mod password;

pub use jwt::{Claims, Identity, TokenManager};
pub use password::{hash_password, verify_password};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
