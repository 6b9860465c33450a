use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::auth::{hash_password, verify_password, Identity};
use crate::db::{DbError, NewUser, Role, User, UserRepo};
use crate::server::AppState;

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(req) = body?;
    let (Some(name), Some(email), Some(password)) =
        (required(&req.name), required(&req.email), req.password.as_deref().filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Name, email and password are required"));
    };

    let password_hash = hash_password(password.to_string(), state.config.auth.bcrypt_cost).await?;
    let user = NewUser {
        name: name.to_string(),
        email: email.to_lowercase(),
        password_hash,
        role: Role::User,
    };

    let id = state.db.create_user(&user).await.map_err(|e| match e {
        DbError::AlreadyExists(_) => ApiError::Conflict("Email already registered".to_string()),
        other => other.into(),
    })?;

    info!(user_id = id, email = %user.email, "registered user");
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "User registered".to_string(),
            id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = body?;
    let (Some(email), Some(password)) = (required(&req.email), req.password.clone()) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = match state.db.get_user_by_email(email).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => {
            warn!(%email, "login for unknown email");
            return Err(invalid());
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        warn!(%email, "login with wrong password");
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    Ok(Json(LoginResponse { token, user }))
}

pub async fn me(State(state): State<AppState>, identity: Identity) -> ApiResult<Json<User>> {
    let user = state.db.get_user_by_id(identity.id).await?;
    Ok(Json(user))
}
