use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::error::{parse_id, ApiResult};
use super::types::Message;
use crate::auth::Identity;
use crate::db::{FavoriteRepo, RecipeSummary};
use crate::server::AppState;

pub async fn list_favorites(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<RecipeSummary>>> {
    Ok(Json(state.db.list_favorites(identity.id).await?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Path(recipe_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    if state.db.add_favorite(identity.id, recipe_id).await? {
        Ok((StatusCode::CREATED, Json(Message::new("Added to favorites"))))
    } else {
        Ok((StatusCode::OK, Json(Message::new("Already in favorites"))))
    }
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<Message>> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    state.db.remove_favorite(identity.id, recipe_id).await?;
    Ok(Json(Message::new("Removed from favorites")))
}
