use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::error::{parse_id, ApiError, ApiResult};
use super::types::*;
use crate::auth::Identity;
use crate::db::{DbError, Rating, RatingRepo, RecipeReview, UserRating};
use crate::server::AppState;

pub async fn my_ratings(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<UserRating>>> {
    Ok(Json(state.db.list_user_ratings(identity.id).await?))
}

pub async fn recipe_ratings(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<Vec<RecipeReview>>> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    Ok(Json(state.db.list_recipe_ratings(recipe_id).await?))
}

pub async fn get_my_rating(
    State(state): State<AppState>,
    identity: Identity,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<Option<Rating>>> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    Ok(Json(state.db.get_user_rating(identity.id, recipe_id).await?))
}

pub async fn add_rating(
    State(state): State<AppState>,
    identity: Identity,
    Path(recipe_id): Path<String>,
    body: Result<Json<RatingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    let Json(req) = body?;
    let rating = req.value()?;

    state
        .db
        .add_rating(identity.id, recipe_id, rating, req.review())
        .await
        .map_err(|e| match e {
            DbError::AlreadyExists(_) => {
                ApiError::Conflict("You already rated this recipe, update it instead".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = identity.id, recipe_id, rating, "rated recipe");
    Ok((StatusCode::CREATED, Json(Message::new("Rating added"))))
}

pub async fn update_rating(
    State(state): State<AppState>,
    identity: Identity,
    Path(recipe_id): Path<String>,
    body: Result<Json<RatingRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    let Json(req) = body?;
    let rating = req.value()?;

    state
        .db
        .update_rating(identity.id, recipe_id, rating, req.review())
        .await
        .map_err(|e| match e {
            DbError::NotFound(_) => ApiError::NotFound("Rating not found".to_string()),
            other => other.into(),
        })?;

    Ok(Json(Message::new("Rating updated")))
}
