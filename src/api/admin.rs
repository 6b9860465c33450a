use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::error::{parse_id, ApiError, ApiResult};
use super::types::*;
use crate::db::{AdminRecipeRow, RecipeRepo, Stats, StatsRepo};
use crate::server::AppState;

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Stats>> {
    Ok(Json(state.db.stats().await?))
}

pub async fn list_recipes(State(state): State<AppState>) -> ApiResult<Json<Vec<AdminRecipeRow>>> {
    Ok(Json(state.db.list_admin_recipes().await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    body: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(req) = body?;
    let input = req.into_input()?;
    if input.title.is_none() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let id = state.db.create_recipe(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Recipe created".to_string(),
            id,
        }),
    ))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id, "recipe id")?;
    let Json(req) = body?;
    let input = req.into_input()?;
    state.db.update_recipe(id, &input).await?;
    Ok(Json(Message::new("Recipe updated")))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id, "recipe id")?;
    state.db.delete_recipe(id).await?;
    Ok(Json(Message::new("Recipe deleted")))
}
