use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::error::{parse_id, ApiError, ApiResult};
use super::types::*;
use crate::db::{Category, CategoryRepo};
use crate::server::AppState;

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.list_categories().await?))
}

fn category_name(req: &CategoryRequest) -> ApiResult<String> {
    req.name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Category name is required"))
}

pub async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(req) = body?;
    let name = category_name(&req)?;
    let id = state.db.create_category(&name).await?;
    info!(category_id = id, %name, "created category");
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Category created".to_string(),
            id,
        }),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id, "category id")?;
    let Json(req) = body?;
    let name = category_name(&req)?;
    state.db.update_category(id, &name).await?;
    Ok(Json(Message::new("Category updated")))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id, "category id")?;
    state.db.delete_category(id).await?;
    info!(category_id = id, "deleted category");
    Ok(Json(Message::new("Category deleted")))
}
