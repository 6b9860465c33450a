use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use super::error::{parse_id, ApiResult};
use super::types::DataList;
use crate::db::{Ingredient, IngredientRepo, RecipeDetail, RecipeRepo, RecipeSummary};
use crate::matcher::{IngredientMatch, IngredientSet, MatchMode, MatchedRecipe, NearMiss};
use crate::query::{Page, Pagination, QueryError, RecipeFilter, RecipeListQuery, SortKey};
use crate::server::AppState;
use crate::util::QueryParams;

pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Page<RecipeSummary>>> {
    let query = RecipeListQuery {
        filter: RecipeFilter::from_params(&params)?,
        sort: SortKey::from_param(params.get("sort")),
        pagination: Pagination::from_params(&params, &state.config.pagination),
    };

    let (rows, total) = state.db.list_recipes(&query).await?;
    Ok(Json(Page::new(rows, &query.pagination, total)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecipeDetail>> {
    let id = parse_id(&id, "recipe id")?;
    let recipe = state.db.get_recipe(id).await?;
    Ok(Json(recipe))
}

pub async fn by_ingredients(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Page<MatchedRecipe>>> {
    let ingredients = IngredientSet::parse(params.get("ids"))?;
    let mode = MatchMode::from_param(params.get("mode"));
    let pagination = Pagination::from_params(&params, &state.config.pagination);

    debug!(ingredients = ingredients.len(), ?mode, "matching recipes by ingredients");

    let query = IngredientMatch::new(ingredients, mode);
    let (rows, total) = state.db.match_recipes(&query, &pagination).await?;
    Ok(Json(Page::new(rows, &pagination, total)))
}

pub async fn list_ingredients(State(state): State<AppState>) -> ApiResult<Json<Vec<Ingredient>>> {
    Ok(Json(state.db.list_ingredients().await?))
}

/// Recipes the caller could cook by buying a few more ingredients.
pub async fn near_miss(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<DataList<MatchedRecipe>>> {
    let ingredients = match IngredientSet::parse(params.get("ids")) {
        Ok(set) if set.len() >= 2 => set,
        Ok(_) | Err(QueryError::Missing(_)) => return Ok(Json(DataList::new(Vec::new()))),
        Err(e) => return Err(e.into()),
    };
    let max_missing = params.get_i64_or("maxMissing", NearMiss::DEFAULT_MAX_MISSING);

    let rows = state
        .db
        .near_miss_recipes(&NearMiss::new(ingredients, max_missing))
        .await?;
    Ok(Json(DataList::new(rows)))
}
