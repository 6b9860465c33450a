use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use super::error::{parse_id, ApiResult};
use crate::auth::Identity;
use crate::db::RecommendationRepo;
use crate::recommend::Recommendation;
use crate::server::AppState;

/// Anonymous callers get plain similarity; signed-in users also get their
/// own rating history applied.
pub async fn recommendations(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<Vec<Recommendation>>> {
    let recipe_id = parse_id(&recipe_id, "recipe id")?;
    let user_id = identity.map(|i| i.id);

    let inputs = state.db.load_scoring_inputs(recipe_id, user_id).await?;
    let recommendations = state.scorer.recommend(&inputs);

    debug!(
        recipe_id,
        candidates = inputs.candidates.len(),
        returned = recommendations.len(),
        "scored recommendations"
    );
    Ok(Json(recommendations))
}
