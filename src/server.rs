use axum::{
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::api::{self, types::Status};
use crate::auth::TokenManager;
use crate::config::Config;
use crate::db::SqliteRepository;
use crate::middleware::{require_admin, require_auth, require_user};
use crate::recommend::Scorer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<SqliteRepository>,
    pub tokens: Arc<TokenManager>,
    pub scorer: Arc<Scorer>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<SqliteRepository>, tokens: TokenManager) -> Self {
        let scorer = Scorer::new(config.recommendations);
        Self {
            config: Arc::new(config),
            db,
            tokens: Arc::new(tokens),
            scorer: Arc::new(scorer),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/api/auth/register", axum::routing::post(api::auth::register))
        .route("/api/auth/login", axum::routing::post(api::auth::login))
        .route("/api/recipes", get(api::recipes::list_recipes))
        .route("/api/recipes/by-ingredients", get(api::recipes::by_ingredients))
        .route(
            "/api/recipes/ingredients/recommendations",
            get(api::recipes::near_miss),
        )
        .route("/api/recipes/:id", get(api::recipes::get_recipe))
        .route("/api/ingredients", get(api::recipes::list_ingredients))
        .route("/api/categories", get(api::categories::list_categories))
        .route(
            "/api/ratings/recipe/:recipe_id",
            get(api::ratings::recipe_ratings),
        )
        .route(
            "/api/recommendations/:recipe_id",
            get(api::recommendations::recommendations),
        );

    let account_routes = Router::new()
        .route("/api/auth/me", get(api::auth::me))
        .route_layer(from_fn(require_auth));

    let user_routes = Router::new()
        .route("/api/favorites", get(api::favorites::list_favorites))
        .route(
            "/api/favorites/:recipe_id",
            axum::routing::post(api::favorites::add_favorite).delete(api::favorites::remove_favorite),
        )
        .route("/api/ratings/me", get(api::ratings::my_ratings))
        .route(
            "/api/ratings/:recipe_id",
            get(api::ratings::get_my_rating)
                .post(api::ratings::add_rating)
                .put(api::ratings::update_rating),
        )
        .route_layer(from_fn(require_user));

    let admin_routes = Router::new()
        .route("/api/admin/stats", get(api::admin::stats))
        .route(
            "/api/admin/recipes",
            get(api::admin::list_recipes).post(api::admin::create_recipe),
        )
        .route(
            "/api/admin/recipes/:id",
            axum::routing::put(api::admin::update_recipe).delete(api::admin::delete_recipe),
        )
        .route(
            "/api/admin/categories",
            axum::routing::post(api::categories::create_category),
        )
        .route(
            "/api/admin/categories/:id",
            axum::routing::put(api::categories::update_category)
                .delete(api::categories::delete_category),
        )
        .route_layer(from_fn(require_admin));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(user_routes)
        .merge(admin_routes);

    if let Some(ref imagedir) = state.config.imagedir {
        router = router.nest_service("/images", ServeDir::new(imagedir));
    }

    router = match state.config.appdir {
        Some(ref appdir) => router.fallback_service(
            ServeDir::new(appdir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(fallback_handler.into_service()),
        ),
        None => router.fallback(fallback_handler),
    };

    router
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::attach_identity,
        ))
        .layer(from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> Json<Status> {
    Json(Status {
        message: "Recipe Finder API".to_string(),
        status: "ok".to_string(),
    })
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Route not found" })),
    )
}
