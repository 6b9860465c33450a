use async_trait::async_trait;

use super::model::*;
use crate::matcher::{IngredientMatch, MatchedRecipe, NearMiss};
use crate::query::RecipeListQuery;
use crate::recommend::ScoringInputs;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: i64) -> DbResult<User>;
    async fn create_user(&self, user: &NewUser) -> DbResult<i64>;
}

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// One page of summaries plus the total row count of the filter.
    async fn list_recipes(&self, query: &RecipeListQuery) -> DbResult<(Vec<RecipeSummary>, i64)>;
    async fn get_recipe(&self, id: i64) -> DbResult<RecipeDetail>;
    async fn list_admin_recipes(&self) -> DbResult<Vec<AdminRecipeRow>>;
    async fn create_recipe(&self, input: &RecipeInput) -> DbResult<i64>;
    async fn update_recipe(&self, id: i64, input: &RecipeInput) -> DbResult<()>;
    async fn delete_recipe(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait IngredientRepo: Send + Sync {
    async fn list_ingredients(&self) -> DbResult<Vec<Ingredient>>;
    async fn match_recipes(
        &self,
        query: &IngredientMatch,
        pagination: &crate::query::Pagination,
    ) -> DbResult<(Vec<MatchedRecipe>, i64)>;
    async fn near_miss_recipes(&self, query: &NearMiss) -> DbResult<Vec<MatchedRecipe>>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn list_categories(&self) -> DbResult<Vec<Category>>;
    async fn create_category(&self, name: &str) -> DbResult<i64>;
    async fn update_category(&self, id: i64, name: &str) -> DbResult<()>;
    async fn delete_category(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait RatingRepo: Send + Sync {
    async fn get_user_rating(&self, user_id: i64, recipe_id: i64) -> DbResult<Option<Rating>>;
    async fn add_rating(&self, user_id: i64, recipe_id: i64, rating: i64, review: Option<&str>) -> DbResult<()>;
    async fn update_rating(&self, user_id: i64, recipe_id: i64, rating: i64, review: Option<&str>) -> DbResult<()>;
    async fn list_user_ratings(&self, user_id: i64) -> DbResult<Vec<UserRating>>;
    async fn list_recipe_ratings(&self, recipe_id: i64) -> DbResult<Vec<RecipeReview>>;
}

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Returns false when the favorite already existed.
    async fn add_favorite(&self, user_id: i64, recipe_id: i64) -> DbResult<bool>;
    async fn remove_favorite(&self, user_id: i64, recipe_id: i64) -> DbResult<()>;
    async fn list_favorites(&self, user_id: i64) -> DbResult<Vec<RecipeSummary>>;
}

#[async_trait]
pub trait RecommendationRepo: Send + Sync {
    async fn load_scoring_inputs(&self, recipe_id: i64, user_id: Option<i64>) -> DbResult<ScoringInputs>;
}

#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn stats(&self) -> DbResult<Stats>;
}
