use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;
use crate::matcher::{annotate, IngredientMatch, IngredientSet, MatchedRecipe, NearMiss};
use crate::query::{Pagination, RecipeListQuery, SUMMARY_COLUMNS, SUMMARY_JOINS};
use crate::recommend::{RecipeProfile, ScoringInputs, LIKED_RATING};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives exactly as long as its connection.
        let pool_options = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Ingredient names per recipe, each list sorted by name.
    async fn ingredient_names_by_recipe(&self, recipe_ids: &[i64]) -> DbResult<HashMap<i64, Vec<String>>> {
        let mut by_recipe: HashMap<i64, Vec<String>> = HashMap::new();
        if recipe_ids.is_empty() {
            return Ok(by_recipe);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT ri.recipe_id, i.name FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id WHERE ri.recipe_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in recipe_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY i.name ASC");

        let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (recipe_id, name) in rows {
            by_recipe.entry(recipe_id).or_default().push(name);
        }
        Ok(by_recipe)
    }

    async fn ingredient_names(&self, ingredients: &IngredientSet) -> DbResult<HashSet<String>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT name FROM ingredients WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ingredients.ids() {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let names: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(names.into_iter().collect())
    }

    async fn annotate_rows(
        &self,
        rows: Vec<MatchRow>,
        ingredients: &IngredientSet,
    ) -> DbResult<Vec<MatchedRecipe>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let selected = self.ingredient_names(ingredients).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.summary.id).collect();
        let mut by_recipe = self.ingredient_names_by_recipe(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let required = by_recipe.remove(&row.summary.id).unwrap_or_default();
                annotate(row, required, &selected)
            })
            .collect())
    }
}

async fn ensure_category(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

async fn ensure_ingredient(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO ingredients (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM ingredients WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Category id for a recipe write: an explicit id must exist, otherwise a
/// name is resolved, creating the category on first reference.
async fn resolve_category(conn: &mut SqliteConnection, input: &RecipeInput) -> DbResult<Option<i64>> {
    if let Some(id) = input.category_id {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        return exists
            .map(Some)
            .ok_or_else(|| DbError::NotFound(format!("Category not found: {}", id)));
    }
    match input.category_name.as_deref() {
        Some(name) => Ok(Some(ensure_category(conn, name).await?)),
        None => Ok(None),
    }
}

async fn replace_ingredients(conn: &mut SqliteConnection, recipe_id: i64, names: &[String]) -> DbResult<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    for name in names {
        let ingredient_id = ensure_ingredient(conn, name).await?;
        sqlx::query("INSERT OR IGNORE INTO recipe_ingredients (recipe_id, ingredient_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(ingredient_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user_by_email(&self, email: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = ? COLLATE NOCASE",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", email)),
            _ => DbError::Sqlx(e),
        })
    }

    async fn get_user_by_id(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
            _ => DbError::Sqlx(e),
        })
    }

    async fn create_user(&self, user: &NewUser) -> DbResult<i64> {
        let result = sqlx::query("INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)")
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, format!("Email already registered: {}", user.email)))?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl RecipeRepo for SqliteRepository {
    async fn list_recipes(&self, query: &RecipeListQuery) -> DbResult<(Vec<RecipeSummary>, i64)> {
        let mut count = query.count_query();
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = query.page_query();
        let rows = page
            .build_query_as::<RecipeSummary>()
            .fetch_all(&self.pool)
            .await?;

        debug!(total, returned = rows.len(), "listed recipes");
        Ok((rows, total))
    }

    async fn get_recipe(&self, id: i64) -> DbResult<RecipeDetail> {
        let sql = format!(
            "SELECT r.id, r.title, r.description, r.steps, r.cook_time, r.difficulty, r.cuisine, \
             r.veg_type, r.image_url, r.category_id, c.name AS category_name, r.created_at, \
             rs.avg_rating AS avg_rating, COALESCE(rs.ratings_count, 0) AS ratings_count \
             FROM recipes r{} WHERE r.id = ?",
            SUMMARY_JOINS
        );
        let recipe = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("Recipe not found: {}", id)),
                _ => DbError::Sqlx(e),
            })?;

        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT i.id, i.name FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE ri.recipe_id = ? ORDER BY i.name ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecipeDetail { recipe, ingredients })
    }

    async fn list_admin_recipes(&self) -> DbResult<Vec<AdminRecipeRow>> {
        let rows = sqlx::query_as::<_, AdminRecipeRow>(
            "SELECT r.id, r.title, r.cook_time, r.difficulty, r.cuisine, r.veg_type, r.image_url, \
             r.category_id, c.name AS category_name, r.created_at \
             FROM recipes r LEFT JOIN categories c ON c.id = r.category_id \
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_recipe(&self, input: &RecipeInput) -> DbResult<i64> {
        let title = input.title.clone().unwrap_or_default();
        let mut tx = self.pool.begin().await?;

        let category_id = resolve_category(&mut tx, input).await?;

        let result = sqlx::query(
            "INSERT INTO recipes \
             (title, description, steps, cook_time, difficulty, cuisine, veg_type, image_url, category_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&title)
        .bind(&input.description)
        .bind(&input.steps)
        .bind(input.cook_time)
        .bind(input.difficulty.map(|d| d.as_str()))
        .bind(&input.cuisine)
        .bind(input.veg_type.as_str())
        .bind(&input.image_url)
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_write(e, format!("Recipe already exists: {}", title)))?;

        let recipe_id = result.last_insert_rowid();
        replace_ingredients(&mut tx, recipe_id, &input.ingredients).await?;
        tx.commit().await?;

        info!(recipe_id, title = %title, ingredients = input.ingredients.len(), "created recipe");
        Ok(recipe_id)
    }

    async fn update_recipe(&self, id: i64, input: &RecipeInput) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let category_id = resolve_category(&mut tx, input).await?;

        let result = sqlx::query(
            "UPDATE recipes SET title = COALESCE(?, title), description = ?, steps = ?, \
             cook_time = ?, difficulty = ?, cuisine = ?, veg_type = ?, image_url = ?, category_id = ? \
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.steps)
        .bind(input.cook_time)
        .bind(input.difficulty.map(|d| d.as_str()))
        .bind(&input.cuisine)
        .bind(input.veg_type.as_str())
        .bind(&input.image_url)
        .bind(category_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_write(e, format!("Recipe already exists: {:?}", input.title)))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Recipe not found: {}", id)));
        }

        if !input.ingredients.is_empty() {
            replace_ingredients(&mut tx, id, &input.ingredients).await?;
        }
        tx.commit().await?;

        info!(recipe_id = id, "updated recipe");
        Ok(())
    }

    async fn delete_recipe(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Recipe not found: {}", id)));
        }
        info!(recipe_id = id, "deleted recipe");
        Ok(())
    }
}

#[async_trait]
impl IngredientRepo for SqliteRepository {
    async fn list_ingredients(&self) -> DbResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>("SELECT id, name FROM ingredients ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn match_recipes(
        &self,
        query: &IngredientMatch,
        pagination: &Pagination,
    ) -> DbResult<(Vec<MatchedRecipe>, i64)> {
        let mut count = query.count_query();
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = query.page_query(pagination);
        let rows = page.build_query_as::<MatchRow>().fetch_all(&self.pool).await?;

        let recipes = self.annotate_rows(rows, &query.ingredients).await?;
        Ok((recipes, total))
    }

    async fn near_miss_recipes(&self, query: &NearMiss) -> DbResult<Vec<MatchedRecipe>> {
        let mut qb = query.query();
        let rows = qb.build_query_as::<MatchRow>().fetch_all(&self.pool).await?;

        let recipes = self.annotate_rows(rows, &query.ingredients).await?;
        Ok(recipes.into_iter().filter(|r| query.accepts(r)).collect())
    }
}

#[async_trait]
impl CategoryRepo for SqliteRepository {
    async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_category(&self, name: &str) -> DbResult<i64> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, format!("Category already exists: {}", name)))?;
        Ok(result.last_insert_rowid())
    }

    async fn update_category(&self, id: i64, name: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, format!("Category already exists: {}", name)))?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Category not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Category not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RatingRepo for SqliteRepository {
    async fn get_user_rating(&self, user_id: i64, recipe_id: i64) -> DbResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(
            "SELECT rating, review, created_at FROM ratings WHERE user_id = ? AND recipe_id = ?",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn add_rating(&self, user_id: i64, recipe_id: i64, rating: i64, review: Option<&str>) -> DbResult<()> {
        sqlx::query("INSERT INTO ratings (user_id, recipe_id, rating, review) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(recipe_id)
            .bind(rating)
            .bind(review)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from_write(e, format!("recipe {}", recipe_id)) {
                DbError::AlreadyExists(_) => {
                    DbError::AlreadyExists(format!("Rating for recipe {}", recipe_id))
                }
                DbError::NotFound(_) => DbError::NotFound(format!("Recipe not found: {}", recipe_id)),
                other => other,
            })?;
        Ok(())
    }

    async fn update_rating(&self, user_id: i64, recipe_id: i64, rating: i64, review: Option<&str>) -> DbResult<()> {
        let result = sqlx::query("UPDATE ratings SET rating = ?, review = ? WHERE user_id = ? AND recipe_id = ?")
            .bind(rating)
            .bind(review)
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Rating for recipe {}", recipe_id)));
        }
        Ok(())
    }

    async fn list_user_ratings(&self, user_id: i64) -> DbResult<Vec<UserRating>> {
        let rows = sqlx::query_as::<_, UserRating>(
            "SELECT rt.recipe_id, rt.rating, rt.review, rt.created_at, \
             r.title, r.image_url, r.difficulty, r.cook_time \
             FROM ratings rt JOIN recipes r ON r.id = rt.recipe_id \
             WHERE rt.user_id = ? ORDER BY rt.created_at DESC, rt.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_recipe_ratings(&self, recipe_id: i64) -> DbResult<Vec<RecipeReview>> {
        let rows = sqlx::query_as::<_, RecipeReview>(
            "SELECT rt.rating, rt.review, rt.created_at, u.name AS user_name \
             FROM ratings rt JOIN users u ON u.id = rt.user_id \
             WHERE rt.recipe_id = ? ORDER BY rt.created_at DESC, rt.id DESC",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl FavoriteRepo for SqliteRepository {
    async fn add_favorite(&self, user_id: i64, recipe_id: i64) -> DbResult<bool> {
        let result = sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => match DbError::from_write(e, format!("Recipe not found: {}", recipe_id)) {
                DbError::AlreadyExists(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn remove_favorite(&self, user_id: i64, recipe_id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_favorites(&self, user_id: i64) -> DbResult<Vec<RecipeSummary>> {
        let sql = format!(
            "SELECT {} FROM favorites f JOIN recipes r ON r.id = f.recipe_id{} \
             WHERE f.user_id = ? ORDER BY f.created_at DESC, f.id DESC",
            SUMMARY_COLUMNS, SUMMARY_JOINS
        );
        let rows = sqlx::query_as::<_, RecipeSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl RecommendationRepo for SqliteRepository {
    async fn load_scoring_inputs(&self, recipe_id: i64, user_id: Option<i64>) -> DbResult<ScoringInputs> {
        let target = sqlx::query_as::<_, (i64, String, i64, Option<String>, Option<String>, Option<String>)>(
            "SELECT id, title, cook_time, difficulty, cuisine, image_url FROM recipes WHERE id = ?",
        )
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("Recipe not found: {}", recipe_id)),
            _ => DbError::Sqlx(e),
        })?;

        let target_ingredients = sqlx::query_scalar::<_, String>(
            "SELECT i.name FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id WHERE ri.recipe_id = ?",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<
            _,
            (i64, String, i64, Option<String>, Option<String>, Option<String>, Option<String>),
        >(
            "SELECT r.id, r.title, r.cook_time, r.difficulty, r.cuisine, r.image_url, i.name \
             FROM recipes r \
             LEFT JOIN recipe_ingredients ri ON ri.recipe_id = r.id \
             LEFT JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE r.id <> ? ORDER BY r.id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<RecipeProfile> = Vec::new();
        for (id, title, cook_time, difficulty, cuisine, image_url, ingredient) in rows {
            if candidates.last().map(|c| c.id) != Some(id) {
                candidates.push(RecipeProfile {
                    id,
                    title,
                    cook_time,
                    difficulty,
                    cuisine,
                    image_url,
                    ingredients: HashSet::new(),
                });
            }
            if let (Some(name), Some(profile)) = (ingredient, candidates.last_mut()) {
                profile.ingredients.insert(name);
            }
        }

        let co_likes: HashMap<i64, i64> = sqlx::query_as::<_, (i64, i64)>(
            "SELECT r2.recipe_id, COUNT(*) FROM ratings r1 \
             JOIN ratings r2 ON r1.user_id = r2.user_id \
             WHERE r1.recipe_id = ? AND r1.rating >= ? \
               AND r2.recipe_id <> ? AND r2.rating >= ? \
             GROUP BY r2.recipe_id",
        )
        .bind(recipe_id)
        .bind(LIKED_RATING)
        .bind(recipe_id)
        .bind(LIKED_RATING)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let user_ratings: HashMap<i64, i64> = match user_id {
            Some(user_id) => sqlx::query_as::<_, (i64, i64)>(
                "SELECT recipe_id, rating FROM ratings WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect(),
            None => HashMap::new(),
        };

        Ok(ScoringInputs {
            target: RecipeProfile {
                id: target.0,
                title: target.1,
                cook_time: target.2,
                difficulty: target.3,
                cuisine: target.4,
                image_url: target.5,
                ingredients: target_ingredients.into_iter().collect(),
            },
            candidates,
            co_likes,
            user_ratings,
        })
    }
}

#[async_trait]
impl StatsRepo for SqliteRepository {
    async fn stats(&self) -> DbResult<Stats> {
        let (recipes, users, ratings, categories) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM recipes), (SELECT COUNT(*) FROM users), \
             (SELECT COUNT(*) FROM ratings), (SELECT COUNT(*) FROM categories)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Stats {
            recipes,
            users,
            ratings,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::matcher::MatchMode;
    use crate::query::{RecipeFilter, RecipePredicate, SortKey};

    async fn test_repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:").await.unwrap()
    }

    async fn add_user(repo: &SqliteRepository, email: &str) -> i64 {
        repo.create_user(&NewUser {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password_hash: "x".to_string(),
            role: Role::User,
        })
        .await
        .unwrap()
    }

    async fn add_recipe(repo: &SqliteRepository, title: &str, cuisine: &str, ingredients: &[&str]) -> i64 {
        repo.create_recipe(&RecipeInput {
            title: Some(title.to_string()),
            cuisine: Some(cuisine.to_string()),
            cook_time: 20,
            difficulty: Some(Difficulty::Easy),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    async fn ingredient_id(repo: &SqliteRepository, name: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM ingredients WHERE name = ?")
            .bind(name)
            .fetch_one(&repo.pool)
            .await
            .unwrap()
    }

    fn page(page: i64, limit: i64) -> Pagination {
        Pagination::new(page, limit, &PaginationConfig::default())
    }

    #[tokio::test]
    async fn test_all_mode_requires_every_ingredient() {
        let repo = test_repo().await;
        for (id, name) in [(5, "tomato"), (9, "basil"), (12, "garlic")] {
            sqlx::query("INSERT INTO ingredients (id, name) VALUES (?, ?)")
                .bind(id)
                .bind(name)
                .execute(&repo.pool)
                .await
                .unwrap();
        }
        let first = add_recipe(&repo, "Bruschetta", "Italian", &["tomato", "basil", "garlic"]).await;
        let second = add_recipe(&repo, "Garlic Tomatoes", "Italian", &["tomato", "garlic"]).await;

        let set = IngredientSet::parse(Some("5,9")).unwrap();
        let all = IngredientMatch::new(set.clone(), MatchMode::All);
        let (rows, total) = repo.match_recipes(&all, &page(1, 10)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary.id, first);
        assert_eq!(rows[0].matched_count, 2);
        assert_eq!(rows[0].matched_ingredients, vec!["basil", "tomato"]);
        assert_eq!(rows[0].missing_ingredients, vec!["garlic"]);

        let any = IngredientMatch::new(set, MatchMode::Any);
        let (rows, total) = repo.match_recipes(&any, &page(1, 10)).await.unwrap();
        assert_eq!(total, 2);
        let ids: Vec<(i64, i64)> = rows.iter().map(|r| (r.summary.id, r.matched_count)).collect();
        assert_eq!(ids, vec![(first, 2), (second, 1)]);
    }

    #[tokio::test]
    async fn test_any_mode_ties_broken_by_rating() {
        let repo = test_repo().await;
        let user = add_user(&repo, "ann@example.com").await;
        let low = add_recipe(&repo, "Plain Rice", "Indian", &["rice"]).await;
        let high = add_recipe(&repo, "Lemon Rice", "Indian", &["rice", "lemon"]).await;
        repo.add_rating(user, low, 2, None).await.unwrap();
        repo.add_rating(user, high, 5, None).await.unwrap();

        let rice = ingredient_id(&repo, "rice").await;
        let set = IngredientSet::parse(Some(rice.to_string().as_str())).unwrap();
        let (rows, _) = repo
            .match_recipes(&IngredientMatch::new(set, MatchMode::Any), &page(1, 10))
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.summary.id).collect();
        assert_eq!(ids, vec![high, low]);
        assert_eq!(rows[0].summary.avg_rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_match_pagination_keeps_total() {
        let repo = test_repo().await;
        for i in 0..3 {
            add_recipe(&repo, &format!("Egg dish {}", i), "French", &["egg"]).await;
        }
        let egg = ingredient_id(&repo, "egg").await;
        let query = IngredientMatch::new(IngredientSet::parse(Some(egg.to_string().as_str())).unwrap(), MatchMode::All);

        let (rows, total) = repo.match_recipes(&query, &page(2, 2)).await.unwrap();
        assert_eq!((rows.len(), total), (1, 3));
        let (rows, total) = repo.match_recipes(&query, &page(5, 2)).await.unwrap();
        assert_eq!((rows.len(), total), (0, 3));
    }

    #[tokio::test]
    async fn test_near_miss_recipes() {
        let repo = test_repo().await;
        let complete = add_recipe(&repo, "Caprese", "Italian", &["tomato", "basil", "mozzarella"]).await;
        let near = add_recipe(&repo, "Pesto", "Italian", &["basil", "garlic", "pine nuts"]).await;
        add_recipe(&repo, "Toast", "British", &["bread"]).await;

        let mut selected = Vec::new();
        for name in ["tomato", "basil", "mozzarella"] {
            selected.push(ingredient_id(&repo, name).await.to_string());
        }
        let set = IngredientSet::parse(Some(selected.join(",").as_str())).unwrap();

        let rows = repo.near_miss_recipes(&NearMiss::new(set, 2)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary.id, near);
        assert_ne!(rows[0].summary.id, complete);
        assert_eq!(rows[0].matched_ingredients, vec!["basil"]);
        assert_eq!(rows[0].missing_ingredients, vec!["garlic", "pine nuts"]);
        assert_eq!(rows[0].missing_count, 2);
    }

    #[tokio::test]
    async fn test_create_recipe_normalizes_and_resolves_category() {
        let repo = test_repo().await;
        let id = repo
            .create_recipe(&RecipeInput {
                title: Some("Shakshuka".into()),
                cuisine: Some("Middle Eastern".into()),
                category_name: Some("Breakfast".into()),
                ingredients: crate::util::split_ingredients("Egg, tomato ; egg,  Red  Pepper"),
                ..Default::default()
            })
            .await
            .unwrap();

        let detail = repo.get_recipe(id).await.unwrap();
        assert_eq!(detail.recipe.category_name.as_deref(), Some("Breakfast"));
        assert_eq!(detail.recipe.veg_type.as_deref(), Some("veg"));
        assert_eq!(detail.recipe.avg_rating, None);
        assert_eq!(detail.recipe.ratings_count, 0);
        let names: Vec<&str> = detail.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["egg", "red pepper", "tomato"]);

        let categories = repo.list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);

        let dup = repo
            .create_recipe(&RecipeInput {
                title: Some("Shakshuka".into()),
                cuisine: Some("Middle Eastern".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(dup, Err(DbError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_ingredients_are_shared_case_insensitively() {
        let repo = test_repo().await;
        add_recipe(&repo, "A", "x", &["garlic"]).await;
        sqlx::query("INSERT OR IGNORE INTO ingredients (name) VALUES ('GARLIC')")
            .execute(&repo.pool)
            .await
            .unwrap();
        assert_eq!(repo.list_ingredients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_recipe() {
        let repo = test_repo().await;
        let id = add_recipe(&repo, "Dal", "Indian", &["lentils"]).await;

        repo.update_recipe(
            id,
            &RecipeInput {
                title: None,
                cook_time: 35,
                veg_type: VegType::Veg,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let detail = repo.get_recipe(id).await.unwrap();
        assert_eq!(detail.recipe.title, "Dal");
        assert_eq!(detail.recipe.cook_time, 35);
        assert_eq!(detail.ingredients.len(), 1);

        repo.update_recipe(
            id,
            &RecipeInput {
                ingredients: vec!["lentils".into(), "cumin".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.get_recipe(id).await.unwrap().ingredients.len(), 2);

        let missing = repo.update_recipe(999, &RecipeInput::default()).await;
        assert!(matches!(missing, Err(DbError::NotFound(_))));

        let bad_category = repo
            .update_recipe(
                id,
                &RecipeInput {
                    category_id: Some(42),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_category, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_recipe_cascades() {
        let repo = test_repo().await;
        let user = add_user(&repo, "bo@example.com").await;
        let id = add_recipe(&repo, "Soup", "French", &["onion"]).await;
        repo.add_rating(user, id, 4, Some("nice")).await.unwrap();
        repo.add_favorite(user, id).await.unwrap();

        repo.delete_recipe(id).await.unwrap();
        assert!(matches!(repo.get_recipe(id).await, Err(DbError::NotFound(_))));
        assert!(repo.list_favorites(user).await.unwrap().is_empty());
        assert!(repo.list_user_ratings(user).await.unwrap().is_empty());
        assert!(matches!(repo.delete_recipe(id).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ratings_lifecycle() {
        let repo = test_repo().await;
        let a = add_user(&repo, "a@example.com").await;
        let b = add_user(&repo, "b@example.com").await;
        let c = add_user(&repo, "c@example.com").await;
        let id = add_recipe(&repo, "Pho", "Vietnamese", &["noodles"]).await;

        assert!(repo.get_user_rating(a, id).await.unwrap().is_none());
        repo.add_rating(a, id, 4, None).await.unwrap();
        repo.add_rating(b, id, 5, Some("great")).await.unwrap();
        repo.add_rating(c, id, 5, None).await.unwrap();

        let again = repo.add_rating(a, id, 3, None).await;
        assert!(matches!(again, Err(DbError::AlreadyExists(_))));

        let missing = repo.add_rating(a, 999, 3, None).await;
        assert!(matches!(missing, Err(DbError::NotFound(_))));

        let detail = repo.get_recipe(id).await.unwrap();
        assert_eq!(detail.recipe.avg_rating, Some(4.7));
        assert_eq!(detail.recipe.ratings_count, 3);

        repo.update_rating(a, id, 1, Some("changed my mind")).await.unwrap();
        let rating = repo.get_user_rating(a, id).await.unwrap().unwrap();
        assert_eq!(rating.rating, 1);
        assert_eq!(rating.review.as_deref(), Some("changed my mind"));

        let none = repo.update_rating(a, 999, 2, None).await;
        assert!(matches!(none, Err(DbError::NotFound(_))));

        let reviews = repo.list_recipe_ratings(id).await.unwrap();
        assert_eq!(reviews.len(), 3);
        assert!(reviews.iter().any(|r| r.user_name == "b" && r.review.as_deref() == Some("great")));

        let mine = repo.list_user_ratings(b).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Pho");
    }

    #[tokio::test]
    async fn test_favorites_are_idempotent() {
        let repo = test_repo().await;
        let user = add_user(&repo, "fav@example.com").await;
        let id = add_recipe(&repo, "Tacos", "Mexican", &["tortilla"]).await;

        assert!(repo.add_favorite(user, id).await.unwrap());
        assert!(!repo.add_favorite(user, id).await.unwrap());
        assert_eq!(repo.list_favorites(user).await.unwrap().len(), 1);

        assert!(matches!(repo.add_favorite(user, 999).await, Err(DbError::NotFound(_))));

        repo.remove_favorite(user, id).await.unwrap();
        repo.remove_favorite(user, id).await.unwrap();
        assert!(repo.list_favorites(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_recipes_filters_and_pages() {
        let repo = test_repo().await;
        for i in 0..5 {
            repo.create_recipe(&RecipeInput {
                title: format!("Curry {}", i).into(),
                cuisine: Some("Thai".into()),
                cook_time: 10 * (i + 1),
                category_name: Some(if i % 2 == 0 { "Mains" } else { "Soups" }.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        }
        add_recipe(&repo, "Pasta", "Italian", &[]).await;

        let query = RecipeListQuery {
            filter: RecipeFilter::new(vec![
                RecipePredicate::Cuisine("Thai".into()),
                RecipePredicate::MaxCookTime(40),
            ]),
            sort: SortKey::TimeDesc,
            pagination: page(1, 3),
        };
        let (rows, total) = repo.list_recipes(&query).await.unwrap();
        assert_eq!(total, 4);
        let times: Vec<i64> = rows.iter().map(|r| r.cook_time).collect();
        assert_eq!(times, vec![40, 30, 20]);

        let beyond = RecipeListQuery {
            pagination: page(9, 3),
            ..query.clone()
        };
        let (rows, total) = repo.list_recipes(&beyond).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 4);

        let by_name = RecipeListQuery {
            filter: RecipeFilter::new(vec![RecipePredicate::CategoryName("Soups".into())]),
            sort: SortKey::Newest,
            pagination: page(1, 10),
        };
        let (rows, total) = repo.list_recipes(&by_name).await.unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.category_name.as_deref() == Some("Soups")));

        let like = RecipeListQuery {
            filter: RecipeFilter::new(vec![RecipePredicate::TitleContains("%".into())]),
            sort: SortKey::Newest,
            pagination: page(1, 10),
        };
        let (_, total) = repo.list_recipes(&like).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_popular_sort_puts_unrated_last() {
        let repo = test_repo().await;
        let user = add_user(&repo, "pop@example.com").await;
        let unrated = add_recipe(&repo, "Unrated", "x", &[]).await;
        let good = add_recipe(&repo, "Good", "x", &[]).await;
        let ok = add_recipe(&repo, "Ok", "x", &[]).await;
        repo.add_rating(user, good, 5, None).await.unwrap();
        repo.add_rating(user, ok, 3, None).await.unwrap();

        let query = RecipeListQuery {
            filter: RecipeFilter::default(),
            sort: SortKey::Popular,
            pagination: page(1, 10),
        };
        let (rows, _) = repo.list_recipes(&query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![good, ok, unrated]);
        assert_eq!(rows[2].avg_rating, None);
    }

    #[tokio::test]
    async fn test_categories() {
        let repo = test_repo().await;
        let id = repo.create_category("Desserts").await.unwrap();
        assert!(matches!(
            repo.create_category("Desserts").await,
            Err(DbError::AlreadyExists(_))
        ));
        assert!(matches!(
            repo.create_category("desserts").await,
            Err(DbError::AlreadyExists(_))
        ));
        repo.create_category("Appetizers").await.unwrap();
        assert!(matches!(
            repo.update_category(id, "Appetizers").await,
            Err(DbError::AlreadyExists(_))
        ));
        assert!(matches!(
            repo.update_category(999, "Sweets").await,
            Err(DbError::NotFound(_))
        ));

        let recipe = repo
            .create_recipe(&RecipeInput {
                title: Some("Flan".into()),
                category_id: Some(id),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.delete_category(id).await.unwrap();
        assert_eq!(repo.get_recipe(recipe).await.unwrap().recipe.category_id, None);
        assert!(matches!(repo.delete_category(id).await, Err(DbError::NotFound(_))));

        let names: Vec<String> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Appetizers"]);
    }

    #[tokio::test]
    async fn test_recipe_title_and_cuisine_unique_ignoring_case() {
        let repo = test_repo().await;
        repo.create_recipe(&RecipeInput {
            title: Some("Pad Thai".into()),
            cuisine: Some("Thai".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        let dup = repo
            .create_recipe(&RecipeInput {
                title: Some("pad thai".into()),
                cuisine: Some("THAI".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(dup, Err(DbError::AlreadyExists(_))));

        repo.create_recipe(&RecipeInput {
            title: Some("pad thai".into()),
            cuisine: Some("Fusion".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        // Category names resolve to the existing row whatever their case.
        let a = repo
            .create_recipe(&RecipeInput {
                title: Some("Brownies".into()),
                category_name: Some("Desserts".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = repo
            .create_recipe(&RecipeInput {
                title: Some("Blondies".into()),
                category_name: Some("desserts".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let a = repo.get_recipe(a).await.unwrap().recipe.category_id;
        let b = repo.get_recipe(b).await.unwrap().recipe.category_id;
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(repo.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_users() {
        let repo = test_repo().await;
        let id = add_user(&repo, "Chef@Example.com").await;
        let user = repo.get_user_by_email("chef@example.com").await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role(), Role::User);

        let dup = repo
            .create_user(&NewUser {
                name: "again".into(),
                email: "chef@example.com".into(),
                password_hash: "y".into(),
                role: Role::User,
            })
            .await;
        assert!(matches!(dup, Err(DbError::AlreadyExists(_))));
        assert!(matches!(repo.get_user_by_id(999).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_scoring_inputs() {
        let repo = test_repo().await;
        let u1 = add_user(&repo, "u1@example.com").await;
        let u2 = add_user(&repo, "u2@example.com").await;
        let target = add_recipe(&repo, "Margherita", "Italian", &["tomato", "basil"]).await;
        let liked = add_recipe(&repo, "Lasagne", "Italian", &["tomato", "pasta"]).await;
        let bare = add_recipe(&repo, "Water", "None", &[]).await;

        for user in [u1, u2] {
            repo.add_rating(user, target, 5, None).await.unwrap();
            repo.add_rating(user, liked, 4, None).await.unwrap();
        }
        repo.add_rating(u1, bare, 1, None).await.unwrap();

        let inputs = repo.load_scoring_inputs(target, Some(u1)).await.unwrap();
        assert_eq!(inputs.target.id, target);
        assert_eq!(inputs.target.ingredients.len(), 2);
        assert_eq!(inputs.candidates.len(), 2);
        assert!(inputs.candidates.iter().all(|c| c.id != target));
        let bare_profile = inputs.candidates.iter().find(|c| c.id == bare).unwrap();
        assert!(bare_profile.ingredients.is_empty());
        assert_eq!(inputs.co_likes.get(&liked), Some(&2));
        assert_eq!(inputs.co_likes.get(&bare), None);
        assert_eq!(inputs.user_ratings.get(&bare), Some(&1));

        let anonymous = repo.load_scoring_inputs(target, None).await.unwrap();
        assert!(anonymous.user_ratings.is_empty());

        assert!(matches!(
            repo.load_scoring_inputs(999, None).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let repo = test_repo().await;
        let user = add_user(&repo, "s@example.com").await;
        let id = add_recipe(&repo, "Stew", "Irish", &["potato"]).await;
        repo.add_rating(user, id, 4, None).await.unwrap();
        repo.create_category("Mains").await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!((stats.recipes, stats.users, stats.ratings, stats.categories), (1, 1, 1, 1));
    }
}
