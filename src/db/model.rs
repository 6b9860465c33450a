use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: Option<String>,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VegType {
    #[default]
    #[serde(rename = "veg")]
    Veg,
    #[serde(rename = "non-veg")]
    NonVeg,
}

impl VegType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VegType::Veg => "veg",
            VegType::NonVeg => "non-veg",
        }
    }
}

impl FromStr for VegType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "veg" => Ok(VegType::Veg),
            "non-veg" | "nonveg" | "non_veg" => Ok(VegType::NonVeg),
            _ => Err(ParseEnumError::new("veg_type", s)),
        }
    }
}

impl fmt::Display for VegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Denormalized listing row: recipe columns plus category name and
/// rating aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub cook_time: i64,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub veg_type: Option<String>,
    pub image_url: Option<String>,
    pub category_name: Option<String>,
    pub avg_rating: Option<f64>,
    pub ratings_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub cook_time: i64,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub veg_type: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: Option<String>,
    pub avg_rating: Option<f64>,
    pub ratings_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: RecipeRow,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminRecipeRow {
    pub id: i64,
    pub title: String,
    pub cook_time: i64,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub veg_type: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: Option<String>,
}

/// Row returned by the ingredient matcher before annotation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchRow {
    #[sqlx(flatten)]
    pub summary: RecipeSummary,
    pub matched_count: i64,
}

/// Validated recipe write. Ingredient names are already normalized.
#[derive(Debug, Clone, Default)]
pub struct RecipeInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub cook_time: i64,
    pub difficulty: Option<Difficulty>,
    pub cuisine: Option<String>,
    pub veg_type: VegType,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub rating: i64,
    pub review: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRating {
    pub recipe_id: i64,
    pub rating: i64,
    pub review: Option<String>,
    pub created_at: Option<String>,
    pub title: String,
    pub image_url: Option<String>,
    pub difficulty: Option<String>,
    pub cook_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeReview {
    pub rating: i64,
    pub review: Option<String>,
    pub created_at: Option<String>,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    pub recipes: i64,
    pub users: i64,
    pub ratings: i64,
    pub categories: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl DbError {
    /// Classify a failed write by the driver's constraint kind.
    pub fn from_write(e: sqlx::Error, what: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                return DbError::AlreadyExists(what.into());
            }
            if db.is_foreign_key_violation() {
                return DbError::NotFound(what.into());
            }
        }
        DbError::Sqlx(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;
