use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::db::{Difficulty, RecipeInput, User, VegType};
use crate::util::{normalize_ingredient_name, split_ingredients};

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub message: String,
    pub id: i64,
}

/// Unpaginated list wrapped as `{"data": [...]}`.
#[derive(Debug, Serialize)]
pub struct DataList<T> {
    pub data: Vec<T>,
}

impl<T> DataList<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: Option<serde_json::Value>,
    pub review: Option<String>,
}

impl RatingRequest {
    /// The rating as an integer in 1..=5. Numeric strings and integral
    /// floats such as `4.0` are accepted; fractional values are not.
    pub fn value(&self) -> ApiResult<i64> {
        let rating = match &self.rating {
            Some(serde_json::Value::Number(n)) => {
                n.as_i64().or_else(|| n.as_f64().and_then(integral))
            }
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        };
        rating
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| ApiError::bad_request("Rating must be an integer between 1 and 5"))
    }

    pub fn review(&self) -> Option<&str> {
        self.review.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Ingredients as either a JSON array or one comma/semicolon separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientList {
    List(Vec<String>),
    Text(String),
}

impl IngredientList {
    /// Normalized names, first occurrence wins.
    pub fn names(&self) -> Vec<String> {
        let names = match self {
            IngredientList::List(items) => items
                .iter()
                .map(|s| normalize_ingredient_name(s))
                .filter(|s| !s.is_empty())
                .collect(),
            IngredientList::Text(text) => split_ingredients(text),
        };
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        unique
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub cook_time: Option<i64>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub veg_type: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    #[serde(alias = "category")]
    pub category_name: Option<String>,
    pub ingredients: Option<IngredientList>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RecipeRequest {
    pub fn into_input(self) -> ApiResult<RecipeInput> {
        let difficulty = non_blank(&self.difficulty)
            .map(|d| d.parse::<Difficulty>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let veg_type = non_blank(&self.veg_type)
            .map(|v| v.parse::<VegType>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
            .unwrap_or_default();
        let cook_time = self.cook_time.unwrap_or(0);
        if cook_time < 0 {
            return Err(ApiError::bad_request("cook_time must not be negative"));
        }
        if matches!(self.category_id, Some(id) if id <= 0) {
            return Err(ApiError::bad_request("Invalid category id"));
        }

        Ok(RecipeInput {
            title: non_blank(&self.title),
            description: non_blank(&self.description),
            steps: non_blank(&self.steps),
            cook_time,
            difficulty,
            cuisine: non_blank(&self.cuisine),
            veg_type,
            image_url: non_blank(&self.image_url),
            category_id: self.category_id,
            category_name: non_blank(&self.category_name),
            ingredients: self.ingredients.map(|i| i.names()).unwrap_or_default(),
        })
    }
}
