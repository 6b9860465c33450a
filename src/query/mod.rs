//! Parameterized SQL for recipe listings.
//!
//! Filters arrive as loosely typed query string values and are mapped onto
//! a closed set of predicates; every user supplied value is bound, never
//! spliced into the statement text.

mod filter;
mod pagination;

pub use filter::{RecipeFilter, RecipeListQuery, RecipePredicate, SortKey};
pub use pagination::{Page, PageInfo, Pagination};

/// Columns shared by every recipe summary query. Expects `r` (recipes),
/// `c` (categories) and `rs` (rating aggregates) to be in scope.
pub(crate) const SUMMARY_COLUMNS: &str = "r.id, r.title, r.cook_time, r.difficulty, r.cuisine, \
     r.veg_type, r.image_url, c.name AS category_name, rs.avg_rating AS avg_rating, \
     COALESCE(rs.ratings_count, 0) AS ratings_count";

pub(crate) const SUMMARY_JOINS: &str = " LEFT JOIN categories c ON c.id = r.category_id \
     LEFT JOIN (SELECT recipe_id, ROUND(AVG(rating), 1) AS avg_rating, COUNT(*) AS ratings_count \
     FROM ratings GROUP BY recipe_id) rs ON rs.recipe_id = r.id";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{0} query param is required")]
    Missing(&'static str),
    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl QueryError {
    pub fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        QueryError::Invalid {
            name,
            value: value.into(),
        }
    }
}
