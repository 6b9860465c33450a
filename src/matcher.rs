//! Ingredient based recipe matching.
//!
//! A recipe matches when enough of the queried ingredient ids appear in
//! its ingredient set: all of them in [`MatchMode::All`], at least one in
//! [`MatchMode::Any`]. Extra ingredients on the recipe never disqualify it.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{MatchRow, RecipeSummary};
use crate::query::{Pagination, QueryError, SUMMARY_COLUMNS, SUMMARY_JOINS};

/// Most suggestions returned by a near-miss lookup.
pub const NEAR_MISS_LIMIT: i64 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

impl MatchMode {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("any") => MatchMode::Any,
            _ => MatchMode::All,
        }
    }
}

/// Deduplicated set of positive ingredient ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientSet {
    ids: BTreeSet<i64>,
}

impl IngredientSet {
    /// Parse a comma separated id list. Blank entries are skipped; any
    /// entry that is not a positive integer rejects the whole list.
    pub fn parse(raw: Option<&str>) -> Result<Self, QueryError> {
        let mut ids = BTreeSet::new();
        for token in raw.unwrap_or_default().split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let id = token
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| QueryError::invalid("ingredient id", token))?;
            ids.insert(id);
        }
        if ids.is_empty() {
            return Err(QueryError::Missing("ids"));
        }
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    fn push_in_list(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        qb.push("(");
        let mut separated = qb.separated(", ");
        for id in &self.ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
    }

    /// `FROM .. GROUP BY r.id` over recipes sharing at least one queried
    /// ingredient, leaving the `HAVING` clause to the caller.
    fn push_grouped_source(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        qb.push(" FROM recipes r JOIN recipe_ingredients ri ON ri.recipe_id = r.id");
        qb.push(SUMMARY_JOINS);
        qb.push(" WHERE ri.ingredient_id IN ");
        self.push_in_list(qb);
        qb.push(" GROUP BY r.id HAVING COUNT(DISTINCT ri.ingredient_id) ");
    }
}

#[derive(Debug, Clone)]
pub struct IngredientMatch {
    pub ingredients: IngredientSet,
    pub mode: MatchMode,
}

impl IngredientMatch {
    pub fn new(ingredients: IngredientSet, mode: MatchMode) -> Self {
        Self { ingredients, mode }
    }

    fn push_having(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        match self.mode {
            MatchMode::All => {
                qb.push("= ");
                qb.push_bind(self.ingredients.len() as i64);
            }
            MatchMode::Any => {
                qb.push(">= ");
                qb.push_bind(1_i64);
            }
        }
    }

    /// Number of matching recipes, independent of the requested page.
    pub fn count_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (SELECT r.id");
        self.ingredients.push_grouped_source(&mut qb);
        self.push_having(&mut qb);
        qb.push(") t");
        qb
    }

    pub fn page_query(&self, pagination: &Pagination) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(SUMMARY_COLUMNS);
        qb.push(", COUNT(DISTINCT ri.ingredient_id) AS matched_count");
        self.ingredients.push_grouped_source(&mut qb);
        self.push_having(&mut qb);
        qb.push(" ORDER BY matched_count DESC, avg_rating DESC, r.id ASC LIMIT ");
        qb.push_bind(pagination.limit);
        qb.push(" OFFSET ");
        qb.push_bind(pagination.offset());
        qb
    }
}

/// Recipes that use most, but not all, of the queried ingredients.
#[derive(Debug, Clone)]
pub struct NearMiss {
    pub ingredients: IngredientSet,
    pub max_missing: i64,
}

impl NearMiss {
    pub const DEFAULT_MAX_MISSING: i64 = 2;

    /// `max_missing` is clamped to 1..=5.
    pub fn new(ingredients: IngredientSet, max_missing: i64) -> Self {
        Self {
            ingredients,
            max_missing: max_missing.clamp(1, 5),
        }
    }

    pub fn min_matched(&self) -> i64 {
        (self.ingredients.len() as i64 - self.max_missing).max(1)
    }

    pub fn query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(SUMMARY_COLUMNS);
        qb.push(", COUNT(DISTINCT ri.ingredient_id) AS matched_count");
        self.ingredients.push_grouped_source(&mut qb);
        qb.push(">= ");
        qb.push_bind(self.min_matched());
        qb.push(" AND COUNT(DISTINCT ri.ingredient_id) < ");
        qb.push_bind(self.ingredients.len() as i64);
        qb.push(" ORDER BY matched_count DESC, r.id ASC LIMIT ");
        qb.push_bind(NEAR_MISS_LIMIT);
        qb
    }

    pub fn accepts(&self, recipe: &MatchedRecipe) -> bool {
        recipe.missing_count > 0 && recipe.missing_count as i64 <= self.max_missing
    }
}

/// A matched recipe with its ingredient overlap spelled out by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedRecipe {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub matched_count: i64,
    pub matched_ingredients: Vec<String>,
    pub required_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
    pub missing_count: usize,
}

/// Split a recipe's full ingredient list into what the caller already has
/// (`selected`) and what is still missing.
pub fn annotate(row: MatchRow, required: Vec<String>, selected: &HashSet<String>) -> MatchedRecipe {
    let (matched, missing): (Vec<String>, Vec<String>) = required
        .iter()
        .cloned()
        .partition(|name| selected.contains(name));

    MatchedRecipe {
        summary: row.summary,
        matched_count: row.matched_count,
        matched_ingredients: matched,
        missing_count: missing.len(),
        missing_ingredients: missing,
        required_ingredients: required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;

    fn summary(id: i64) -> RecipeSummary {
        RecipeSummary {
            id,
            title: format!("recipe {}", id),
            cook_time: 20,
            difficulty: Some("Easy".into()),
            cuisine: None,
            veg_type: Some("veg".into()),
            image_url: None,
            category_name: None,
            avg_rating: None,
            ratings_count: 0,
        }
    }

    #[test]
    fn test_parse_ingredient_set() {
        let set = IngredientSet::parse(Some(" 9, 5,,9 ,5")).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid() {
        assert_eq!(IngredientSet::parse(None), Err(QueryError::Missing("ids")));
        assert_eq!(IngredientSet::parse(Some(" , ")), Err(QueryError::Missing("ids")));
        assert_eq!(
            IngredientSet::parse(Some("3,abc")),
            Err(QueryError::invalid("ingredient id", "abc"))
        );
        assert!(IngredientSet::parse(Some("0")).is_err());
        assert!(IngredientSet::parse(Some("-2,4")).is_err());
    }

    #[test]
    fn test_match_mode_from_param() {
        assert_eq!(MatchMode::from_param(None), MatchMode::All);
        assert_eq!(MatchMode::from_param(Some("ANY")), MatchMode::Any);
        assert_eq!(MatchMode::from_param(Some("whatever")), MatchMode::All);
    }

    #[test]
    fn test_having_clause_follows_mode() {
        let set = IngredientSet::parse(Some("5,9")).unwrap();
        let page = Pagination::new(1, 10, &PaginationConfig::default());

        let all = IngredientMatch::new(set.clone(), MatchMode::All);
        assert!(all
            .page_query(&page)
            .sql()
            .contains("WHERE ri.ingredient_id IN (?, ?) GROUP BY r.id HAVING COUNT(DISTINCT ri.ingredient_id) = ?"));
        assert!(all.count_query().sql().starts_with("SELECT COUNT(*) FROM (SELECT r.id FROM recipes r"));

        let any = IngredientMatch::new(set, MatchMode::Any);
        assert!(any
            .page_query(&page)
            .sql()
            .contains("HAVING COUNT(DISTINCT ri.ingredient_id) >= ? ORDER BY matched_count DESC, avg_rating DESC"));
    }

    #[test]
    fn test_near_miss_bounds() {
        let set = IngredientSet::parse(Some("1,2,3,4")).unwrap();
        let near = NearMiss::new(set.clone(), 9);
        assert_eq!(near.max_missing, 5);
        assert_eq!(near.min_matched(), 1);

        let near = NearMiss::new(set, NearMiss::DEFAULT_MAX_MISSING);
        assert_eq!(near.min_matched(), 2);
        assert!(near.query().sql().contains(">= ? AND COUNT(DISTINCT ri.ingredient_id) < ?"));
    }

    #[test]
    fn test_annotate_splits_matched_and_missing() {
        let selected: HashSet<String> = ["basil", "tomato"].iter().map(|s| s.to_string()).collect();
        let row = MatchRow {
            summary: summary(1),
            matched_count: 2,
        };
        let required = vec!["basil".to_string(), "cheese".to_string(), "tomato".to_string()];

        let matched = annotate(row, required, &selected);
        assert_eq!(matched.matched_ingredients, vec!["basil", "tomato"]);
        assert_eq!(matched.missing_ingredients, vec!["cheese"]);
        assert_eq!(matched.missing_count, 1);
        assert_eq!(matched.required_ingredients.len(), 3);

        let near = NearMiss::new(IngredientSet::parse(Some("1,2")).unwrap(), 1);
        assert!(near.accepts(&matched));
    }

    #[test]
    fn test_annotated_recipe_json_is_flat() {
        let row = MatchRow {
            summary: summary(7),
            matched_count: 1,
        };
        let matched = annotate(row, vec!["egg".into()], &HashSet::new());
        let json = serde_json::to_value(&matched).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["matched_count"], 1);
        assert_eq!(json["missing_count"], 1);
        assert_eq!(json["missing_ingredients"], serde_json::json!(["egg"]));
    }
}
