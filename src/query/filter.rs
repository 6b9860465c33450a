use sqlx::{QueryBuilder, Sqlite};

use super::{Pagination, QueryError, SUMMARY_COLUMNS, SUMMARY_JOINS};
use crate::db::{Difficulty, VegType};
use crate::util::QueryParams;

/// One `WHERE` clause term of a recipe listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipePredicate {
    TitleContains(String),
    Cuisine(String),
    Difficulty(Difficulty),
    VegType(VegType),
    CategoryId(i64),
    CategoryName(String),
    MaxCookTime(i64),
}

impl RecipePredicate {
    fn push(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            RecipePredicate::TitleContains(q) => {
                qb.push("r.title LIKE ");
                qb.push_bind(format!("%{}%", escape_like(q)));
                qb.push(" ESCAPE '\\'");
            }
            RecipePredicate::Cuisine(cuisine) => {
                qb.push("r.cuisine = ");
                qb.push_bind(cuisine.clone());
            }
            RecipePredicate::Difficulty(difficulty) => {
                qb.push("r.difficulty = ");
                qb.push_bind(difficulty.as_str());
            }
            RecipePredicate::VegType(veg_type) => {
                qb.push("r.veg_type = ");
                qb.push_bind(veg_type.as_str());
            }
            RecipePredicate::CategoryId(id) => {
                qb.push("r.category_id = ");
                qb.push_bind(*id);
            }
            RecipePredicate::CategoryName(name) => {
                qb.push("c.name = ");
                qb.push_bind(name.clone());
            }
            RecipePredicate::MaxCookTime(minutes) => {
                qb.push("r.cook_time <= ");
                qb.push_bind(*minutes);
            }
        }
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    predicates: Vec<RecipePredicate>,
}

impl RecipeFilter {
    pub fn new(predicates: Vec<RecipePredicate>) -> Self {
        Self { predicates }
    }

    /// Build a filter from `q`, `cuisine`, `difficulty`, `veg_type`,
    /// `maxTime` and `category` (numeric id or name).
    pub fn from_params(params: &QueryParams) -> Result<Self, QueryError> {
        let mut predicates = Vec::new();

        if let Some(q) = params.get("q") {
            predicates.push(RecipePredicate::TitleContains(q.to_string()));
        }
        if let Some(cuisine) = params.get("cuisine") {
            predicates.push(RecipePredicate::Cuisine(cuisine.to_string()));
        }
        if let Some(difficulty) = params.get("difficulty") {
            let difficulty = difficulty
                .parse::<Difficulty>()
                .map_err(|_| QueryError::invalid("difficulty", difficulty))?;
            predicates.push(RecipePredicate::Difficulty(difficulty));
        }
        if let Some(veg_type) = params.get("veg_type") {
            let veg_type = veg_type
                .parse::<VegType>()
                .map_err(|_| QueryError::invalid("veg_type", veg_type))?;
            predicates.push(RecipePredicate::VegType(veg_type));
        }
        if let Some(max_time) = params.get("maxTime") {
            let minutes = max_time
                .parse::<i64>()
                .ok()
                .filter(|m| *m >= 0)
                .ok_or_else(|| QueryError::invalid("maxTime", max_time))?;
            predicates.push(RecipePredicate::MaxCookTime(minutes));
        }
        if let Some(category) = params.get("category") {
            if !category.is_empty() && category.bytes().all(|b| b.is_ascii_digit()) {
                let id = category
                    .parse::<i64>()
                    .map_err(|_| QueryError::invalid("category", category))?;
                predicates.push(RecipePredicate::CategoryId(id));
            } else {
                predicates.push(RecipePredicate::CategoryName(category.to_string()));
            }
        }

        Ok(Self { predicates })
    }

    pub fn predicates(&self) -> &[RecipePredicate] {
        &self.predicates
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push(qb);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Popular,
    Oldest,
    TimeAsc,
    TimeDesc,
    Random,
}

impl SortKey {
    /// Unknown sort names fall back to `Newest`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("popular") => SortKey::Popular,
            Some("oldest") => SortKey::Oldest,
            Some("time_asc") => SortKey::TimeAsc,
            Some("time_desc") => SortKey::TimeDesc,
            Some("random") => SortKey::Random,
            _ => SortKey::Newest,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            SortKey::Newest => "r.created_at DESC, r.id DESC",
            SortKey::Popular => "avg_rating DESC, ratings_count DESC, r.id DESC",
            SortKey::Oldest => "r.created_at ASC, r.id ASC",
            SortKey::TimeAsc => "r.cook_time ASC, r.id ASC",
            SortKey::TimeDesc => "r.cook_time DESC, r.id ASC",
            SortKey::Random => "RANDOM()",
        }
    }
}

/// A filtered, sorted, paginated recipe listing.
#[derive(Debug, Clone)]
pub struct RecipeListQuery {
    pub filter: RecipeFilter,
    pub sort: SortKey,
    pub pagination: Pagination,
}

impl RecipeListQuery {
    pub fn count_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM recipes r LEFT JOIN categories c ON c.id = r.category_id",
        );
        self.filter.push_where(&mut qb);
        qb
    }

    pub fn page_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(SUMMARY_COLUMNS);
        qb.push(" FROM recipes r");
        qb.push(SUMMARY_JOINS);
        self.filter.push_where(&mut qb);
        qb.push(" ORDER BY ");
        qb.push(self.sort.order_by());
        qb.push(" LIMIT ");
        qb.push_bind(self.pagination.limit);
        qb.push(" OFFSET ");
        qb.push_bind(self.pagination.offset());
        qb
    }
}
