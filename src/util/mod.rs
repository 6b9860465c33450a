mod normalize;
mod query;

pub use normalize::{normalize_ingredient_name, split_ingredients};
pub use query::QueryParams;
