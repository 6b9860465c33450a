//! "More like this" recommendations.
//!
//! Each candidate recipe is scored against a target recipe from two
//! signals:
//!
//! * content similarity: shared cuisine, difficulty, a similar cook time
//!   and every ingredient name the two recipes have in common;
//! * a collaborative boost: for every user who rated both the target and
//!   the candidate 4 or higher, the candidate gains `collaborative_weight`.
//!
//! When the caller is signed in, their own rating history then adjusts the
//! result. Candidates they rated 2 or lower are removed outright.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::RecommendConfig;

pub const CUISINE_MATCH: i64 = 2;
pub const DIFFICULTY_MATCH: i64 = 1;
pub const COOK_TIME_MATCH: i64 = 1;
pub const COOK_TIME_WINDOW_MINUTES: i64 = 10;
pub const SHARED_INGREDIENT: i64 = 1;

/// Ratings at or above this count as "liked".
pub const LIKED_RATING: i64 = 4;
/// Ratings at or below this count as "disliked".
pub const DISLIKED_RATING: i64 = 2;

const LIKED_CANDIDATE_BOOST: i64 = 2;
const NEUTRAL_CANDIDATE_PENALTY: i64 = 1;
const DISLIKED_TARGET_PENALTY: i64 = 2;

#[derive(Debug, Clone, Default)]
pub struct RecipeProfile {
    pub id: i64,
    pub title: String,
    pub cook_time: i64,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub image_url: Option<String>,
    pub ingredients: HashSet<String>,
}

/// Everything the scorer needs, loaded up front by the repository.
#[derive(Debug, Clone, Default)]
pub struct ScoringInputs {
    pub target: RecipeProfile,
    /// Every recipe except the target.
    pub candidates: Vec<RecipeProfile>,
    /// Candidate id to number of users who liked both it and the target.
    pub co_likes: HashMap<i64, i64>,
    /// Recipe id to the acting user's rating. Empty for anonymous callers.
    pub user_ratings: HashMap<i64, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub title: String,
    pub cook_time: i64,
    pub difficulty: Option<String>,
    pub image_url: Option<String>,
    pub score: i64,
}

fn same_attr(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if !a.is_empty() && a == b)
}

/// Attribute and ingredient overlap between `target` and `candidate`.
pub fn content_score(target: &RecipeProfile, candidate: &RecipeProfile) -> i64 {
    let mut score = 0;
    if same_attr(&target.cuisine, &candidate.cuisine) {
        score += CUISINE_MATCH;
    }
    if same_attr(&target.difficulty, &candidate.difficulty) {
        score += DIFFICULTY_MATCH;
    }
    if (target.cook_time - candidate.cook_time).abs() <= COOK_TIME_WINDOW_MINUTES {
        score += COOK_TIME_MATCH;
    }
    let shared = candidate
        .ingredients
        .iter()
        .filter(|name| target.ingredients.contains(*name))
        .count() as i64;
    score + shared * SHARED_INGREDIENT
}

/// Adjustment for the acting user's own rating of a candidate, or `None`
/// when the candidate must be dropped.
fn personal_adjustment(rating: Option<i64>) -> Option<i64> {
    match rating {
        None => Some(0),
        Some(r) if r <= DISLIKED_RATING => None,
        Some(r) if r >= LIKED_RATING => Some(LIKED_CANDIDATE_BOOST),
        Some(_) => Some(-NEUTRAL_CANDIDATE_PENALTY),
    }
}

pub struct Scorer {
    config: RecommendConfig,
}

impl Scorer {
    pub fn new(config: RecommendConfig) -> Self {
        Self { config }
    }

    /// Score all candidates and return the best `limit`, highest first.
    /// Equal scores keep candidate order.
    pub fn recommend(&self, inputs: &ScoringInputs) -> Vec<Recommendation> {
        let target_disliked = inputs
            .user_ratings
            .get(&inputs.target.id)
            .is_some_and(|r| *r <= DISLIKED_RATING);

        let mut scored: Vec<Recommendation> = inputs
            .candidates
            .iter()
            .filter(|c| c.id != inputs.target.id)
            .filter_map(|candidate| {
                let adjustment = personal_adjustment(inputs.user_ratings.get(&candidate.id).copied())?;

                let collaborative = inputs.co_likes.get(&candidate.id).copied().unwrap_or(0)
                    * self.config.collaborative_weight;

                let mut score = content_score(&inputs.target, candidate) + collaborative + adjustment;
                if target_disliked {
                    score -= DISLIKED_TARGET_PENALTY;
                }

                (score >= self.config.min_score).then(|| Recommendation {
                    id: candidate.id,
                    title: candidate.title.clone(),
                    cook_time: candidate.cook_time,
                    difficulty: candidate.difficulty.clone(),
                    image_url: candidate.image_url.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by_key(|r| Reverse(r.score));
        scored.truncate(self.config.limit);
        scored
    }
}
