use serde::{Deserialize, Serialize};

mod preferences;

pub use preferences::{AttributeFilters, RangeFilter, UserPreferences};

/// A board game catalog entry, co-indexed with every score vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    /// BoardGameGeek identifier, unique within a catalog
    pub bgg_id: u32,
    pub name: String,
    pub avg_rating: f64,
    pub categories: Vec<String>,
    pub mechanics: Vec<String>,
    pub game_types: Vec<String>,
    /// Complexity weight on BGG's 1-5 scale
    pub weight: f64,
    pub year_published: i32,
    pub players_min: u32,
    pub players_max: u32,
    /// Play time bounds in minutes
    pub time_min: u32,
    pub time_max: u32,
    #[serde(default)]
    pub description: String,
}

impl Game {
    /// Textual feature blob used by the content-based and LLM scorers
    pub fn feature_text(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.categories.iter().cloned());
        parts.extend(self.mechanics.iter().cloned());
        parts.extend(self.game_types.iter().cloned());
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        parts.join(" ")
    }
}

/// Blend weights for the three scoring signals.
///
/// `alpha` balances CF against CBF, `beta` balances the CF+CBF combination
/// against the LLM signal. Both live in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.33,
        }
    }
}

impl BlendWeights {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }
}

/// A single ranked recommendation returned to the client.
///
/// Carries the catalog fields plus the final score and the weighted
/// per-signal contributions for transparency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub bgg_id: u32,
    pub name: String,
    pub avg_rating: f64,
    pub categories: Vec<String>,
    pub mechanics: Vec<String>,
    pub game_types: Vec<String>,
    pub weight: f64,
    pub year_published: i32,
    pub players_min: u32,
    pub players_max: u32,
    /// Final hybrid score, rounded to 4 decimals
    pub score: f64,
    pub cf_score: f64,
    pub cbf_score: f64,
    pub llm_score: f64,
}
