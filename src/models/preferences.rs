use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` bound for a numeric attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> RangeFilter<T> {
    /// True when `value` lies inside the bound
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// True when the candidate's own `[min, max]` range overlaps this one.
    /// Overlap, not containment: a 2-4 player game satisfies a 4-6 request.
    pub fn overlaps(&self, candidate_min: T, candidate_max: T) -> bool {
        candidate_max >= self.min && candidate_min <= self.max
    }
}

/// Hard attribute constraints. Every field is optional; an absent or empty
/// field performs no filtering on that axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilters {
    /// Candidate must share at least one mechanic with this set
    #[serde(default)]
    pub mechanics: Vec<String>,
    /// Candidate must share at least one category with this set
    #[serde(default)]
    pub categories: Vec<String>,
    /// Candidate must share at least one type with this set
    #[serde(default)]
    pub game_types: Vec<String>,
    /// Complexity weight, inclusive containment
    #[serde(default)]
    pub weight: Option<RangeFilter<f64>>,
    /// Player count, interval overlap against the game's own range
    #[serde(default)]
    pub players: Option<RangeFilter<u32>>,
    /// Play time in minutes, interval overlap
    #[serde(default)]
    pub play_time: Option<RangeFilter<u32>>,
    /// Publication year, inclusive containment
    #[serde(default)]
    pub year_published: Option<RangeFilter<i32>>,
    /// Minimum average rating
    #[serde(default)]
    pub min_rating: Option<f64>,
}

impl AttributeFilters {
    /// True when no axis is active
    pub fn is_empty(&self) -> bool {
        self.mechanics.is_empty()
            && self.categories.is_empty()
            && self.game_types.is_empty()
            && self.weight.is_none()
            && self.players.is_none()
            && self.play_time.is_none()
            && self.year_published.is_none()
            && self.min_rating.is_none()
    }
}

/// User preference bundle for one recommendation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Games the user likes. Used as CF fold-in input, and excluded from
    /// re-recommendation, never boosted.
    #[serde(default)]
    pub liked_games: HashSet<u32>,
    #[serde(default)]
    pub disliked_games: HashSet<u32>,
    /// Already-seen games the user wants hidden
    #[serde(default)]
    pub exclude_games: HashSet<u32>,
    #[serde(default)]
    pub filters: AttributeFilters,
}

impl UserPreferences {
    /// Union of liked, disliked, and already-seen ids, all of which are
    /// barred from the result set
    pub fn excluded_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.liked_games
            .iter()
            .chain(self.disliked_games.iter())
            .chain(self.exclude_games.iter())
            .copied()
    }
}
