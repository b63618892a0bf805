use crate::catalog::Catalog;
use crate::models::{AttributeFilters, Game, UserPreferences};
use crate::services::ensemble::EnsembleError;

/// A single named hard constraint over a game.
///
/// Constraints binary-gate: a failing predicate zeroes the candidate's score
/// outright, it never partially discounts. Predicates compose with logical
/// AND; adding a new filter axis means adding one more entry to
/// `build_predicates`.
pub struct FilterPredicate<'a> {
    pub name: &'static str,
    check: Box<dyn Fn(&Game) -> bool + Send + Sync + 'a>,
}

impl<'a> FilterPredicate<'a> {
    fn new(name: &'static str, check: impl Fn(&Game) -> bool + Send + Sync + 'a) -> Self {
        Self {
            name,
            check: Box::new(check),
        }
    }

    pub fn passes(&self, game: &Game) -> bool {
        (self.check)(game)
    }
}

/// True when the game carries at least one of the requested tags.
/// Comparison trims surrounding whitespace, matching how the tags are
/// entered free-form on the request side.
fn tags_intersect(tags: &[String], requested: &[String]) -> bool {
    tags.iter()
        .any(|tag| requested.iter().any(|r| r.trim() == tag.trim()))
}

/// Builds the list of active predicates for a filter set. Absent or empty
/// axes contribute nothing.
pub fn build_predicates(filters: &AttributeFilters) -> Vec<FilterPredicate<'_>> {
    let mut predicates = Vec::new();

    if !filters.mechanics.is_empty() {
        predicates.push(FilterPredicate::new("mechanics", move |game: &Game| {
            tags_intersect(&game.mechanics, &filters.mechanics)
        }));
    }
    if !filters.categories.is_empty() {
        predicates.push(FilterPredicate::new("categories", move |game: &Game| {
            tags_intersect(&game.categories, &filters.categories)
        }));
    }
    if !filters.game_types.is_empty() {
        predicates.push(FilterPredicate::new("game_types", move |game: &Game| {
            tags_intersect(&game.game_types, &filters.game_types)
        }));
    }
    if let Some(range) = filters.weight {
        predicates.push(FilterPredicate::new("weight", move |game: &Game| {
            range.contains(game.weight)
        }));
    }
    if let Some(range) = filters.players {
        // Interval overlap, not containment: the game's own player range
        // only needs to intersect the requested one
        predicates.push(FilterPredicate::new("players", move |game: &Game| {
            range.overlaps(game.players_min, game.players_max)
        }));
    }
    if let Some(range) = filters.play_time {
        predicates.push(FilterPredicate::new("play_time", move |game: &Game| {
            range.overlaps(game.time_min, game.time_max)
        }));
    }
    if let Some(range) = filters.year_published {
        predicates.push(FilterPredicate::new("year_published", move |game: &Game| {
            range.contains(game.year_published)
        }));
    }
    if let Some(min_rating) = filters.min_rating {
        predicates.push(FilterPredicate::new("min_rating", move |game: &Game| {
            game.avg_rating >= min_rating
        }));
    }

    predicates
}

/// Zeroes the score of every candidate disqualified by the preference
/// bundle: games in the liked/disliked/exclude sets, and games failing any
/// active attribute predicate.
///
/// Exclusion ids that the catalog does not hold are a hard error rather
/// than a silent no-op.
pub fn apply_constraints(
    scores: &mut [f64],
    catalog: &Catalog,
    preferences: &UserPreferences,
) -> Result<(), EnsembleError> {
    for bgg_id in preferences.excluded_ids() {
        let position = catalog
            .position(bgg_id)
            .ok_or(EnsembleError::UnknownGameId(bgg_id))?;
        scores[position] = 0.0;
    }

    let predicates = build_predicates(&preferences.filters);
    if predicates.is_empty() {
        return Ok(());
    }

    for (position, game) in catalog.games().iter().enumerate() {
        if !predicates.iter().all(|p| p.passes(game)) {
            scores[position] = 0.0;
        }
    }

    Ok(())
}
