use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::Game;

/// Errors raised while loading or querying the catalog
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Duplicate game id {0} in catalog")]
    DuplicateId(u32),

    #[error("Unknown game id {0}")]
    UnknownGame(u32),
}

/// Immutable game catalog snapshot.
///
/// Index position corresponds 1:1 to each position in every score vector.
/// The id → position map is built once at load and queried read-only
/// thereafter; a refresh swaps in a whole new snapshot rather than mutating
/// this one, so in-flight requests always see a consistent view.
#[derive(Debug, Clone)]
pub struct Catalog {
    games: Vec<Game>,
    positions: HashMap<u32, usize>,
    loaded_at: DateTime<Utc>,
}

/// Raw CSV row; tag columns hold semicolon-separated values
#[derive(Debug, Deserialize)]
struct CsvGame {
    bgg_id: u32,
    name: String,
    avg_rating: f64,
    categories: String,
    mechanics: String,
    game_types: String,
    weight: f64,
    year_published: i32,
    players_min: u32,
    players_max: u32,
    time_min: u32,
    time_max: u32,
    #[serde(default)]
    description: String,
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl From<CsvGame> for Game {
    fn from(row: CsvGame) -> Self {
        Game {
            bgg_id: row.bgg_id,
            name: row.name,
            avg_rating: row.avg_rating,
            categories: split_tags(&row.categories),
            mechanics: split_tags(&row.mechanics),
            game_types: split_tags(&row.game_types),
            weight: row.weight,
            year_published: row.year_published,
            players_min: row.players_min,
            players_max: row.players_max,
            time_min: row.time_min,
            time_max: row.time_max,
            description: row.description,
        }
    }
}

impl Catalog {
    /// Builds a catalog from in-memory games, rejecting duplicate ids
    pub fn from_games(games: Vec<Game>) -> Result<Self, CatalogError> {
        let mut positions = HashMap::with_capacity(games.len());
        for (position, game) in games.iter().enumerate() {
            if positions.insert(game.bgg_id, position).is_some() {
                return Err(CatalogError::DuplicateId(game.bgg_id));
            }
        }
        Ok(Self {
            games,
            positions,
            loaded_at: Utc::now(),
        })
    }

    /// Loads a catalog from a CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Loads a catalog from any CSV source
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut games = Vec::new();
        for row in csv_reader.deserialize::<CsvGame>() {
            games.push(Game::from(row?));
        }
        Self::from_games(games)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Position of a game in the catalog, if present
    pub fn position(&self, bgg_id: u32) -> Option<usize> {
        self.positions.get(&bgg_id).copied()
    }

    /// Position of a game, failing loudly for ids the catalog does not hold
    pub fn require_position(&self, bgg_id: u32) -> Result<usize, CatalogError> {
        self.position(bgg_id)
            .ok_or(CatalogError::UnknownGame(bgg_id))
    }

    pub fn game_by_id(&self, bgg_id: u32) -> Option<&Game> {
        self.position(bgg_id).map(|pos| &self.games[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(bgg_id: u32, name: &str) -> Game {
        Game {
            bgg_id,
            name: name.to_string(),
            avg_rating: 7.0,
            categories: vec![],
            mechanics: vec![],
            game_types: vec![],
            weight: 2.5,
            year_published: 2015,
            players_min: 2,
            players_max: 4,
            time_min: 30,
            time_max: 60,
            description: String::new(),
        }
    }

    #[test]
    fn test_positions_match_order() {
        let catalog =
            Catalog::from_games(vec![game(10, "Azul"), game(20, "Wingspan")]).unwrap();
        assert_eq!(catalog.position(10), Some(0));
        assert_eq!(catalog.position(20), Some(1));
        assert_eq!(catalog.position(30), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = Catalog::from_games(vec![game(10, "Azul"), game(10, "Copy")]);
        assert!(matches!(result, Err(CatalogError::DuplicateId(10))));
    }

    #[test]
    fn test_require_position_unknown_id() {
        let catalog = Catalog::from_games(vec![game(10, "Azul")]).unwrap();
        let result = catalog.require_position(99);
        assert!(matches!(result, Err(CatalogError::UnknownGame(99))));
    }

    #[test]
    fn test_csv_parsing_splits_tags() {
        let csv_data = "\
bgg_id,name,avg_rating,categories,mechanics,game_types,weight,year_published,players_min,players_max,time_min,time_max,description
174430,Gloomhaven,8.6,Adventure;Fantasy,Hand Management;Grid Movement,Thematic,3.9,2017,1,4,60,120,Tactical combat
68448,7 Wonders,7.7,Card Game; Civilization,Drafting,Strategy;Family,2.3,2010,2,7,30,30,";
        let catalog = Catalog::from_csv_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);

        let gloomhaven = catalog.game_by_id(174430).unwrap();
        assert_eq!(gloomhaven.categories, vec!["Adventure", "Fantasy"]);
        assert_eq!(gloomhaven.description, "Tactical combat");

        // Whitespace around separators is trimmed
        let wonders = catalog.game_by_id(68448).unwrap();
        assert_eq!(wonders.categories, vec!["Card Game", "Civilization"]);
        assert_eq!(wonders.game_types, vec!["Strategy", "Family"]);
    }

    #[test]
    fn test_csv_duplicate_id_rejected() {
        let csv_data = "\
bgg_id,name,avg_rating,categories,mechanics,game_types,weight,year_published,players_min,players_max,time_min,time_max,description
1,A,7.0,,,,2.0,2010,2,4,30,60,
1,B,7.0,,,,2.0,2010,2,4,30,60,";
        let result = Catalog::from_csv_reader(csv_data.as_bytes());
        assert!(matches!(result, Err(CatalogError::DuplicateId(1))));
    }
}
