use std::collections::HashSet;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::Catalog;
use crate::error::{AppError, AppResult};
use crate::models::{AttributeFilters, BlendWeights, Game, Recommendation, UserPreferences};
use crate::services::ensemble::produce_recommendations;
use crate::services::providers::{score_or_zero, SignalRequest};

use super::AppState;

const DEFAULT_TOP_N: usize = 5;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub liked_games: Vec<u32>,
    #[serde(default)]
    pub disliked_games: Vec<u32>,
    #[serde(default)]
    pub exclude_games: Vec<u32>,
    /// Free-text description of the user's taste, feeds the LLM and CBF
    /// signals
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filters: AttributeFilters,
    /// CF vs CBF balance, defaults to 0.5
    pub alpha: Option<f64>,
    /// CF+CBF vs LLM balance, defaults to 0.33
    pub beta: Option<f64>,
    /// Number of recommendations, defaults to 5
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub bgg_id: u32,
    pub name: String,
    pub avg_rating: f64,
    pub year_published: i32,
}

impl From<&Game> for GameSummary {
    fn from(game: &Game) -> Self {
        Self {
            bgg_id: game.bgg_id,
            name: game.name.clone(),
            avg_rating: game.avg_rating,
            year_published: game.year_published,
        }
    }
}

fn validate_weight(name: &str, value: f64) -> AppResult<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::InvalidInput(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(value)
}

fn validate_ids(catalog: &Catalog, ids: &[u32]) -> AppResult<HashSet<u32>> {
    for &bgg_id in ids {
        if catalog.position(bgg_id).is_none() {
            return Err(AppError::InvalidInput(format!(
                "Unknown game id {}",
                bgg_id
            )));
        }
    }
    Ok(ids.iter().copied().collect())
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Catalog summary listing
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    let snapshot = state.snapshot().await;
    let games: Vec<GameSummary> = snapshot.catalog.games().iter().map(GameSummary::from).collect();
    Json(games)
}

/// Full record for a single game
pub async fn get_game(
    State(state): State<AppState>,
    Path(bgg_id): Path<u32>,
) -> AppResult<Json<Game>> {
    let snapshot = state.snapshot().await;
    snapshot
        .catalog
        .game_by_id(bgg_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No game with id {}", bgg_id)))
}

/// Runs the three scoring signals and the fusion pipeline for one request
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendResponse>> {
    let start = Instant::now();
    let snapshot = state.snapshot().await;
    let catalog = &snapshot.catalog;

    let weights = BlendWeights {
        alpha: validate_weight("alpha", request.alpha.unwrap_or(BlendWeights::default().alpha))?,
        beta: validate_weight("beta", request.beta.unwrap_or(BlendWeights::default().beta))?,
    };
    let top_n = request.n.unwrap_or(DEFAULT_TOP_N);

    let preferences = UserPreferences {
        liked_games: validate_ids(catalog, &request.liked_games)?,
        disliked_games: validate_ids(catalog, &request.disliked_games)?,
        exclude_games: validate_ids(catalog, &request.exclude_games)?,
        filters: request.filters,
    };

    tracing::info!(
        liked = preferences.liked_games.len(),
        disliked = preferences.disliked_games.len(),
        excluded = preferences.exclude_games.len(),
        has_description = !request.description.trim().is_empty(),
        top_n,
        "Starting recommendation request"
    );

    let signal = SignalRequest {
        preferences: &preferences,
        description: &request.description,
    };

    // Each provider degrades to an all-zero vector on failure; the weight
    // resolver then leans on whatever signals remain
    let cf_scores = score_or_zero(state.cf.as_ref(), catalog, &signal).await;
    let cbf_scores = score_or_zero(snapshot.cbf.as_ref(), catalog, &signal).await;
    let llm_scores = score_or_zero(state.llm.as_ref(), catalog, &signal).await;

    let recommendations = produce_recommendations(
        catalog,
        &cf_scores,
        &cbf_scores,
        &llm_scores,
        &preferences,
        weights,
        top_n,
        state.config.score_epsilon,
    )?;

    tracing::info!(
        results = recommendations.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Recommendation request completed"
    );

    Ok(Json(RecommendResponse { recommendations }))
}

/// Reloads the catalog CSV and swaps the snapshot atomically
pub async fn reload_catalog(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let catalog = Catalog::load_csv(&state.config.catalog_path)?;
    let games = catalog.len();
    state.replace_catalog(catalog).await;

    tracing::info!(games, "Catalog reloaded");
    Ok(Json(json!({ "games": games })))
}
