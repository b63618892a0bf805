/// Scoring signal provider abstraction
///
/// This module provides a pluggable architecture for the three scoring
/// signals (collaborative filtering, content-based filtering, free-text
/// LLM). Each provider turns one flavor of user input into a score vector
/// co-indexed with the catalog.
use crate::{catalog::Catalog, error::AppResult, models::UserPreferences};

pub mod cbf;
pub mod cf;
pub mod llm;

pub use cbf::CbfScorer;
pub use cf::CfScorer;
pub use llm::LlmScorer;

/// Inputs a provider may draw on when scoring one request
#[derive(Debug, Clone, Copy)]
pub struct SignalRequest<'a> {
    pub preferences: &'a UserPreferences,
    /// Free-text description of what the user enjoys
    pub description: &'a str,
}

/// Trait for scoring signal providers
///
/// A provider returns one bounded score per catalog entry, in catalog
/// order. When a signal cannot be computed from the given input (no liked
/// games, empty free text), the provider returns an honest all-zero vector,
/// never small nonzero noise; the weight resolver treats that vector as a
/// degenerate signal.
#[async_trait::async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Provider name for logging and degradation warnings
    fn name(&self) -> &'static str;

    /// Scores every catalog entry for this request
    async fn score(&self, catalog: &Catalog, request: &SignalRequest<'_>) -> AppResult<Vec<f64>>;
}

/// Runs a provider and absorbs failures at the boundary.
///
/// A provider error or a wrong-length vector is replaced with an all-zero
/// vector, so one broken upstream degrades the blend instead of failing the
/// request.
pub async fn score_or_zero(
    provider: &dyn ScoreProvider,
    catalog: &Catalog,
    request: &SignalRequest<'_>,
) -> Vec<f64> {
    match provider.score(catalog, request).await {
        Ok(scores) if scores.len() == catalog.len() => scores,
        Ok(scores) => {
            tracing::warn!(
                provider = provider.name(),
                expected = catalog.len(),
                actual = scores.len(),
                "Provider returned malformed score vector, substituting zeros"
            );
            vec![0.0; catalog.len()]
        }
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                "Provider failed, substituting zeros"
            );
            vec![0.0; catalog.len()]
        }
    }
}
