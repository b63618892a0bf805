use std::collections::HashMap;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    catalog::Catalog,
    config::Config,
    error::{AppError, AppResult},
    services::providers::{ScoreProvider, SignalRequest},
};

/// How many top-rated candidates are offered to the model. Keeps the prompt
/// small; everything outside the shortlist scores zero.
const SHORTLIST_SIZE: usize = 20;

/// Free-text scorer backed by an OpenAI-compatible chat completion API.
///
/// The model sees a shortlist of candidate games and the user's own words,
/// and replies with a strict JSON object of per-game scores in [0, 1].
/// Without an API key or a description the signal is an honest all-zero
/// vector; upstream failures surface as errors and are zeroed at the
/// provider boundary.
pub struct LlmScorer {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl LlmScorer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key: config.openai_api_key.clone(),
            api_url: config.openai_api_url.clone(),
            model: config.openai_model.clone(),
        }
    }

    /// Catalog positions of the highest-rated games, used as the candidate
    /// shortlist sent to the model
    fn shortlist(catalog: &Catalog, size: usize) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..catalog.len()).collect();
        positions.sort_by(|&a, &b| {
            catalog.games()[b]
                .avg_rating
                .partial_cmp(&catalog.games()[a].avg_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        positions.truncate(size);
        positions
    }

    fn build_prompt(catalog: &Catalog, shortlist: &[usize], description: &str) -> String {
        let candidates: Vec<String> = shortlist
            .iter()
            .map(|&position| {
                let game = &catalog.games()[position];
                format!("- id {}: {} ({})", game.bgg_id, game.name, game.feature_text())
            })
            .collect();

        format!(
            "The user describes the board games they enjoy as:\n\"{}\"\n\n\
             Rate how well each candidate matches that description.\n\
             Candidates:\n{}\n\n\
             Reply with only a JSON object mapping each candidate id to a \
             score between 0.0 and 1.0, e.g. {{\"174430\": 0.9}}. No prose.",
            description,
            candidates.join("\n")
        )
    }

    /// Parses the model's reply into id → score, tolerating markdown code
    /// fences around the JSON
    fn parse_scores(content: &str) -> Option<HashMap<u32, f64>> {
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let raw: HashMap<String, f64> = serde_json::from_str(trimmed).ok()?;
        let mut scores = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let bgg_id: u32 = key.trim().parse().ok()?;
            scores.insert(bgg_id, value.clamp(0.0, 1.0));
        }
        Some(scores)
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": "You are an expert board game advisor. You reply with strict JSON only."
                    },
                    { "role": "user", "content": prompt }
                ],
                "temperature": 0.0
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Completion API returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalApi("Completion reply had no choices".to_string()))
    }
}

#[async_trait::async_trait]
impl ScoreProvider for LlmScorer {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn score(&self, catalog: &Catalog, request: &SignalRequest<'_>) -> AppResult<Vec<f64>> {
        let description = request.description.trim();

        // No key or no text means no signal, not a failure
        let Some(api_key) = &self.api_key else {
            return Ok(vec![0.0; catalog.len()]);
        };
        if description.is_empty() {
            return Ok(vec![0.0; catalog.len()]);
        }

        let shortlist = Self::shortlist(catalog, SHORTLIST_SIZE);
        let prompt = Self::build_prompt(catalog, &shortlist, description);
        let content = self.complete(api_key, &prompt).await?;

        let parsed = Self::parse_scores(&content).ok_or_else(|| {
            AppError::ExternalApi("Completion reply was not a JSON score object".to_string())
        })?;

        let mut scores = vec![0.0; catalog.len()];
        for (bgg_id, score) in parsed {
            // Ids the model hallucinated are dropped rather than trusted
            if let Some(position) = catalog.position(bgg_id) {
                scores[position] = score;
            }
        }

        tracing::info!(
            shortlist = shortlist.len(),
            scored = scores.iter().filter(|&&s| s > 0.0).count(),
            provider = "llm",
            "Free-text scoring completed"
        );

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, UserPreferences};

    fn game(bgg_id: u32, rating: f64) -> Game {
        Game {
            bgg_id,
            name: format!("Game {}", bgg_id),
            avg_rating: rating,
            categories: vec![],
            mechanics: vec![],
            game_types: vec![],
            weight: 2.0,
            year_published: 2015,
            players_min: 2,
            players_max: 4,
            time_min: 30,
            time_max: 60,
            description: String::new(),
        }
    }

    #[test]
    fn test_shortlist_picks_top_rated() {
        let catalog =
            Catalog::from_games(vec![game(1, 6.5), game(2, 8.9), game(3, 7.4)]).unwrap();
        let shortlist = LlmScorer::shortlist(&catalog, 2);
        assert_eq!(shortlist, vec![1, 2]);
    }

    #[test]
    fn test_parse_scores_plain_json() {
        let scores = LlmScorer::parse_scores(r#"{"174430": 0.9, "68448": 0.4}"#).unwrap();
        assert_eq!(scores[&174430], 0.9);
        assert_eq!(scores[&68448], 0.4);
    }

    #[test]
    fn test_parse_scores_strips_code_fences() {
        let content = "```json\n{\"174430\": 0.75}\n```";
        let scores = LlmScorer::parse_scores(content).unwrap();
        assert_eq!(scores[&174430], 0.75);
    }

    #[test]
    fn test_parse_scores_clamps_out_of_range() {
        let scores = LlmScorer::parse_scores(r#"{"1": 1.7, "2": -0.2}"#).unwrap();
        assert_eq!(scores[&1], 1.0);
        assert_eq!(scores[&2], 0.0);
    }

    #[test]
    fn test_parse_scores_rejects_prose() {
        assert!(LlmScorer::parse_scores("Here are my picks: Gloomhaven!").is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_emits_zero_signal() {
        let catalog = Catalog::from_games(vec![game(1, 7.0)]).unwrap();
        let scorer = LlmScorer::from_config(&Config::default());
        let preferences = UserPreferences::default();
        let request = SignalRequest {
            preferences: &preferences,
            description: "heavy euro games with engine building",
        };
        let scores = scorer.score(&catalog, &request).await.unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[tokio::test]
    async fn test_empty_description_emits_zero_signal() {
        let catalog = Catalog::from_games(vec![game(1, 7.0)]).unwrap();
        let config = Config {
            openai_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let scorer = LlmScorer::from_config(&config);
        let preferences = UserPreferences::default();
        let request = SignalRequest {
            preferences: &preferences,
            description: "   ",
        };
        let scores = scorer.score(&catalog, &request).await.unwrap();
        assert_eq!(scores, vec![0.0]);
    }
}
