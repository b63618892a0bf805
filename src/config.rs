use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to the game catalog CSV
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Path to the precomputed item embedding matrix (JSON array of rows).
    /// When absent, the CF signal degrades to all-zero.
    #[serde(default)]
    pub embeddings_path: Option<String>,

    /// API key for the text-completion endpoint.
    /// When absent, the LLM signal degrades to all-zero.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Chat model used for free-text scoring
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum final score a game needs to appear in results
    #[serde(default = "default_score_epsilon")]
    pub score_epsilon: f64,
}

fn default_catalog_path() -> String {
    "data/games.csv".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_score_epsilon() -> f64 {
    0.01
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            embeddings_path: None,
            openai_api_key: None,
            openai_api_url: default_openai_api_url(),
            openai_model: default_openai_model(),
            host: default_host(),
            port: default_port(),
            score_epsilon: default_score_epsilon(),
        }
    }
}
