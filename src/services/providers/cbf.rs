use std::collections::HashMap;

use crate::{
    catalog::Catalog,
    error::AppResult,
    services::providers::{ScoreProvider, SignalRequest},
};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "of", "with", "for", "in", "on", "to", "is", "are",
    "it", "this", "that", "as", "at", "by", "be", "from",
];

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 1 && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn l2_normalize(vector: &mut HashMap<String, f64>) {
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
}

/// Content-based scorer: TF-IDF similarity between the user's stated
/// preferences and each game's feature text.
///
/// The index is built once per catalog snapshot and queried read-only;
/// a catalog refresh rebuilds the whole index alongside the new snapshot.
pub struct CbfScorer {
    idf: HashMap<String, f64>,
    /// One l2-normalized tf-idf vector per game, in catalog order
    doc_vectors: Vec<HashMap<String, f64>>,
}

impl CbfScorer {
    /// Builds the TF-IDF index over the catalog's feature text
    pub fn build(catalog: &Catalog) -> Self {
        let docs: Vec<Vec<String>> = catalog
            .games()
            .iter()
            .map(|game| tokenize(&game.feature_text()))
            .collect();

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for tokens in &docs {
            let mut seen: Vec<&String> = tokens.iter().collect();
            seen.sort();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        // Smoothed idf, so terms present in every document still carry a
        // small positive weight
        let n_docs = docs.len() as f64;
        let idf: HashMap<String, f64> = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .collect();

        let doc_vectors = docs
            .iter()
            .map(|tokens| {
                let mut vector: HashMap<String, f64> = HashMap::new();
                for token in tokens {
                    *vector.entry(token.clone()).or_insert(0.0) += idf[token];
                }
                l2_normalize(&mut vector);
                vector
            })
            .collect();

        Self { idf, doc_vectors }
    }

    /// Turns free text into an l2-normalized query vector; terms the index
    /// has never seen are dropped
    fn vectorize(&self, text: &str) -> HashMap<String, f64> {
        let mut vector: HashMap<String, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&idf) = self.idf.get(&token) {
                *vector.entry(token).or_insert(0.0) += idf;
            }
        }
        l2_normalize(&mut vector);
        vector
    }

    fn cosine(query: &HashMap<String, f64>, doc: &HashMap<String, f64>) -> f64 {
        query
            .iter()
            .filter_map(|(term, weight)| doc.get(term).map(|doc_weight| weight * doc_weight))
            .sum()
    }
}

#[async_trait::async_trait]
impl ScoreProvider for CbfScorer {
    fn name(&self) -> &'static str {
        "cbf"
    }

    async fn score(&self, catalog: &Catalog, request: &SignalRequest<'_>) -> AppResult<Vec<f64>> {
        // The query draws on the free text plus any requested tags, the
        // same inputs a user would express taste through
        let filters = &request.preferences.filters;
        let mut query_parts = vec![request.description.to_string()];
        query_parts.extend(filters.categories.iter().cloned());
        query_parts.extend(filters.mechanics.iter().cloned());
        query_parts.extend(filters.game_types.iter().cloned());
        let query_text = query_parts.join(" ");

        let query = self.vectorize(&query_text);
        if query.is_empty() {
            return Ok(vec![0.0; catalog.len()]);
        }

        // Both vectors are l2-normalized and nonnegative, so cosine scores
        // are already bounded in [0, 1]
        Ok(self
            .doc_vectors
            .iter()
            .map(|doc| Self::cosine(&query, doc))
            .collect())
    }
}
