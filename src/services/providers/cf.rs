use std::path::Path;

use ndarray::{Array1, Array2};

use crate::{
    catalog::Catalog,
    error::{AppError, AppResult},
    services::ensemble::min_max_normalize,
    services::providers::{ScoreProvider, SignalRequest},
};

/// Implicit-feedback confidence for a liked item
const CONFIDENCE_ALPHA: f32 = 5.0;
/// Ridge regularization for the fold-in solve
const RIDGE_LAMBDA: f32 = 0.3;

/// Collaborative-filtering scorer over a precomputed item embedding matrix.
///
/// The user never exists in the trained model; instead their latent vector
/// is folded in from the liked items against the item embeddings, and
/// scores are the dot products of that vector with every item row.
pub struct CfScorer {
    /// Item embeddings, rows co-indexed with the catalog. `None` when no
    /// matrix was configured; the signal then always degenerates to zeros.
    embeddings: Option<Array2<f32>>,
}

impl CfScorer {
    /// A scorer with no embedding matrix; always emits the zero signal
    pub fn disabled() -> Self {
        Self { embeddings: None }
    }

    /// Loads an embedding matrix from a JSON array of equal-length rows
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Internal(format!("Failed to read embeddings: {}", e)))?;
        let rows: Vec<Vec<f32>> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("Malformed embeddings file: {}", e)))?;
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> AppResult<Self> {
        let n_items = rows.len();
        let n_factors = rows.first().map(Vec::len).unwrap_or(0);
        if n_items == 0 || n_factors == 0 {
            return Err(AppError::Internal("Empty embedding matrix".to_string()));
        }
        if rows.iter().any(|row| row.len() != n_factors) {
            return Err(AppError::Internal(
                "Embedding rows have inconsistent lengths".to_string(),
            ));
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let embeddings = Array2::from_shape_vec((n_items, n_factors), flat)
            .map_err(|e| AppError::Internal(format!("Invalid embedding shape: {}", e)))?;
        Ok(Self {
            embeddings: Some(embeddings),
        })
    }

    /// Folds a new implicit-feedback user into the latent space: solves
    /// `(c VᵢᵀVᵢ + λI) u = c Vᵢᵀ 1` for the liked item rows `Vᵢ`.
    fn fold_in(embeddings: &Array2<f32>, liked_positions: &[usize]) -> Option<Array1<f32>> {
        let n_factors = embeddings.ncols();
        let confidence = 1.0 + CONFIDENCE_ALPHA;

        let mut gram = Array2::<f32>::zeros((n_factors, n_factors));
        let mut rhs = Array1::<f32>::zeros(n_factors);
        for &position in liked_positions {
            let row = embeddings.row(position);
            for a in 0..n_factors {
                rhs[a] += confidence * row[a];
                for b in 0..n_factors {
                    gram[[a, b]] += confidence * row[a] * row[b];
                }
            }
        }
        for a in 0..n_factors {
            gram[[a, a]] += RIDGE_LAMBDA;
        }

        cholesky_solve(&gram, &rhs)
    }
}

/// Solves `A x = b` for symmetric positive definite `A` via Cholesky
/// decomposition (pure Rust, avoids a LAPACK binding for one small solve)
fn cholesky_solve(a: &Array2<f32>, b: &Array1<f32>) -> Option<Array1<f32>> {
    let n = a.nrows();
    let mut lower = Array2::<f32>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= lower[[i, k]] * lower[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                lower[[i, j]] = sum.sqrt();
            } else {
                lower[[i, j]] = sum / lower[[j, j]];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = Array1::<f32>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= lower[[i, k]] * y[k];
        }
        y[i] = sum / lower[[i, i]];
    }

    // Back substitution: Lᵀ x = y
    let mut x = Array1::<f32>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= lower[[k, i]] * x[k];
        }
        x[i] = sum / lower[[i, i]];
    }

    Some(x)
}

#[async_trait::async_trait]
impl ScoreProvider for CfScorer {
    fn name(&self) -> &'static str {
        "cf"
    }

    async fn score(&self, catalog: &Catalog, request: &SignalRequest<'_>) -> AppResult<Vec<f64>> {
        let zeros = vec![0.0; catalog.len()];

        let Some(embeddings) = &self.embeddings else {
            return Ok(zeros);
        };
        if embeddings.nrows() != catalog.len() {
            return Err(AppError::Internal(format!(
                "Embedding matrix has {} rows, catalog has {} games",
                embeddings.nrows(),
                catalog.len()
            )));
        }
        if request.preferences.liked_games.is_empty() {
            return Ok(zeros);
        }

        let mut liked_positions = Vec::with_capacity(request.preferences.liked_games.len());
        for &bgg_id in &request.preferences.liked_games {
            liked_positions.push(catalog.require_position(bgg_id)?);
        }

        let Some(user_vector) = Self::fold_in(embeddings, &liked_positions) else {
            return Ok(zeros);
        };

        let raw: Vec<f64> = embeddings
            .dot(&user_vector)
            .iter()
            .map(|&score| score as f64)
            .collect();

        Ok(min_max_normalize(&raw))
    }
}
