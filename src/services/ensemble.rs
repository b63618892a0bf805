use thiserror::Error;

use crate::catalog::Catalog;
use crate::models::{BlendWeights, Recommendation, UserPreferences};
use crate::services::filters::apply_constraints;

/// Error types for the fusion core
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("{signal} score vector has {actual} entries, catalog has {expected}")]
    ShapeMismatch {
        signal: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown game id {0} in preferences")]
    UnknownGameId(u32),
}

/// Rescales a raw score vector into [0, 1] via min-max normalization.
///
/// A constant vector (including all-zero) carries no ranking information and
/// maps to all zeros rather than dividing by zero.
pub fn min_max_normalize(raw: &[f64]) -> Vec<f64> {
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if raw.is_empty() || max == min {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|x| (x - min) / (max - min)).collect()
}

/// Which of the three signals came back degenerate (exactly all-zero).
///
/// Exact equality, not a near-zero tolerance: providers that could not
/// compute a signal emit an honest all-zero vector, never small noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalAvailability {
    pub cf_zero: bool,
    pub cbf_zero: bool,
    pub llm_zero: bool,
}

impl SignalAvailability {
    pub fn detect(cf: &[f64], cbf: &[f64], llm: &[f64]) -> Self {
        Self {
            cf_zero: is_degenerate(cf),
            cbf_zero: is_degenerate(cbf),
            llm_zero: is_degenerate(llm),
        }
    }
}

fn is_degenerate(scores: &[f64]) -> bool {
    scores.iter().all(|&x| x == 0.0)
}

/// Derives effective blend weights from requested weights and signal
/// availability.
///
/// The beta rules take precedence top to bottom; the alpha rules are
/// independent of them:
/// - both CF and CBF degenerate: rely entirely on the LLM (beta = 1.0)
/// - LLM degenerate: rely entirely on CF+CBF (beta = 0.0)
/// - CF degenerate alone: all content-based (alpha = 0.0)
/// - CBF degenerate alone: all collaborative (alpha = 1.0)
///
/// When all three signals are degenerate, beta = 1.0 collapses the fused
/// score onto the zero LLM component; the selection threshold then yields an
/// empty result instead of a failure.
pub fn resolve_weights(
    availability: SignalAvailability,
    requested: BlendWeights,
) -> BlendWeights {
    let beta = if availability.cf_zero && availability.cbf_zero {
        1.0
    } else if availability.llm_zero {
        0.0
    } else {
        requested.beta
    };

    let alpha = if availability.cf_zero && !availability.cbf_zero {
        0.0
    } else if availability.cbf_zero && !availability.cf_zero {
        1.0
    } else {
        requested.alpha
    };

    BlendWeights { alpha, beta }
}

/// Fused hybrid scores plus the weighted per-signal contributions
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScores {
    pub hybrid: Vec<f64>,
    pub cf_component: Vec<f64>,
    pub cbf_component: Vec<f64>,
    pub llm_component: Vec<f64>,
}

/// Combines three normalized, co-indexed score vectors into one hybrid
/// score per candidate:
///
/// `hybrid = (cf * alpha + cbf * (1 - alpha)) * (1 - beta) + llm * beta`
pub fn fuse(cf: &[f64], cbf: &[f64], llm: &[f64], weights: BlendWeights) -> FusedScores {
    let n = cf.len();
    let mut cf_component = Vec::with_capacity(n);
    let mut cbf_component = Vec::with_capacity(n);
    let mut llm_component = Vec::with_capacity(n);
    let mut hybrid = Vec::with_capacity(n);

    for i in 0..n {
        let cf_part = cf[i] * weights.alpha;
        let cbf_part = cbf[i] * (1.0 - weights.alpha);
        let llm_part = llm[i] * weights.beta;
        cf_component.push(cf_part);
        cbf_component.push(cbf_part);
        llm_component.push(llm_part);
        hybrid.push((cf_part + cbf_part) * (1.0 - weights.beta) + llm_part);
    }

    FusedScores {
        hybrid,
        cf_component,
        cbf_component,
        llm_component,
    }
}

/// Selects the indices of the top `n` candidates with score >= `epsilon`,
/// descending by score. The sort is stable, so exact ties keep their
/// original catalog order. Fewer than `n` survivors returns all of them;
/// zero survivors returns an empty list.
pub fn select_top_n(scores: &[f64], epsilon: f64, n: usize) -> Vec<usize> {
    let mut survivors: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i] >= epsilon)
        .collect();
    survivors.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    survivors.truncate(n);
    survivors
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn check_shape(signal: &'static str, scores: &[f64], expected: usize) -> Result<(), EnsembleError> {
    if scores.len() != expected {
        return Err(EnsembleError::ShapeMismatch {
            signal,
            expected,
            actual: scores.len(),
        });
    }
    Ok(())
}

/// Runs the full fusion pipeline: availability check, weight resolution,
/// fusion, constraint filtering, and top-N selection.
///
/// Score vectors must already be bounded; providers min-max normalize their
/// raw output before it reaches this point. Deterministic and side-effect
/// free; repeated calls with the same inputs yield identical output.
#[allow(clippy::too_many_arguments)]
pub fn produce_recommendations(
    catalog: &Catalog,
    cf_raw: &[f64],
    cbf_raw: &[f64],
    llm_raw: &[f64],
    preferences: &UserPreferences,
    requested: BlendWeights,
    top_n: usize,
    epsilon: f64,
) -> Result<Vec<Recommendation>, EnsembleError> {
    let expected = catalog.len();
    check_shape("cf", cf_raw, expected)?;
    check_shape("cbf", cbf_raw, expected)?;
    check_shape("llm", llm_raw, expected)?;

    let availability = SignalAvailability::detect(cf_raw, cbf_raw, llm_raw);
    let weights = resolve_weights(availability, requested);

    let fused = fuse(cf_raw, cbf_raw, llm_raw, weights);

    let mut final_scores = fused.hybrid.clone();
    apply_constraints(&mut final_scores, catalog, preferences)?;

    let selected = select_top_n(&final_scores, epsilon, top_n);

    let recommendations = selected
        .into_iter()
        .map(|i| {
            let game = &catalog.games()[i];
            Recommendation {
                bgg_id: game.bgg_id,
                name: game.name.clone(),
                avg_rating: game.avg_rating,
                categories: game.categories.clone(),
                mechanics: game.mechanics.clone(),
                game_types: game.game_types.clone(),
                weight: game.weight,
                year_published: game.year_published,
                players_min: game.players_min,
                players_max: game.players_max,
                score: round4(final_scores[i]),
                cf_score: round4(fused.cf_component[i]),
                cbf_score: round4(fused.cbf_component[i]),
                llm_score: round4(fused.llm_component[i]),
            }
        })
        .collect();

    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Game;

    fn test_game(bgg_id: u32, name: &str) -> Game {
        Game {
            bgg_id,
            name: name.to_string(),
            avg_rating: 7.5,
            categories: vec!["Strategy".to_string()],
            mechanics: vec!["Drafting".to_string()],
            game_types: vec!["Family".to_string()],
            weight: 2.5,
            year_published: 2015,
            players_min: 2,
            players_max: 4,
            time_min: 30,
            time_max: 60,
            description: String::new(),
        }
    }

    fn test_catalog(n: u32) -> Catalog {
        let games = (0..n).map(|i| test_game(100 + i, &format!("Game {}", i))).collect();
        Catalog::from_games(games).unwrap()
    }

    #[test]
    fn test_normalize_bounds() {
        let normalized = min_max_normalize(&[3.0, 7.0, 5.0]);
        assert_eq!(normalized, vec![0.0, 1.0, 0.5]);
        assert!(normalized.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_normalize_constant_vector_is_zero() {
        assert_eq!(min_max_normalize(&[4.2, 4.2, 4.2]), vec![0.0, 0.0, 0.0]);
        assert_eq!(min_max_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(min_max_normalize(&[]), Vec::<f64>::new());
    }

    #[test]
    fn test_availability_exact_zero_test() {
        let availability =
            SignalAvailability::detect(&[0.0, 0.0], &[0.0, 1e-12], &[0.5, 0.0]);
        assert!(availability.cf_zero);
        assert!(!availability.cbf_zero);
        assert!(!availability.llm_zero);
    }

    #[test]
    fn test_resolver_both_rating_signals_zero_forces_llm() {
        let availability = SignalAvailability {
            cf_zero: true,
            cbf_zero: true,
            llm_zero: false,
        };
        let resolved = resolve_weights(availability, BlendWeights::new(0.5, 0.1));
        assert_eq!(resolved.beta, 1.0);
    }

    #[test]
    fn test_resolver_llm_zero_forces_cf_cbf() {
        let availability = SignalAvailability {
            cf_zero: false,
            cbf_zero: false,
            llm_zero: true,
        };
        let resolved = resolve_weights(availability, BlendWeights::new(0.5, 0.33));
        assert_eq!(resolved.beta, 0.0);
        assert_eq!(resolved.alpha, 0.5);
    }

    #[test]
    fn test_resolver_cf_zero_goes_content_based() {
        let availability = SignalAvailability {
            cf_zero: true,
            cbf_zero: false,
            llm_zero: false,
        };
        let resolved = resolve_weights(availability, BlendWeights::new(0.5, 0.33));
        assert_eq!(resolved.alpha, 0.0);
        assert_eq!(resolved.beta, 0.33);
    }

    #[test]
    fn test_resolver_cbf_zero_goes_collaborative() {
        let availability = SignalAvailability {
            cf_zero: false,
            cbf_zero: true,
            llm_zero: false,
        };
        let resolved = resolve_weights(availability, BlendWeights::new(0.5, 0.33));
        assert_eq!(resolved.alpha, 1.0);
    }

    #[test]
    fn test_resolver_all_signals_present_passes_through() {
        let availability = SignalAvailability {
            cf_zero: false,
            cbf_zero: false,
            llm_zero: false,
        };
        let requested = BlendWeights::new(0.7, 0.2);
        assert_eq!(resolve_weights(availability, requested), requested);
    }

    #[test]
    fn test_fusion_formula() {
        let weights = BlendWeights::new(0.6, 0.25);
        let fused = fuse(&[0.8, 0.2], &[0.4, 1.0], &[0.1, 0.9], weights);
        for i in 0..2 {
            let expected = ([0.8, 0.2][i] * 0.6 + [0.4, 1.0][i] * 0.4) * 0.75
                + [0.1, 0.9][i] * 0.25;
            assert!((fused.hybrid[i] - expected).abs() < 1e-12);
        }
        assert!((fused.cf_component[0] - 0.48).abs() < 1e-12);
        assert!((fused.llm_component[1] - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let cf = [0.3, 0.1, 0.9];
        let cbf = [0.2, 0.8, 0.4];
        let llm = [0.5, 0.5, 0.0];
        let weights = BlendWeights::default();
        let first = fuse(&cf, &cbf, &llm, weights);
        let second = fuse(&cf, &cbf, &llm, weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_top_n_epsilon_and_stable_ties() {
        let scores = [0.02, 0.5, 0.009, 0.5];
        let selected = select_top_n(&scores, 0.01, 3);
        // Both 0.5 entries in catalog order, then the 0.02; the 0.009 falls
        // below the threshold
        assert_eq!(selected, vec![1, 3, 0]);
    }

    #[test]
    fn test_select_top_n_fewer_survivors_than_n() {
        let selected = select_top_n(&[0.0, 0.3, 0.0], 0.01, 5);
        assert_eq!(selected, vec![1]);
    }

    #[test]
    fn test_select_top_n_no_survivors() {
        let selected = select_top_n(&[0.0, 0.005], 0.01, 3);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let catalog = test_catalog(3);
        let result = produce_recommendations(
            &catalog,
            &[0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            &UserPreferences::default(),
            BlendWeights::default(),
            5,
            0.01,
        );
        assert!(matches!(
            result,
            Err(EnsembleError::ShapeMismatch {
                signal: "cf",
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_liked_game_never_recommended() {
        let catalog = test_catalog(3);
        let preferences = UserPreferences {
            // Game at position 1 has the maximum hybrid score
            liked_games: [101].into(),
            ..Default::default()
        };
        let recommendations = produce_recommendations(
            &catalog,
            &[0.1, 1.0, 0.5],
            &[0.1, 1.0, 0.5],
            &[0.0; 3],
            &preferences,
            BlendWeights::default(),
            5,
            0.01,
        )
        .unwrap();
        assert!(recommendations.iter().all(|r| r.bgg_id != 101));
    }

    #[test]
    fn test_all_signals_zero_yields_empty_result() {
        let catalog = test_catalog(4);
        let recommendations = produce_recommendations(
            &catalog,
            &[0.0; 4],
            &[0.0; 4],
            &[0.0; 4],
            &UserPreferences::default(),
            BlendWeights::default(),
            5,
            0.01,
        )
        .unwrap();
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_end_to_end_cbf_only_scenario() {
        // CF all zero, LLM all zero: the resolver forces alpha = 0.0 and
        // beta = 0.0, so the hybrid vector equals the CBF vector unchanged
        let catalog = test_catalog(5);
        let cbf = [0.1, 0.9, 0.2, 0.0, 0.4];
        let recommendations = produce_recommendations(
            &catalog,
            &[0.0; 5],
            &cbf,
            &[0.0; 5],
            &UserPreferences::default(),
            BlendWeights::new(0.5, 0.33),
            2,
            0.01,
        )
        .unwrap();
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].bgg_id, 101);
        assert_eq!(recommendations[0].score, 0.9);
        assert_eq!(recommendations[1].bgg_id, 104);
        assert_eq!(recommendations[1].score, 0.4);
    }

    #[test]
    fn test_scores_rounded_to_four_decimals() {
        let catalog = test_catalog(2);
        let recommendations = produce_recommendations(
            &catalog,
            &[0.0; 2],
            &[0.123456789, 1.0],
            &[0.0; 2],
            &UserPreferences::default(),
            BlendWeights::default(),
            5,
            0.01,
        )
        .unwrap();
        assert_eq!(recommendations[1].score, 0.1235);
    }
}
