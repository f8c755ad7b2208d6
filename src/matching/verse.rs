//! Scripture reference matching.
//!
//! The controller names scripture presentations in its own convention
//! ("Luke 2_21-40 (NIV)-1") which never equals the document's citation
//! form ("Luke 2:21-40"), so plain equality has near-zero recall. Tiered
//! containment on normalized strings recovers it: exact 1.00, substring
//! either direction 0.85, shared significant tokens 0.60.

use tracing::debug;

use crate::config::MatchingConfig;
use crate::models::{CandidatePresentation, MatchCandidate, MatchResult, Slot};
use crate::utils::{normalize, significant_tokens};

const TIER_EXACT: f64 = 1.00;
const TIER_CONTAINED: f64 = 0.85;
const TIER_TOKEN_OVERLAP: f64 = 0.60;

/// Match one scripture reference against the service-content pool.
pub fn match_verse(
    reference: &str,
    pool: &[CandidatePresentation],
    config: &MatchingConfig,
) -> MatchResult {
    let normalized_ref = normalize(reference);
    if normalized_ref.is_empty() || pool.is_empty() {
        return MatchResult::not_found(reference, Slot::Reading);
    }

    let mut candidates: Vec<MatchCandidate> = pool
        .iter()
        .filter_map(|p| {
            verse_tier(&normalized_ref, &normalize(&p.display_name)).map(|confidence| {
                MatchCandidate {
                    presentation: p.clone(),
                    confidence,
                }
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.presentation.id.cmp(&b.presentation.id))
    });

    let best_match = candidates.first().cloned();
    let requires_review = best_match
        .as_ref()
        .map(|m| m.confidence < TIER_CONTAINED)
        .unwrap_or(true);
    let auto_accepted = best_match
        .as_ref()
        .map(|m| !requires_review && m.confidence >= config.recall_threshold)
        .unwrap_or(false);

    if let Some(ref best) = best_match {
        debug!(
            "Verse '{}' matched '{}' at {:.2}",
            reference, best.presentation.display_name, best.confidence
        );
    } else {
        debug!("Verse '{}' matched nothing", reference);
    }

    MatchResult {
        source_title: reference.to_string(),
        slot: Slot::Reading,
        selected: if auto_accepted {
            best_match.as_ref().map(|m| m.presentation.clone())
        } else {
            None
        },
        requires_review,
        best_match,
        candidates,
    }
}

/// Confidence tier for one candidate, `None` when it shares nothing
/// meaningful with the reference.
fn verse_tier(normalized_ref: &str, normalized_name: &str) -> Option<f64> {
    if normalized_name.is_empty() {
        return None;
    }
    if normalized_ref == normalized_name {
        return Some(TIER_EXACT);
    }
    if normalized_name.contains(normalized_ref) || normalized_ref.contains(normalized_name) {
        return Some(TIER_CONTAINED);
    }

    let ref_tokens = significant_tokens(normalized_ref);
    let name_tokens = significant_tokens(normalized_name);
    if ref_tokens.iter().any(|t| name_tokens.contains(t)) {
        return Some(TIER_TOKEN_OVERLAP);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PoolKey;

    fn pool(names: &[(&str, &str)]) -> Vec<CandidatePresentation> {
        names
            .iter()
            .map(|(id, name)| CandidatePresentation {
                id: id.to_string(),
                display_name: name.to_string(),
                pool_id: PoolKey::ServiceContent,
            })
            .collect()
    }

    fn config() -> MatchingConfig {
        MatchingConfig {
            auto_accept_threshold: 0.87,
            recall_threshold: 0.70,
        }
    }

    #[test]
    fn controller_naming_convention_is_bridged() {
        let pool = pool(&[("v1", "Luke 2_21-40 (NIV)-1")]);
        let result = match_verse("Luke 2:21-40", &pool, &config());

        let best = result.best_match.unwrap();
        assert!(best.confidence >= 0.85);
        assert!(!result.requires_review);
    }

    #[test]
    fn exact_normalized_match_is_full_confidence() {
        let pool = pool(&[("v1", "Luke 2_21-40")]);
        let result = match_verse("Luke 2:21-40", &pool, &config());
        assert_eq!(result.best_match.unwrap().confidence, 1.0);
    }

    #[test]
    fn shared_book_token_alone_still_requires_review() {
        let pool = pool(&[("v1", "Luke 15_11-32 (NIV)")]);
        let result = match_verse("Luke 2:21-40", &pool, &config());

        let best = result.best_match.unwrap();
        assert_eq!(best.confidence, 0.60);
        assert!(result.requires_review);
    }

    #[test]
    fn unrelated_references_are_excluded_entirely() {
        let pool = pool(&[("v1", "John 3_16 (NIV)")]);
        let result = match_verse("Luke 2:21-40", &pool, &config());

        assert!(result.candidates.is_empty());
        assert!(result.best_match.is_none());
        assert!(result.requires_review);
    }
}
