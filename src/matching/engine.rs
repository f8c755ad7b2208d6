//! Fuzzy matching of service sections against content-pool candidates.
//!
//! Song and video titles have no unique keys, so identity is resolved by
//! a composite similarity score over normalized names: normalized
//! Levenshtein distance blended with token-set overlap. The composite is
//! symmetric, scores 1.0 for identical normalized strings, and decreases
//! monotonically as characters are inserted or deleted.

use std::collections::HashMap;
use tracing::debug;

use crate::config::MatchingConfig;
use crate::models::{
    CandidatePresentation, MatchCandidate, MatchResult, PoolKey, SectionType, ServiceSection, Slot,
};
use crate::utils::normalize;

use super::verse::match_verse;

/// Candidate pools keyed by the library they were fetched from.
pub type Pools = HashMap<PoolKey, Vec<CandidatePresentation>>;

pub struct MatchEngine {
    config: MatchingConfig,
}

impl MatchEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Match every matchable section against its routed pool. Heading
    /// sections produce no result; scripture sections go through the
    /// verse matcher. Deterministic for unchanged sections and pools.
    pub fn match_sections(&self, sections: &[ServiceSection], pools: &Pools) -> Vec<MatchResult> {
        let mut results = Vec::new();

        for section in sections {
            match section.section_type {
                SectionType::Heading => continue,
                SectionType::BibleVerse => {
                    let pool = pool_or_empty(pools, PoolKey::ServiceContent);
                    results.push(match_verse(&section.title, pool, &self.config));
                }
                SectionType::Song | SectionType::Video => {
                    let pool_key = route_pool(section);
                    let pool = pool_or_empty(pools, pool_key);
                    results.push(self.match_title(section, pool));
                }
            }
        }

        results
    }

    fn match_title(&self, section: &ServiceSection, pool: &[CandidatePresentation]) -> MatchResult {
        let normalized_title = normalize(&section.title);
        if normalized_title.is_empty() || pool.is_empty() {
            debug!("No usable candidates for '{}'", section.title);
            return MatchResult::not_found(&section.title, section.slot);
        }

        let mut candidates: Vec<MatchCandidate> = pool
            .iter()
            .map(|p| MatchCandidate {
                presentation: p.clone(),
                confidence: similarity(&normalized_title, &normalize(&p.display_name)),
            })
            .filter(|c| c.confidence >= self.config.recall_threshold)
            .collect();

        // Confidence descending, candidate id as tiebreaker so re-runs
        // over an unchanged pool are stable.
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.presentation.id.cmp(&b.presentation.id))
        });

        let best_match = candidates.first().cloned();
        let auto_accepted = best_match
            .as_ref()
            .map(|m| m.confidence >= self.config.auto_accept_threshold)
            .unwrap_or(false);

        if let Some(ref best) = best_match {
            debug!(
                "'{}' best candidate '{}' at {:.2}{}",
                section.title,
                best.presentation.display_name,
                best.confidence,
                if auto_accepted { " (auto-accepted)" } else { "" }
            );
        }

        MatchResult {
            source_title: section.title.clone(),
            slot: section.slot,
            selected: if auto_accepted {
                best_match.as_ref().map(|m| m.presentation.clone())
            } else {
                None
            },
            requires_review: !auto_accepted,
            best_match,
            candidates,
        }
    }
}

/// Pool routing: kids slot wins over everything, non-kids videos draw
/// from service content, all other matchable sections from worship.
pub fn route_pool(section: &ServiceSection) -> PoolKey {
    if section.slot == Slot::Kids {
        PoolKey::Kids
    } else if section.section_type == SectionType::Video {
        PoolKey::ServiceContent
    } else {
        PoolKey::Worship
    }
}

fn pool_or_empty(pools: &Pools, key: PoolKey) -> &[CandidatePresentation] {
    pools.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
}

/// Composite similarity on already-normalized strings: equal-weight blend
/// of normalized Levenshtein similarity and token Jaccard overlap.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let lev = levenshtein_similarity(a, b);
    let overlap = token_overlap_similarity(a, b);
    (lev * 0.5 + overlap * 0.5).min(1.0)
}

fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f64 / max_len as f64)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let len_a = a_chars.len();
    let len_b = b_chars.len();

    let mut matrix = vec![vec![0; len_b + 1]; len_a + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len_b {
        matrix[0][j] = j;
    }

    for i in 1..=len_a {
        for j in 1..=len_b {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len_a][len_b]
}

fn token_overlap_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: std::collections::HashSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }

    tokens_a.intersection(&tokens_b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str, pool: PoolKey) -> CandidatePresentation {
        CandidatePresentation {
            id: id.to_string(),
            display_name: name.to_string(),
            pool_id: pool,
        }
    }

    fn section(title: &str, section_type: SectionType, slot: Slot) -> ServiceSection {
        ServiceSection {
            section_type,
            title: title.to_string(),
            position: 0,
            is_kids_video: slot == Slot::Kids,
            slot,
            special_service_type: None,
        }
    }

    fn engine() -> MatchEngine {
        MatchEngine::new(MatchingConfig {
            auto_accept_threshold: 0.87,
            recall_threshold: 0.70,
        })
    }

    fn pools_with(key: PoolKey, entries: Vec<CandidatePresentation>) -> Pools {
        let mut pools = Pools::new();
        pools.insert(key, entries);
        pools
    }

    #[test]
    fn identical_normalized_title_scores_one_and_auto_accepts() {
        let pools = pools_with(
            PoolKey::Worship,
            vec![
                candidate("a", "Amazing Grace", PoolKey::Worship),
                candidate("b", "Be Thou My Vision", PoolKey::Worship),
            ],
        );
        let sections = vec![section("Amazing Grace", SectionType::Song, Slot::Praise1)];

        let results = engine().match_sections(&sections, &pools);

        assert_eq!(results.len(), 1);
        let best = results[0].best_match.as_ref().unwrap();
        assert_eq!(best.confidence, 1.0);
        assert!(!results[0].requires_review);
        assert_eq!(results[0].selected.as_ref().unwrap().id, "a");
    }

    #[test]
    fn empty_pool_is_the_explicit_not_found_state() {
        let results = engine().match_sections(
            &[section("Unknown Song", SectionType::Song, Slot::Praise1)],
            &Pools::new(),
        );

        assert!(results[0].candidates.is_empty());
        assert!(results[0].best_match.is_none());
        assert!(results[0].requires_review);
    }

    #[test]
    fn candidates_below_recall_threshold_are_excluded() {
        let pools = pools_with(
            PoolKey::Worship,
            vec![candidate("x", "Completely Different Thing", PoolKey::Worship)],
        );
        let results = engine().match_sections(
            &[section("Amazing Grace", SectionType::Song, Slot::Praise1)],
            &pools,
        );

        assert!(results[0].candidates.is_empty());
        assert!(results[0].requires_review);
    }

    #[test]
    fn kids_slot_routes_to_kids_pool() {
        let s = section("Story Time", SectionType::Video, Slot::Kids);
        assert_eq!(route_pool(&s), PoolKey::Kids);

        let v = section("Welcome Loop", SectionType::Video, Slot::None);
        assert_eq!(route_pool(&v), PoolKey::ServiceContent);

        let song = section("Amazing Grace", SectionType::Song, Slot::Praise1);
        assert_eq!(route_pool(&song), PoolKey::Worship);
    }

    #[test]
    fn rematch_with_unchanged_inputs_is_deterministic() {
        let pools = pools_with(
            PoolKey::Worship,
            vec![
                candidate("b", "Great Is Thy Faithfulness", PoolKey::Worship),
                candidate("a", "Great Is Thy Faithfulness", PoolKey::Worship),
            ],
        );
        let sections = vec![section(
            "Great is thy faithfulness",
            SectionType::Song,
            Slot::Praise1,
        )];

        let first = engine().match_sections(&sections, &pools);
        let second = engine().match_sections(&sections, &pools);

        assert_eq!(first, second);
        // Equal confidence breaks ties on candidate id.
        assert_eq!(first[0].candidates[0].presentation.id, "a");
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "amazing grace";
        let b = "amazing grace how sweet";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn similarity_decreases_with_edits() {
        let base = similarity("amazing grace", "amazing grace");
        let one_off = similarity("amazing grace", "amazing grac");
        let worse = similarity("amazing grace", "amazing");
        assert_eq!(base, 1.0);
        assert!(one_off < base);
        assert!(worse < one_off);
    }
}
