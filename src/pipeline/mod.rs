//! Step-gated pipeline: segment, match, reconcile.
//!
//! Each step is a pure function of its inputs plus state fetched from the
//! controller immediately before the step runs, so any step can be
//! re-run safely after the operator edits the external library. Nothing
//! is written to the controller until the single whole-array PUT at the
//! end of the apply step.
//!
//! The controller offers no revision token, so concurrent edits by two
//! operators between the pre-write read and the PUT can lose one
//! operator's change. The read-fresh-before-write discipline plus the
//! staleness warning bounds that window; it does not close it.

use chrono::{DateTime, Utc};
use futures::try_join;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AppError, ReconcileError, Result};
use crate::matching::{MatchEngine, Pools};
use crate::models::{
    CandidatePresentation, LeafDraft, MatchResult, PlaylistItem, PlaylistSummary, PoolKey, Slot,
};
use crate::reconciler::reconcile;
use crate::remote::PresentationApi;
use crate::segmenter::{SegmentOutcome, Segmenter};

/// Handoff string pair for the manual-review fallback. Clipboard and
/// browser are the shell's concern; the pipeline only mints the strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFallback {
    pub title: String,
    pub search_url: String,
}

impl ManualFallback {
    fn for_title(title: &str) -> Self {
        Self {
            title: title.to_string(),
            search_url: format!(
                "https://www.google.com/search?q={}",
                urlencoding::encode(title)
            ),
        }
    }
}

/// Output of the matching step: results in section order plus fallback
/// handoffs for everything that found no usable candidate.
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub results: Vec<MatchResult>,
    pub fallbacks: Vec<ManualFallback>,
}

impl MatchReport {
    /// Explicit user confirmation of one candidate. The only mutation a
    /// match result ever sees after creation.
    pub fn confirm(&mut self, index: usize, candidate: CandidatePresentation) -> Result<()> {
        let result = self
            .results
            .get_mut(index)
            .ok_or_else(|| AppError::internal(format!("no match result at index {}", index)))?;
        result.selected = Some(candidate);
        result.requires_review = false;
        Ok(())
    }

    pub fn review_count(&self) -> usize {
        self.results.iter().filter(|r| r.requires_review).count()
    }
}

pub struct Pipeline {
    api: Arc<dyn PresentationApi>,
    config: Config,
    segmenter: Segmenter,
    engine: MatchEngine,
}

impl Pipeline {
    pub fn new(api: Arc<dyn PresentationApi>, config: Config) -> Result<Self> {
        let segmenter = Segmenter::new(&config.segmenter)
            .map_err(|e| AppError::configuration(format!("bad segmenter pattern: {}", e)))?;
        let engine = MatchEngine::new(config.matching.clone());
        Ok(Self {
            api,
            config,
            segmenter,
            engine,
        })
    }

    /// Step 1: segment the extracted document text. Pure; degraded
    /// documents produce a short or empty section list, never an error.
    pub fn segment_document(&self, raw_text: &str) -> SegmentOutcome {
        let run_id = Uuid::new_v4();
        info!("Segmenting document (run {})", run_id);
        let outcome = self.segmenter.segment(raw_text);
        info!(
            "Segmented {} section(s){}",
            outcome.sections.len(),
            outcome
                .special_service_type
                .as_deref()
                .map(|t| format!(", special service '{}'", t))
                .unwrap_or_default()
        );
        outcome
    }

    /// Step 2: fetch all pools fresh and match every section. Re-running
    /// with unchanged sections and an unchanged library yields identical
    /// results.
    pub async fn run_matching(&self, outcome: &SegmentOutcome) -> Result<MatchReport> {
        let pools = self.fetch_pools().await?;
        let results = self.engine.match_sections(&outcome.sections, &pools);

        let fallbacks: Vec<ManualFallback> = results
            .iter()
            .filter(|r| r.requires_review && r.candidates.is_empty())
            .map(|r| ManualFallback::for_title(&r.source_title))
            .collect();

        let review = results.iter().filter(|r| r.requires_review).count();
        if review > 0 {
            warn!(
                "{} of {} section(s) need manual review ({} with no candidates at all)",
                review,
                results.len(),
                fallbacks.len()
            );
        } else {
            info!("All {} section(s) matched above threshold", results.len());
        }

        Ok(MatchReport { results, fallbacks })
    }

    /// Pool fetches are read-only and independent, so they fan out.
    async fn fetch_pools(&self) -> Result<Pools> {
        let (worship, kids, service_content) = try_join!(
            self.api.library_items(PoolKey::Worship),
            self.api.library_items(PoolKey::Kids),
            self.api.library_items(PoolKey::ServiceContent),
        )?;

        let mut pools = Pools::new();
        pools.insert(PoolKey::Worship, worship);
        pools.insert(PoolKey::Kids, kids);
        pools.insert(PoolKey::ServiceContent, service_content);
        Ok(pools)
    }

    /// Resolve the configured target playlist by name.
    pub async fn resolve_target(&self) -> Result<PlaylistSummary> {
        let playlists = self.api.list_playlists().await?;
        playlists
            .into_iter()
            .find(|p| p.name == self.config.playlist.target)
            .ok_or_else(|| AppError::not_found("playlist", &self.config.playlist.target))
    }

    /// Step 3: re-fetch the target playlist, reconcile the confirmed
    /// selections into it, and PUT the whole array. With `dry_run` the
    /// reconciled array is returned without writing.
    pub async fn apply(&self, report: &MatchReport, dry_run: bool) -> Result<Vec<PlaylistItem>> {
        let target = self.resolve_target().await?;
        let replacements = build_replacements(&report.results);

        if replacements.is_empty() {
            warn!("No confirmed selections; apply would be a field-cleaning no-op");
        }

        // Read fresh immediately before the write to bound staleness.
        let read_at: DateTime<Utc> = Utc::now();
        let current_items = self.api.playlist_items(&target.id).await?;
        info!(
            "Fetched {} item(s) from playlist '{}'",
            current_items.len(),
            target.name
        );

        let cleaned = reconcile(
            &current_items,
            &replacements,
            &self.config.playlist.header_slots,
        )
        .map_err(AppError::Reconcile)?;

        let read_age = Utc::now().signed_duration_since(read_at);
        if read_age.num_seconds() > self.config.remote.stale_read_secs as i64 {
            warn!(
                "Pre-write read is {}s old (tolerance {}s); another operator's edits may be lost",
                read_age.num_seconds(),
                self.config.remote.stale_read_secs
            );
        }

        if dry_run {
            info!("Dry run: skipping write of {} item(s)", cleaned.len());
            return Ok(cleaned);
        }

        self.api
            .put_playlist_items(&target.id, &cleaned)
            .await
            .map_err(|e| AppError::Reconcile(ReconcileError::WriteRejected(e)))?;

        info!(
            "Playlist '{}' updated with {} item(s)",
            target.name,
            cleaned.len()
        );
        Ok(cleaned)
    }
}

/// Group confirmed selections into per-slot replacement drafts, in
/// section order. Sections without a selection (or in no slot) are left
/// out, which preserves their current content in the playlist.
pub fn build_replacements(results: &[MatchResult]) -> HashMap<Slot, Vec<LeafDraft>> {
    let mut replacements: HashMap<Slot, Vec<LeafDraft>> = HashMap::new();

    for result in results {
        if result.slot == Slot::None {
            continue;
        }
        let Some(selected) = &result.selected else {
            continue;
        };
        match LeafDraft::from_candidate(selected) {
            Some(draft) => replacements.entry(result.slot).or_default().push(draft),
            None => warn!(
                "Skipping '{}': selected candidate has an empty id",
                result.source_title
            ),
        }
    }

    replacements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchCandidate, PoolKey};

    fn selected_result(title: &str, slot: Slot, id: &str) -> MatchResult {
        let presentation = CandidatePresentation {
            id: id.to_string(),
            display_name: title.to_string(),
            pool_id: PoolKey::Worship,
        };
        MatchResult {
            source_title: title.to_string(),
            slot,
            candidates: vec![MatchCandidate {
                presentation: presentation.clone(),
                confidence: 1.0,
            }],
            best_match: Some(MatchCandidate {
                presentation: presentation.clone(),
                confidence: 1.0,
            }),
            requires_review: false,
            selected: Some(presentation),
        }
    }

    #[test]
    fn replacements_group_by_slot_in_section_order() {
        let results = vec![
            selected_result("Song One", Slot::Praise1, "a"),
            selected_result("Song Two", Slot::Praise1, "b"),
            selected_result("Story Time", Slot::Kids, "c"),
            MatchResult::not_found("Mystery Song", Slot::Praise2),
        ];

        let replacements = build_replacements(&results);

        assert_eq!(replacements.len(), 2);
        let praise1 = &replacements[&Slot::Praise1];
        assert_eq!(praise1.len(), 2);
        assert_eq!(praise1[0].name, "Song One");
        assert_eq!(praise1[1].name, "Song Two");
        assert!(!replacements.contains_key(&Slot::Praise2));
    }

    #[test]
    fn unslotted_selections_are_not_queued() {
        let results = vec![selected_result("Loose Song", Slot::None, "x")];
        assert!(build_replacements(&results).is_empty());
    }

    #[test]
    fn fallback_url_encodes_the_title() {
        let fallback = ManualFallback::for_title("Song & Dance");
        assert_eq!(fallback.title, "Song & Dance");
        assert!(fallback.search_url.ends_with("Song%20%26%20Dance"));
    }

    #[test]
    fn confirm_clears_review_flag() {
        let mut report = MatchReport {
            results: vec![MatchResult::not_found("Mystery Song", Slot::Praise2)],
            fallbacks: vec![ManualFallback::for_title("Mystery Song")],
        };

        let candidate = CandidatePresentation {
            id: "found-later".to_string(),
            display_name: "Mystery Song".to_string(),
            pool_id: PoolKey::Worship,
        };
        report.confirm(0, candidate.clone()).unwrap();

        assert!(!report.results[0].requires_review);
        assert_eq!(report.results[0].selected.as_ref(), Some(&candidate));
        assert_eq!(report.review_count(), 0);
    }
}
