//! Playlist reconciliation.
//!
//! Produces one complete replacement item array for the target playlist:
//! sections with queued replacements are rebuilt under their header,
//! everything else passes through structurally intact. Every emitted item
//! goes through the same field-cleaning pass because the controller's
//! write validation is stricter than its read shape; in particular a leaf
//! whose `id.contentId` is empty causes the whole write to be rejected
//! with a generic error. That invariant is re-verified over the final
//! array before it is handed to the caller.
//!
//! The caller submits the result as a single whole-array replace; the
//! remote applies or rejects it wholesale, so no partial-write recovery
//! exists here.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::ReconcileError;
use crate::models::{ContentRef, ItemId, LeafDraft, PlaylistItem, Slot};
use crate::utils::normalize;

/// Rebuild the playlist item array, replacing only slots that have
/// queued drafts.
pub fn reconcile(
    current_items: &[PlaylistItem],
    replacements_by_slot: &HashMap<Slot, Vec<LeafDraft>>,
    header_to_slot: &HashMap<String, Slot>,
) -> Result<Vec<PlaylistItem>, ReconcileError> {
    let mut output: Vec<PlaylistItem> = Vec::with_capacity(current_items.len());
    let mut skip_mode = false;
    let mut active_slot: Option<Slot> = None;
    let mut next_index = 0usize;

    for item in current_items {
        match item {
            PlaylistItem::Header { id, header_color } => {
                let slot = lookup_header_slot(&id.name, header_to_slot);
                let drafts = slot.and_then(|s| replacements_by_slot.get(&s)).filter(|d| !d.is_empty());

                output.push(clean_header(id, header_color.clone(), next_index));
                next_index += 1;

                match (slot, drafts) {
                    (Some(slot), Some(drafts)) => {
                        debug!(
                            "Replacing section '{}' ({}) with {} item(s)",
                            id.name,
                            slot,
                            drafts.len()
                        );
                        for draft in drafts {
                            output.push(mint_leaf(draft, next_index));
                            next_index += 1;
                        }
                        skip_mode = true;
                        active_slot = Some(slot);
                    }
                    (Some(slot), None) => {
                        debug!("Section '{}' ({}) has no replacements, kept as-is", id.name, slot);
                        skip_mode = false;
                        active_slot = None;
                    }
                    (None, _) => {
                        skip_mode = false;
                        active_slot = None;
                    }
                }
            }
            PlaylistItem::Presentation {
                id,
                content_ref,
                duration,
                is_hidden,
            } => {
                if skip_mode {
                    debug!(
                        "Dropping '{}' from replaced section {}",
                        id.name,
                        active_slot.map(|s| s.to_string()).unwrap_or_default()
                    );
                    continue;
                }
                output.push(clean_leaf(id, content_ref, *duration, *is_hidden, next_index)?);
                next_index += 1;
            }
        }
    }

    verify_content_ids(&output)?;
    Ok(output)
}

/// Field cleaning without any replacement: what `reconcile` degrades to
/// when no slot has queued drafts.
pub fn field_clean(items: &[PlaylistItem]) -> Result<Vec<PlaylistItem>, ReconcileError> {
    reconcile(items, &HashMap::new(), &HashMap::new())
}

fn lookup_header_slot(name: &str, header_to_slot: &HashMap<String, Slot>) -> Option<Slot> {
    let normalized = normalize(name);
    header_to_slot
        .iter()
        .find(|(header, _)| normalize(header) == normalized)
        .map(|(_, slot)| *slot)
}

fn clean_header(id: &ItemId, header_color: Option<String>, index: usize) -> PlaylistItem {
    PlaylistItem::Header {
        id: ItemId {
            name: id.name.clone(),
            index,
            content_id: None,
        },
        header_color,
    }
}

/// Pass-through leaf with only the writable fields retained. An id that
/// came back empty from the read side is defaulted from the content ref;
/// a leaf with neither is unwritable and fails the run here rather than
/// at the remote.
fn clean_leaf(
    id: &ItemId,
    content_ref: &ContentRef,
    duration: Option<f64>,
    is_hidden: bool,
    index: usize,
) -> Result<PlaylistItem, ReconcileError> {
    let content_id = id
        .content_id
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(&content_ref.content_id)
        .to_string();

    if content_id.trim().is_empty() {
        return Err(ReconcileError::EmptyContentId {
            name: id.name.clone(),
        });
    }

    Ok(PlaylistItem::Presentation {
        id: ItemId {
            name: id.name.clone(),
            index,
            content_id: Some(content_id.clone()),
        },
        content_ref: ContentRef {
            content_id,
            variant_name: content_ref.variant_name.clone(),
            variant_id: content_ref.variant_id.clone(),
        },
        duration,
        is_hidden,
    })
}

/// Fresh leaf minted from a draft; `ContentId` is non-empty by type.
fn mint_leaf(draft: &LeafDraft, index: usize) -> PlaylistItem {
    PlaylistItem::Presentation {
        id: ItemId {
            name: draft.name.clone(),
            index,
            content_id: Some(draft.content_id.as_str().to_string()),
        },
        content_ref: ContentRef {
            content_id: draft.content_id.as_str().to_string(),
            variant_name: draft.variant_name.clone(),
            variant_id: draft.variant_id.clone(),
        },
        duration: draft.duration,
        is_hidden: false,
    }
}

/// Output-boundary check of the write contract: every leaf carries a
/// non-empty `id.contentId` equal to its `contentRef.contentId`.
fn verify_content_ids(items: &[PlaylistItem]) -> Result<(), ReconcileError> {
    for item in items {
        if let PlaylistItem::Presentation { id, content_ref, .. } = item {
            let ok = id
                .content_id
                .as_deref()
                .map(|c| !c.trim().is_empty() && c == content_ref.content_id)
                .unwrap_or(false);
            if !ok {
                warn!("Reconciler produced unwritable leaf '{}'", id.name);
                return Err(ReconcileError::EmptyContentId {
                    name: id.name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentId;

    fn header(name: &str, index: usize) -> PlaylistItem {
        PlaylistItem::Header {
            id: ItemId {
                name: name.to_string(),
                index,
                content_id: None,
            },
            header_color: Some("#445566".to_string()),
        }
    }

    fn leaf(name: &str, index: usize, content_id: &str) -> PlaylistItem {
        PlaylistItem::Presentation {
            id: ItemId {
                name: name.to_string(),
                index,
                content_id: Some(content_id.to_string()),
            },
            content_ref: ContentRef {
                content_id: content_id.to_string(),
                variant_name: None,
                variant_id: None,
            },
            duration: None,
            is_hidden: false,
        }
    }

    fn draft(name: &str, content_id: &str) -> LeafDraft {
        LeafDraft {
            name: name.to_string(),
            content_id: ContentId::new(content_id).unwrap(),
            variant_name: None,
            variant_id: None,
            duration: None,
        }
    }

    fn template() -> Vec<PlaylistItem> {
        vec![
            header("Praise 1", 0),
            leaf("Placeholder A", 1, "old-a"),
            header("Announcements", 2),
            leaf("Notices Loop", 3, "old-b"),
            header("Praise 2", 4),
            leaf("Placeholder B", 5, "old-c"),
        ]
    }

    fn header_map() -> HashMap<String, Slot> {
        let mut map = HashMap::new();
        map.insert("praise 1".to_string(), Slot::Praise1);
        map.insert("praise 2".to_string(), Slot::Praise2);
        map
    }

    #[test]
    fn no_replacements_is_a_structural_no_op() {
        let items = template();
        let output = reconcile(&items, &HashMap::new(), &header_map()).unwrap();
        assert_eq!(output, field_clean(&items).unwrap());
        assert_eq!(output, items);
    }

    #[test]
    fn replaced_slot_keeps_neighbours_intact() {
        let mut replacements = HashMap::new();
        replacements.insert(Slot::Praise1, vec![draft("Song A", "new-a"), draft("Song B", "new-b")]);

        let output = reconcile(&template(), &replacements, &header_map()).unwrap();

        assert_eq!(output.len(), 7);
        assert_eq!(output[0].id().name, "Praise 1");
        assert_eq!(output[1].id().name, "Song A");
        assert_eq!(output[2].id().name, "Song B");
        assert_eq!(output[3].id().name, "Announcements");
        assert_eq!(output[4].id().name, "Notices Loop");
        assert_eq!(output[5].id().name, "Praise 2");
        assert_eq!(output[6].id().name, "Placeholder B");

        // Indexes are resequenced across the whole array.
        for (i, item) in output.iter().enumerate() {
            assert_eq!(item.id().index, i);
        }
    }

    #[test]
    fn every_output_leaf_carries_a_non_empty_content_id() {
        let mut replacements = HashMap::new();
        replacements.insert(Slot::Praise2, vec![draft("Song C", "new-c")]);

        let output = reconcile(&template(), &replacements, &header_map()).unwrap();

        for item in &output {
            if let PlaylistItem::Presentation { id, content_ref, .. } = item {
                let content_id = id.content_id.as_deref().unwrap();
                assert!(!content_id.is_empty());
                assert_eq!(content_id, content_ref.content_id);
            }
        }
    }

    #[test]
    fn empty_read_side_id_is_defaulted_from_content_ref() {
        let items = vec![PlaylistItem::Presentation {
            id: ItemId {
                name: "Legacy Item".to_string(),
                index: 0,
                content_id: None,
            },
            content_ref: ContentRef {
                content_id: "ref-1".to_string(),
                variant_name: None,
                variant_id: None,
            },
            duration: Some(120.0),
            is_hidden: false,
        }];

        let output = field_clean(&items).unwrap();
        assert_eq!(output[0].id().content_id.as_deref(), Some("ref-1"));
    }

    #[test]
    fn leaf_with_no_identifier_at_all_fails_before_the_write() {
        let items = vec![PlaylistItem::Presentation {
            id: ItemId {
                name: "Broken Item".to_string(),
                index: 0,
                content_id: Some("  ".to_string()),
            },
            content_ref: ContentRef {
                content_id: "".to_string(),
                variant_name: None,
                variant_id: None,
            },
            duration: None,
            is_hidden: false,
        }];

        let err = field_clean(&items).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyContentId { ref name } if name == "Broken Item"));
    }

    #[test]
    fn mapped_header_with_no_drafts_preserves_its_section() {
        let mut replacements = HashMap::new();
        replacements.insert(Slot::Praise1, Vec::new());

        let output = reconcile(&template(), &replacements, &header_map()).unwrap();
        assert_eq!(output, template());
    }

    #[test]
    fn unmapped_header_resets_skip_mode() {
        // Praise 1 is replaced; the unmapped Announcements header must
        // stop the drop and protect its own leaf.
        let mut replacements = HashMap::new();
        replacements.insert(Slot::Praise1, vec![draft("Song A", "new-a")]);

        let output = reconcile(&template(), &replacements, &header_map()).unwrap();
        let names: Vec<&str> = output.iter().map(|i| i.id().name.as_str()).collect();
        assert!(names.contains(&"Notices Loop"));
        assert!(!names.contains(&"Placeholder A"));
    }

    #[test]
    fn reconcile_is_idempotent_over_its_own_output() {
        let mut replacements = HashMap::new();
        replacements.insert(Slot::Praise1, vec![draft("Song A", "new-a")]);

        let once = reconcile(&template(), &replacements, &header_map()).unwrap();
        let twice = reconcile(&once, &replacements, &header_map()).unwrap();

        // Re-running replaces the freshly minted leaves with identical
        // ones, so the array is unchanged.
        assert_eq!(once, twice);
    }
}
