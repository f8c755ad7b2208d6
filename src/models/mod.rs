use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical position of an item within the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Praise1,
    Praise2,
    Praise3,
    Kids,
    Reading,
    None,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Slot::Praise1 => "praise1",
            Slot::Praise2 => "praise2",
            Slot::Praise3 => "praise3",
            Slot::Kids => "kids",
            Slot::Reading => "reading",
            Slot::None => "none",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Song,
    Video,
    BibleVerse,
    Heading,
}

/// One logical entry extracted from the order-of-service document.
/// Immutable once the segmenter has produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSection {
    pub section_type: SectionType,
    pub title: String,
    /// 0-based order of appearance in the document.
    pub position: usize,
    pub is_kids_video: bool,
    pub slot: Slot,
    /// Document-wide calendar/liturgical tag, copied onto every section
    /// of a run when detected.
    pub special_service_type: Option<String>,
}

/// Which external content library a candidate came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PoolKey {
    Worship,
    Kids,
    ServiceContent,
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolKey::Worship => "worship",
            PoolKey::Kids => "kids",
            PoolKey::ServiceContent => "service-content",
        };
        write!(f, "{}", s)
    }
}

/// One entry in an external content pool, fetched fresh at matching time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePresentation {
    pub id: String,
    pub display_name: String,
    pub pool_id: PoolKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCandidate {
    pub presentation: CandidatePresentation,
    /// Similarity score in [0, 1].
    pub confidence: f64,
}

/// Outcome of matching one service section against its pool.
///
/// `selected` is the only field mutated after creation, either by
/// auto-acceptance above the configured threshold or by explicit user
/// confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub source_title: String,
    pub slot: Slot,
    /// Sorted descending by confidence, candidate id as tiebreaker.
    pub candidates: Vec<MatchCandidate>,
    pub best_match: Option<MatchCandidate>,
    pub requires_review: bool,
    pub selected: Option<CandidatePresentation>,
}

impl MatchResult {
    /// The explicit not-found state: no usable candidates, review required.
    pub fn not_found(source_title: impl Into<String>, slot: Slot) -> Self {
        Self {
            source_title: source_title.into(),
            slot,
            candidates: Vec::new(),
            best_match: None,
            requires_review: true,
            selected: None,
        }
    }
}

/// Non-empty content identifier.
///
/// The presentation controller rejects an entire playlist write when any
/// leaf item carries an empty identifier, with a generic error that gives
/// no hint at the cause. Typing the identifier as non-empty keeps that
/// failure out of the write path altogether.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identity block shared by headers and leaves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemId {
    pub name: String,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

/// Reference from a leaf item to the presentation it displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub content_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
}

/// One item of the target playlist, in the remote system's representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlaylistItem {
    #[serde(rename = "header", rename_all = "camelCase")]
    Header {
        id: ItemId,
        #[serde(skip_serializing_if = "Option::is_none")]
        header_color: Option<String>,
    },
    #[serde(rename = "presentation", rename_all = "camelCase")]
    Presentation {
        id: ItemId,
        content_ref: ContentRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(default)]
        is_hidden: bool,
    },
}

impl PlaylistItem {
    pub fn id(&self) -> &ItemId {
        match self {
            PlaylistItem::Header { id, .. } => id,
            PlaylistItem::Presentation { id, .. } => id,
        }
    }
}

/// A replacement leaf queued for a slot, minted from a selected candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafDraft {
    pub name: String,
    pub content_id: ContentId,
    pub variant_name: Option<String>,
    pub variant_id: Option<String>,
    pub duration: Option<f64>,
}

impl LeafDraft {
    /// Build a draft from a confirmed candidate. Returns `None` when the
    /// candidate carries an empty id, which the remote would reject.
    pub fn from_candidate(candidate: &CandidatePresentation) -> Option<Self> {
        Some(Self {
            name: candidate.display_name.clone(),
            content_id: ContentId::new(candidate.id.clone())?,
            variant_name: None,
            variant_id: None,
            duration: None,
        })
    }
}

/// Summary entry from the remote playlist listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}
