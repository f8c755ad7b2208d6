//! Document segmentation for extracted order-of-service text.
//!
//! The segmenter walks the document line by line, carrying
//! `(current_slot, special_service_type)` as explicit fold state. Lines
//! that match no configured pattern are skipped; a document the segmenter
//! cannot make sense of degrades to an empty outcome, never an error,
//! because source documents vary wildly in layout and completeness.

use regex::Regex;
use tracing::{debug, warn};

use crate::config::SegmenterConfig;
use crate::models::{SectionType, ServiceSection, Slot};

/// Result of segmenting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOutcome {
    pub sections: Vec<ServiceSection>,
    pub special_service_type: Option<String>,
}

/// Compiled marker tables for one segmenter configuration.
pub struct Segmenter {
    slot_markers: Vec<(Regex, Slot)>,
    song_pattern: Regex,
    scripture_pattern: Regex,
    video_marker: Regex,
    kids_keywords: Vec<String>,
    kids_lookahead: usize,
    special_service_keywords: Vec<(String, String)>,
}

impl Segmenter {
    pub fn new(config: &SegmenterConfig) -> Result<Self, regex::Error> {
        let mut slot_markers = Vec::new();
        for marker in &config.slot_markers {
            slot_markers.push((Regex::new(&marker.pattern)?, marker.slot));
        }

        let mut special_service_keywords: Vec<(String, String)> = config
            .special_service_keywords
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        // Deterministic detection order regardless of map iteration order.
        special_service_keywords.sort();

        Ok(Self {
            slot_markers,
            song_pattern: Regex::new(&config.song_pattern)?,
            scripture_pattern: Regex::new(&config.scripture_pattern)?,
            video_marker: Regex::new(&format!(
                r"(?i)\b{}\b",
                regex::escape(&config.video_marker)
            ))?,
            kids_keywords: config
                .kids_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            kids_lookahead: config.kids_lookahead,
            special_service_keywords,
        })
    }

    /// Segment raw extracted text into ordered, typed sections.
    pub fn segment(&self, raw_text: &str) -> SegmentOutcome {
        let lines: Vec<&str> = raw_text.lines().collect();
        let special_service_type = self.detect_special_service(&lines);

        if let Some(ref tag) = special_service_type {
            debug!("Detected special service type: {}", tag);
        }

        let mut current_slot = Slot::None;
        let mut sections = Vec::new();

        for (i, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            // Slot markers move the fold state and emit nothing.
            if let Some(slot) = self.match_slot_marker(line) {
                debug!("Slot marker at line {}: -> {}", i, slot);
                current_slot = slot;
                continue;
            }

            if let Some(title) = self.capture(&self.scripture_pattern, line) {
                sections.push(ServiceSection {
                    section_type: SectionType::BibleVerse,
                    title,
                    position: sections.len(),
                    is_kids_video: false,
                    slot: Slot::Reading,
                    special_service_type: special_service_type.clone(),
                });
                continue;
            }

            if let Some(title) = self.capture(&self.song_pattern, line) {
                let is_video = self.video_marker.is_match(&title);
                if is_video {
                    let window_end = (i + 1 + self.kids_lookahead).min(lines.len());
                    let is_kids = classify_kids_video(
                        line,
                        &lines[i + 1..window_end],
                        &self.kids_keywords,
                    );
                    sections.push(ServiceSection {
                        section_type: SectionType::Video,
                        title: strip_video_marker(&title, &self.video_marker),
                        position: sections.len(),
                        is_kids_video: is_kids,
                        slot: if is_kids { Slot::Kids } else { current_slot },
                        special_service_type: special_service_type.clone(),
                    });
                } else {
                    sections.push(ServiceSection {
                        section_type: SectionType::Song,
                        title,
                        position: sections.len(),
                        is_kids_video: false,
                        slot: current_slot,
                        special_service_type: special_service_type.clone(),
                    });
                }
                continue;
            }

            // Anything else is document noise; skip it.
        }

        if sections.is_empty() {
            warn!("Segmenter found no sections in document");
        } else {
            debug!("Segmented {} sections", sections.len());
        }

        SegmentOutcome {
            sections,
            special_service_type,
        }
    }

    fn match_slot_marker(&self, line: &str) -> Option<Slot> {
        self.slot_markers
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, slot)| *slot)
    }

    fn capture(&self, pattern: &Regex, line: &str) -> Option<String> {
        pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Scan the whole document once for a calendar keyword. Set at most
    /// once; the first keyword (in sorted order) that appears wins.
    fn detect_special_service(&self, lines: &[&str]) -> Option<String> {
        let haystack = lines.join("\n").to_lowercase();
        self.special_service_keywords
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, tag)| tag.clone())
    }
}

/// Kids classification over the entry line plus a bounded window of
/// following lines, for documents where "kids" is implied by adjacent
/// context rather than stated in the title. Pure function; lookahead
/// width is the caller's parameter.
pub fn classify_kids_video(line: &str, lookahead: &[&str], keywords: &[String]) -> bool {
    let mut haystack = line.to_lowercase();
    for next in lookahead {
        haystack.push('\n');
        haystack.push_str(&next.to_lowercase());
    }
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

/// Drop the video marker (and any parentheses around it) from a title so
/// matching compares against the bare name the pool uses. The marker
/// regex carries the case folding, so the title is never sliced at
/// offsets computed on a differently-cased copy.
fn strip_video_marker(title: &str, marker: &Regex) -> String {
    marker
        .replace_all(title, "")
        .replace("()", "")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .trim_end_matches(|c| c == '(' || c == ')')
        .trim()
        .to_string()
}
