use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Slot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub matching: MatchingConfig,
    pub segmenter: SegmenterConfig,
    pub pools: PoolsConfig,
    pub playlist: PlaylistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on every remote call; a slow controller surfaces as a
    /// failed step, never a hang.
    pub timeout_secs: u64,
    /// Age (seconds) beyond which the pre-write playlist read is logged
    /// as stale.
    pub stale_read_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Confidence at or above which a best match is selected without
    /// review.
    pub auto_accept_threshold: f64,
    /// Candidates scoring below this are not offered at all.
    pub recall_threshold: f64,
}

/// One slot-marker row: a case-insensitive pattern that moves the
/// segmenter's current slot when a line matches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMarker {
    pub pattern: String,
    pub slot: Slot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Ordered slot-marker table, checked first against every line.
    pub slot_markers: Vec<SlotMarker>,
    /// Pattern for song/video entry lines; the first capture group is the
    /// title.
    pub song_pattern: String,
    /// Substring that marks a song entry as a video.
    pub video_marker: String,
    /// Pattern for scripture entry lines.
    pub scripture_pattern: String,
    /// Keywords that classify a video as a kids video.
    pub kids_keywords: Vec<String>,
    /// How many following lines the kids classifier may inspect.
    pub kids_lookahead: usize,
    /// Document-wide calendar keywords mapped to a special service tag.
    pub special_service_keywords: HashMap<String, String>,
}

/// Names of the remote content libraries each pool is drawn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsConfig {
    pub worship: String,
    pub kids: String,
    pub service_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Name of the target playlist to reconcile.
    pub target: String,
    /// Normalized header name -> slot it introduces. Headers absent from
    /// this map are passed through untouched.
    pub header_slots: HashMap<String, Slot>,
}

impl Default for Config {
    fn default() -> Self {
        let mut header_slots = HashMap::new();
        header_slots.insert("praise 1".to_string(), Slot::Praise1);
        header_slots.insert("praise 2".to_string(), Slot::Praise2);
        header_slots.insert("praise 3".to_string(), Slot::Praise3);
        header_slots.insert("kids video".to_string(), Slot::Kids);
        header_slots.insert("bible reading".to_string(), Slot::Reading);

        let mut special_service_keywords = HashMap::new();
        special_service_keywords.insert("christmas".to_string(), "christmas".to_string());
        special_service_keywords.insert("good friday".to_string(), "good-friday".to_string());
        special_service_keywords.insert("easter".to_string(), "easter".to_string());

        Self {
            remote: RemoteConfig {
                host: "127.0.0.1".to_string(),
                port: 1025,
                timeout_secs: 10,
                stale_read_secs: 30,
            },
            matching: MatchingConfig {
                auto_accept_threshold: 0.87,
                recall_threshold: 0.70,
            },
            segmenter: SegmenterConfig {
                slot_markers: vec![
                    SlotMarker {
                        pattern: r"(?i)call to worship".to_string(),
                        slot: Slot::Praise1,
                    },
                    SlotMarker {
                        pattern: r"(?i)praying for others".to_string(),
                        slot: Slot::Praise2,
                    },
                    SlotMarker {
                        pattern: r"(?i)time of reflection".to_string(),
                        slot: Slot::Praise3,
                    },
                ],
                song_pattern: r"(?i)^praise\s*:\s*(.+)$".to_string(),
                video_marker: "video".to_string(),
                scripture_pattern: r"(?i)^(?:bible\s+)?reading\s*:\s*(.+)$".to_string(),
                kids_keywords: vec![
                    "kids".to_string(),
                    "children".to_string(),
                    "sunday school".to_string(),
                ],
                kids_lookahead: 2,
                special_service_keywords,
            },
            pools: PoolsConfig {
                worship: "Worship Songs".to_string(),
                kids: "Kids".to_string(),
                service_content: "Service Content".to_string(),
            },
            playlist: PlaylistConfig {
                target: "Sunday Service".to_string(),
                header_slots,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
